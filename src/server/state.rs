//! Shared state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::model::{ModelState, MODEL_PATH, PIPELINE_PATH};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub pipeline_path: PathBuf,
    pub model_path: PathBuf,
    /// Scratch directory uploads are written to before inference
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pipeline_path: PathBuf::from(PIPELINE_PATH),
            model_path: PathBuf::from(MODEL_PATH),
            upload_dir: PathBuf::from("tmp"),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

pub struct AppState {
    pub config: ServerConfig,
    pub model: ModelState,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, model: ModelState) -> Self {
        Self {
            config,
            model,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
