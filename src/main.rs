use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heart_risk_service::model::{ModelState, MODEL_PATH, PIPELINE_PATH};
use heart_risk_service::server::{self, state::ServerConfig};

/// Heart attack prediction service
#[derive(Parser, Debug)]
#[command(name = "heart-risk-service")]
#[command(version)]
#[command(about = "Heart attack risk prediction over uploaded CSV files")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Fitted preprocessing pipeline
    #[arg(long, default_value = PIPELINE_PATH)]
    pipeline: PathBuf,

    /// Trained classifier
    #[arg(long, default_value = MODEL_PATH)]
    model: PathBuf,

    /// Scratch directory for uploaded files
    #[arg(long, default_value = "tmp")]
    upload_dir: PathBuf,

    /// Maximum accepted request body in bytes
    #[arg(long, default_value_t = 32 * 1024 * 1024)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heart_risk_service=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig {
        pipeline_path: cli.pipeline,
        model_path: cli.model,
        upload_dir: cli.upload_dir,
        max_upload_bytes: cli.max_upload_bytes,
    };

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let start_time = Instant::now();
    let model = ModelState::load(&config.pipeline_path, &config.model_path);
    match &model {
        ModelState::Ready(_) => info!("model ready in {:?}", start_time.elapsed()),
        ModelState::Failed(reason) => {
            error!("model failed to load, /predict will answer 503: {}", reason)
        }
    }

    let app = server::router(config, model);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("heart-risk-service v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
