//! Prediction endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::model::ModelState;
use crate::server::error::ApiError;
use crate::server::state::SharedState;

pub const FILE_FIELD: &str = "file";

/// `predictions` holds the records as a JSON-encoded string, not a nested
/// array. Existing clients decode it a second time.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: String,
}

/// Scratch file name for an upload: a random prefix plus the last path
/// component of the client-supplied name.
pub fn scratch_name(original: &str) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("upload.csv");
    format!("{}-{}", Uuid::new_v4(), base)
}

// body limit violations surface from the multipart stream
fn upload_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(upload_error)?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ApiError::Unprocessable(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

/// POST /predict - run the model over an uploaded CSV file
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let model = match &state.model {
        ModelState::Ready(model) => model.clone(),
        ModelState::Failed(reason) => return Err(ApiError::ModelUnavailable(reason.clone())),
    };

    let (file_name, bytes) = read_file_field(&mut multipart).await?;
    let save_path = state.config.upload_dir.join(scratch_name(&file_name));
    info!("processing file - {}", save_path.display());

    fs::write(&save_path, &bytes)
        .await
        .map_err(|e| ApiError::internal("saving upload", e))?;

    let predictions = tokio::task::spawn_blocking(move || model.predict(&save_path))
        .await
        .map_err(|e| ApiError::internal("inference", e))?
        .map_err(|e| ApiError::internal("inference", e))?;

    let encoded =
        serde_json::to_string(&predictions).map_err(|e| ApiError::internal("encoding", e))?;

    Ok(Json(PredictResponse {
        predictions: encoded,
    }))
}
