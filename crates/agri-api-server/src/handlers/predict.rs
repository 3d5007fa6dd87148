use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::disease::DiseaseReport;
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Image classification endpoint: multipart upload of a single `file`
/// field, answered with the structured disease report.
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DiseaseReport>, ApiError> {
    let gemini = state.gemini.as_ref().ok_or_else(|| {
        ApiError::Unavailable("AI model is not available. Check server configuration".to_string())
    })?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        if field.name() == Some("file") {
            content_type = field.content_type().map(|s| s.to_string());
            filename = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::BadRequest("file required".to_string()))?;
    let content_type =
        content_type.ok_or_else(|| ApiError::BadRequest("file content type required".to_string()))?;

    if !content_type.starts_with("image/") {
        return Err(ApiError::BadRequest(
            "Invalid file type. Please upload an image".to_string(),
        ));
    }

    info!(
        "Prediction request: file={:?}, content_type={}, size={} bytes",
        filename,
        content_type,
        file_data.len()
    );

    let report = gemini.classify_image(&file_data, &content_type).await?;
    info!("Prediction completed: disease={}", report.disease_name);

    Ok(Json(report))
}
