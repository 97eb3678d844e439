// handlers/public/files.rs - spreadsheet upload, listing and preview

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::upload_service::{StoredFile, UploadSummary, XLSX_MIME};
use crate::services::UploadService;

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub download: bool,
}

/// POST /upload-xlsx - multipart form, file under the `file` field
pub async fn upload_xlsx(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadSummary> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read uploaded file: {}", e)))?;

        let summary = state.uploads.upload(&file_name, &bytes).await?;
        info!("Stored upload {} ({} rows)", summary.file_name, summary.total_rows);
        return Ok(ApiResponse::success(summary));
    }

    Err(ApiError::bad_request("Missing 'file' field"))
}

/// GET /files - newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<StoredFile>> {
    let files = state.uploads.list().await?;
    Ok(ApiResponse::success(files))
}

/// GET /files/:name - JSON preview, or the raw file with `?download=true`
pub async fn view(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Path(name) = path?;
    let Query(query) = query?;
    if query.download {
        let bytes = state.uploads.download(&name).await?;
        let disposition = format!(
            "attachment; filename=\"{}\"",
            UploadService::sanitize_filename(&name)
        );
        return Ok((
            [
                (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response());
    }

    let view = state.uploads.view(&name).await?;
    Ok(ApiResponse::success(view).into_response())
}
