// handlers/protected/citizens.rs - PUT/DELETE /citizens/:id

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use tracing::info;

use crate::app::AppState;
use crate::citizen::{CitizenRecord, UpdateCitizenRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// PUT /citizens/:id - partial update, only supplied fields change
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateCitizenRequest>, JsonRejection>,
) -> ApiResult<CitizenRecord> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let record = state
        .citizens
        .update(id, request)
        .await?
        .ok_or_else(|| ApiError::not_found("Citizen not found"))?;

    info!("User {} updated citizen {}", user.name, id);
    Ok(ApiResponse::success(record))
}

/// DELETE /citizens/:id - logical delete, 204
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    path: Result<Path<i32>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = path?;
    state
        .citizens
        .logical_delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Citizen not found"))?;

    info!("User {} deactivated citizen {}", user.name, id);
    Ok(ApiResponse::no_content())
}
