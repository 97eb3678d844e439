// handlers/public/citizens.rs - citizen reads, create and flag toggles

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::citizen::{CitizenFilter, CitizenRecord, CreateCitizenRequest};
use crate::config::config;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub neighborhood: Option<String>,
    pub registration_status: Option<String>,
    pub active: Option<bool>,
    pub eligible: Option<bool>,
}

impl ListQuery {
    fn filter(&self) -> CitizenFilter {
        CitizenFilter {
            neighborhood: self.neighborhood.clone(),
            registration_status: self.registration_status.clone(),
            active: self.active,
            eligible: self.eligible,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VotedBody {
    pub voted: bool,
}

#[derive(Debug, Deserialize)]
pub struct EligibleBody {
    pub eligible: bool,
}

fn not_found() -> ApiError {
    ApiError::not_found("Citizen not found")
}

/// POST /citizens
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateCitizenRequest>, JsonRejection>,
) -> ApiResult<CitizenRecord> {
    let Json(request) = payload?;
    let record = state.citizens.create(request).await?;
    Ok(ApiResponse::created(record))
}

/// GET /citizens?skip&limit&neighborhood&registration_status&active&eligible
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<CitizenRecord>> {
    let Query(query) = query?;
    let records = state
        .citizens
        .list(
            &query.filter(),
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(config().filter.default_limit),
        )
        .await?;
    Ok(ApiResponse::success(records))
}

/// GET /citizens/count
pub async fn count(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query?;
    let total = state.citizens.count(&query.filter()).await?;
    Ok(ApiResponse::success(json!({ "total": total })))
}

/// GET /citizens/:id
pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> ApiResult<CitizenRecord> {
    let Path(id) = path?;
    let record = state.citizens.get_by_id(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(record))
}

/// GET /citizens/cpf/:cpf
pub async fn get_by_national_id(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<CitizenRecord> {
    let Path(cpf) = path?;
    let record = state
        .citizens
        .get_by_national_id(&cpf)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::success(record))
}

/// GET /citizens/name/:term - 404 when nothing matches
pub async fn search(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<CitizenRecord>> {
    let Path(term) = path?;
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(config().filter.search_default_limit);
    let records = state.citizens.search(&term, limit).await?;
    if records.is_empty() {
        return Err(ApiError::not_found(format!("No citizens found matching '{}'", term)));
    }
    Ok(ApiResponse::success(records))
}

/// GET /citizens/eligible/:eligible
pub async fn list_by_eligibility(
    State(state): State<AppState>,
    path: Result<Path<bool>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<CitizenRecord>> {
    let Path(eligible) = path?;
    let Query(page) = query?;
    let records = state
        .citizens
        .list(
            &CitizenFilter::eligible(eligible),
            page.skip.unwrap_or(0),
            page.limit.unwrap_or(config().filter.default_limit),
        )
        .await?;
    Ok(ApiResponse::success(records))
}

/// PATCH /citizens/:id/voted
pub async fn set_voted(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<VotedBody>, JsonRejection>,
) -> ApiResult<CitizenRecord> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let record = state
        .citizens
        .set_voted(id, body.voted)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::success(record))
}

/// PATCH /citizens/:id/eligible
pub async fn set_eligible(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<EligibleBody>, JsonRejection>,
) -> ApiResult<CitizenRecord> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let record = state
        .citizens
        .set_eligible(id, body.eligible)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::success(record))
}
