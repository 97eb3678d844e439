// handlers/public/auth.rs - user registration and login

use axum::{
    extract::{FromRequest, Request, State},
    http::header,
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(alias = "username")]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /users
pub async fn users_post(State(state): State<AppState>, request: Request) -> ApiResult<User> {
    let credentials = read_credentials(request).await?;
    let user = state
        .users
        .create_user(&credentials.name, &credentials.password)
        .await?;
    Ok(ApiResponse::created(user))
}

/// GET /users
pub async fn users_get(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success(users))
}

/// POST /login - form or JSON body with `username`/`password`
pub async fn login(State(state): State<AppState>, request: Request) -> ApiResult<TokenResponse> {
    let credentials = read_credentials(request).await?;
    let access_token = state
        .users
        .login(&credentials.name, &credentials.password)
        .await?;
    Ok(ApiResponse::success(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// Accepts `application/json`, anything else is read as a url-encoded form
async fn read_credentials(request: Request) -> Result<Credentials, ApiError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        let Json(credentials) = Json::<Credentials>::from_request(request, &()).await?;
        Ok(credentials)
    } else {
        let Form(credentials) = Form::<Credentials>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(credentials)
    }
}
