// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Routed behind `jwt_auth_middleware`, which puts a `CurrentUser` in the
// request extensions.

pub mod auth;
pub mod citizens;
