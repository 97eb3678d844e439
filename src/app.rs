use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{self, AppConfig, SecurityConfig, UploadConfig};
use crate::database::{DatabaseError, DatabaseManager, MemoryStore, PgStore};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{CitizenService, DescribeService, UploadService, UserService};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub citizens: CitizenService,
    pub users: UserService,
    pub uploads: UploadService,
    pub describe: DescribeService,
    /// Present when running against Postgres; used by the health check
    pub database: Option<PgPool>,
}

impl AppState {
    /// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
    pub async fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        if config.database.url.is_none() {
            warn!("DATABASE_URL not set, records are kept in memory only");
            return Ok(Self::in_memory(&config.upload));
        }

        let pool = DatabaseManager::connect(&config.database).await?;
        if config.database.run_migrations {
            DatabaseManager::migrate(&pool).await?;
        }
        Ok(Self::postgres(pool, &config.upload))
    }

    pub fn postgres(pool: PgPool, upload: &UploadConfig) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            citizens: CitizenService::new(store.clone()),
            users: UserService::new(store.clone()),
            uploads: UploadService::new(upload),
            describe: DescribeService::new(store),
            database: Some(pool),
        }
    }

    pub fn in_memory(upload: &UploadConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            citizens: CitizenService::new(store.clone()),
            users: UserService::new(store.clone()),
            uploads: UploadService::new(upload),
            describe: DescribeService::new(store),
            database: None,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let config = config::config();

    let mut app = Router::new()
        // Public
        .route("/", get(public::meta::root))
        .route("/health", get(public::meta::health))
        .route("/schema", get(public::meta::schema_xml))
        .merge(auth_public_routes())
        .merge(citizen_public_routes())
        .merge(file_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/users", post(auth::users_post).get(auth::users_get))
        .route("/login", post(auth::login))
}

fn citizen_public_routes() -> Router<AppState> {
    use public::citizens;

    Router::new()
        .route("/citizens", post(citizens::create).get(citizens::list))
        .route("/citizens/count", get(citizens::count))
        .route("/citizens/cpf/:cpf", get(citizens::get_by_national_id))
        .route("/citizens/name/:term", get(citizens::search))
        .route("/citizens/eligible/:eligible", get(citizens::list_by_eligibility))
        .route("/citizens/:id", get(citizens::get))
        .route("/citizens/:id/voted", patch(citizens::set_voted))
        .route("/citizens/:id/eligible", patch(citizens::set_eligible))
}

fn file_routes() -> Router<AppState> {
    use public::files;

    Router::new()
        .route("/upload-xlsx", post(files::upload_xlsx))
        .route("/files", get(files::list))
        .route("/files/:name", get(files::view))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use axum::routing::put;

    Router::new()
        .route("/me", get(protected::auth::me))
        .route(
            "/citizens/:id",
            put(protected::citizens::update).delete(protected::citizens::delete),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    info!("CORS enabled for {} origin(s)", origins.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
