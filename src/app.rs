use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthGate, SessionStore};
use crate::config::AppConfig;
use crate::database::PersistenceGateway;
use crate::handlers;
use crate::ingest::{Ingestor, OrganizationResolver};
use crate::middleware::{require_admin_middleware, session_auth_middleware};
use crate::notify::Notifier;
use crate::report::ReportBuilder;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub auth: AuthGate,
    pub ingestor: Arc<Ingestor>,
    pub reports: Arc<ReportBuilder>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Arc<dyn PersistenceGateway>) -> Self {
        let sessions = SessionStore::new(
            config.security.jwt_secret.clone(),
            config.security.session_ttl_hours,
        );
        Self {
            auth: AuthGate::new(sessions),
            ingestor: Arc::new(Ingestor::new(OrganizationResolver::from_config(&config.organization))),
            reports: Arc::new(ReportBuilder::new(config.report.clone())),
            notifier: Notifier::from_config(&config),
            config: Arc::new(config),
            gateway,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.server.max_upload_bytes;

    let admin = admin_routes().route_layer(from_fn(require_admin_middleware));
    let protected = Router::new()
        .merge(auth_routes())
        .merge(data_routes())
        .merge(report_routes())
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware));

    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::public::auth::login))
        .merge(protected)
        // Global middleware
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/session", delete(auth::logout))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/auth/email", put(auth::set_email))
}

fn data_routes() -> Router<AppState> {
    use handlers::protected::data;

    Router::new()
        .route("/api/data", get(data::rows))
        .route("/api/data/upload", post(data::upload))
        .route("/api/data/organizations", get(data::organizations))
        .route("/api/data/stats", get(data::stats))
        .route("/api/data/batches", get(data::batches))
        .route("/api/data/export.csv", get(data::export_csv))
}

fn report_routes() -> Router<AppState> {
    use handlers::protected::report;

    Router::new()
        .route("/api/report/pdf", get(report::pdf))
        .route("/api/report/email", post(report::email))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/api/admin/users", get(admin::users::list).post(admin::users::create))
        .route("/api/admin/users/:username/password", put(admin::users::reset_password))
        .route("/api/admin/batches/:id", delete(admin::batches::delete))
}
