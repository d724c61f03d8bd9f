use axum::{
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::storage::SqliteStore;

pub mod auth;
pub mod routes;
pub mod views;

/// Server state, shared by every handler.
///
/// Only the database location lives here; each request opens its own
/// store connection.
pub struct AppState {
    pub database_path: PathBuf,
    pub staff_token: Option<String>,
}

impl AppState {
    pub fn new(database_path: PathBuf, staff_token: Option<String>) -> Self {
        Self {
            database_path,
            staff_token,
        }
    }

    /// Create the schema. Runs once at startup, before any request.
    pub fn initialize(&self) -> crate::Result<()> {
        SqliteStore::open(&self.database_path)?;
        Ok(())
    }

    pub fn open_store(&self) -> crate::Result<SqliteStore> {
        SqliteStore::connect(&self.database_path)
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let staff = Router::new()
        .route("/students", get(routes::list_students).post(routes::create_student))
        .route(
            "/students/{id}",
            get(routes::show_student)
                .put(routes::update_student)
                .delete(routes::delete_student),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_staff));

    Router::new()
        .route("/", get(routes::check))
        .route("/announcements", get(routes::announcements))
        .route("/health-check", get(routes::health_check))
        .merge(staff)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    // A bad path fails here, before binding
    state.initialize()?;

    if state.staff_token.is_none() {
        tracing::warn!("No staff_token configured; /students routes are open to everyone");
    }

    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
