use std::sync::Arc;

use agora_store::MockDb;
use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::panic_response;
use crate::{auth, comments, discussions};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<MockDb>>,
}

impl AppState {
    pub fn new(db: MockDb) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route(
            "/discussions",
            get(discussions::list_discussions).post(discussions::create_discussion),
        )
        .route(
            "/discussions/:discussion_id",
            get(discussions::get_discussion).delete(discussions::delete_discussion),
        )
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/:comment_id",
            axum::routing::delete(comments::delete_comment),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state).await
}

/// Serve on an already bound listener (tests bind to port 0).
pub async fn serve_listener(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting mock API server");

    axum::serve(listener, app).await?;

    Ok(())
}
