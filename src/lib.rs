//! Penalty tracking backend.
//!
//! Users create or join named competitions with a shared passphrase, assign
//! penalties to each other, and confirm the penalties assigned to them. Only
//! a confirmed penalty counts toward a participant's running total.
//!
//! # General Infrastructure
//! - Stateless axum handlers over a document store (competitions → users →
//!   penalties), one transaction per request
//! - Redis holds the documents in production; an in-memory backend backs the
//!   test suite and local runs (`STORE_BACKEND=memory`)
//! - Identity is a client-supplied display name; there is no authentication,
//!   which is a deliberate simplification carried over from the original
//!   frontend contract
//!
//! # Endpoints
//!
//! | Route | Method |
//! |---|---|
//! | `/api/create-competition` | POST |
//! | `/api/join-competition` | POST |
//! | `/api/get-all-competitions` | GET |
//! | `/api/get-competition-details` | GET |
//! | `/api/add-penalty` | POST |
//! | `/api/confirm-penalty` | POST |
//! | `/api/get-penalties` | GET |
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, Method};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod competitions;
pub mod config;
pub mod error;
pub mod models;
pub mod penalties;
pub mod routes;
pub mod state;
pub mod store;

use routes::router;
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
