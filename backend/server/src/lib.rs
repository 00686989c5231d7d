//! Per-user vote logs with incremental sync.
//!
//! # Overview
//! - Clients `POST /votes/{user}` with `{action, target}`
//! - Each vote is packed into one integer ([`codec`]) and pushed onto the user's
//!   Redis list ([`database`])
//! - Clients `GET /votes/{user}?syncId=N` and get back everything appended at
//!   index `N` and beyond, plus the `nextSyncId` to send next time ([`sync`])
//!
//! # Example
//! ```sh
//! curl -XPOST -d '{"action": 5, "target": 1337}' localhost:8080/votes/15000
//! curl -XPOST -d '{"action": 7, "thing": 9000}' localhost:8080/votes/15000
//! curl localhost:8080/votes/15000
//! # {"votes":[5,1337,7,9000],"nextSyncId":2,"duration":0}
//! curl "localhost:8080/votes/15000?syncId=1"
//! # {"votes":[7,9000],"nextSyncId":2,"duration":0}
//! ```
//!
//! # Notes
//!
//! ## Ordering
//! Nothing here serializes requests. Two writers for the same user race at
//! Redis, and `RPUSH` decides the order. Readers see whatever prefix of the
//! list exists when `LRANGE` runs.
//!
//! ## Encoding
//! The bulk importer and the live write path share [`codec::encode`]. The
//! layout tag is checked against the store on startup so a process built with
//! a different layout refuses to run instead of corrupting the logs.
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync;

use config::Config;
use database::{RedisLog, init_redis};
use routes::{get_votes_handler, store_vote_handler};
use state::State;
use store::{StoreError, VoteLog};

/// Connects to Redis and claims the current encoding layout.
pub async fn open_log(redis_url: &str) -> Result<Arc<dyn VoteLog>, StoreError> {
    let connection = init_redis(redis_url).await?;
    let log = RedisLog::new(connection);

    log.claim_layout(codec::LAYOUT).await?;

    Ok(Arc::new(log))
}

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/votes/{user}",
            get(get_votes_handler).post(store_vote_handler),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config, log: Arc<dyn VoteLog>) -> std::io::Result<()> {
    info!("Starting server...");

    let state = State::new(config, log);

    let address = state.address();
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
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
