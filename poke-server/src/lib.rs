mod app;
mod auth;
mod config;
mod contract;
mod controllers;
mod middlewares;
mod routes;
mod valid;

#[cfg(target_env = "msvc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

pub use app::{App, AppState, Store};
pub use auth::{permits, Action, Authorizer, Decision};
pub use config::{load, AppConfig};
pub use contract::{Denial, Outcome, RequestContext};
pub use routes::{
    registry::{Controller, Registry, RouteEntry},
    AppRouter,
};
pub use valid::{ValidateOptions, Validator, Violation};

use tokio::signal;
use tracing::error;

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
