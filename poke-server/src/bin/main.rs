use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use poke_storage::connection_manager;

use poke_server::{load, shutdown_signal, App, AppConfig, AppRouter, AppState, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    let config =
        if args.len() == 3 && (args[1] == "-c" || args[1] == "--config") {
            load(&args[2])?
        } else {
            AppConfig::parse()
        };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    debug!("{:#?}", &config);
    info!("pokedex {}", env!("CARGO_PKG_VERSION"));
    run_server(config).await
}

async fn run_server(config: AppConfig) -> Result<()> {
    let store = match &config.database_url {
        Some(url) => {
            info!("connecting to the pokedex database...");
            let pool = connection_manager(
                url,
                config.max_size,
                config.min_idle,
                config.run_migrations,
            )
            .await
            .context("could not initialize the database connection pool")?;
            Store::mariadb(pool)
        }
        None => {
            warn!("no database url given, records are kept in memory");
            Store::memory()
        }
    };

    let app = Arc::new(App::new(config.clone(), store));
    app.ensure_admin()
        .await
        .context("could not register the admin token")?;

    let router = AppRouter::build(AppState(app))
        .context("could not initialize application routes")?;
    let host = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&host)
        .await
        .context("could not bind to endpoint")?;

    info!("pokedex api listening on {}", host);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("error while starting API server")?;

    Ok(())
}
