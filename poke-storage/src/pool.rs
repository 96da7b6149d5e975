use anyhow::Context;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use tracing::info;

pub async fn connection_manager(
    uri: &str,
    max_size: u32,
    min_idle: u32,
    run_migrations: bool,
) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_size)
        .min_connections(min_idle)
        .connect(uri)
        .await
        .context("could not connect to the pokedex database")?;

    if run_migrations {
        info!("applying pokedex schema");
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("could not apply the pokedex schema")?;
    }

    Ok(pool)
}
