use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Pool over the database that holds the job corpus and the `fit_scores`
/// cache. Sized from config: listing reads and background recompute
/// writers share it.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!(max_connections, "Postgres pool ready (jobs, fit_scores)");
    Ok(pool)
}
