use sqlx::executor::Executor;
use sqlx_postgres::{PgPoolOptions, Postgres};

/// PostgreSQL connection pool type alias.
pub type PgPool = sqlx::pool::Pool<Postgres>;
pub type PgRow = sqlx_postgres::PgRow;

const SCHEMA: &str = include_str!("../migrations/0001_portal.sql");

/// Create a PostgreSQL connection pool from the given database URL.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::error::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Create any missing tables. Every statement in the schema is idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::error::Error> {
    pool.execute(SCHEMA).await?;
    Ok(())
}
