//! Database initialization, migrations and document rows.
//!
//! Both persisted tables hold one JSON document per key. Table names are
//! crate constants, never user input.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use tracing::warn;

pub const POSTS_TABLE: &str = "scheduled_posts";
pub const SESSIONS_TABLE: &str = "session_memory";

/// Initialize the PostgreSQL connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

/// Every row of `table`. Rows that no longer decode are skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn load_documents<V: DeserializeOwned>(pool: &PgPool, table: &'static str) -> Result<Vec<(String, V)>, sqlx::Error> {
    let rows: Vec<(String, Json<serde_json::Value>)> =
        sqlx::query_as(&format!("SELECT id, data FROM {table}")).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, Json(data))| match serde_json::from_value(data) {
            Ok(value) => Some((id, value)),
            Err(e) => {
                warn!(table, %id, error = %e, "db: skipping undecodable row");
                None
            }
        })
        .collect())
}

/// Insert or replace one document.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn upsert_document<V: Serialize + Sync>(
    pool: &PgPool,
    table: &'static str,
    id: &str,
    value: &V,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO {table} (id, data, updated_at) VALUES ($1, $2, now()) \
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()"
    ))
    .bind(id)
    .bind(Json(value))
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_document(pool: &PgPool, table: &'static str, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
