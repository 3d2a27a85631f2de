//! Persistence service: debounced write-behind flush of dirty documents.
//!
//! DESIGN
//! ======
//! A background task wakes every `FLUSH_INTERVAL_MS`, snapshots the dirty
//! rows of the post and session tables, releases the lock, then writes to
//! Postgres. Only rows that reached storage are acked, so a failed write is
//! retried on the next tick. Without a database the task is never started
//! and everything stays in memory.

use std::hash::Hash;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{self, POSTS_TABLE, SESSIONS_TABLE};
use crate::state::AppState;
use crate::store::TrackedTable;

/// Spawn the background persistence task. `None` when no pool is configured.
pub fn spawn_persistence_task(state: AppState, flush_interval: Duration) -> Option<JoinHandle<()>> {
    let pool = state.pool.clone()?;
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_interval);
        loop {
            interval.tick().await;
            flush_all_dirty(&pool, &state).await;
        }
    }))
}

/// Flush both tables once. Also used on shutdown.
pub async fn flush_all_dirty(pool: &PgPool, state: &AppState) {
    if let Err(e) = flush_table(pool, state.posts.table(), POSTS_TABLE).await {
        error!(table = POSTS_TABLE, error = %e, "persistence flush failed");
    }
    if let Err(e) = flush_table(pool, state.sessions.table(), SESSIONS_TABLE).await {
        error!(table = SESSIONS_TABLE, error = %e, "persistence flush failed");
    }
}

async fn flush_table<K, V>(
    pool: &PgPool,
    table: &RwLock<TrackedTable<K, V>>,
    name: &'static str,
) -> Result<(), sqlx::Error>
where
    K: Eq + Hash + Clone + ToString,
    V: Clone + Serialize + Sync,
{
    let pending = table.read().await.snapshot();
    if pending.is_empty() {
        return Ok(());
    }

    let mut written = Vec::with_capacity(pending.upserts.len());
    let mut deleted = Vec::with_capacity(pending.deletes.len());
    let mut result = Ok(());
    for (key, value, revision) in &pending.upserts {
        if let Err(e) = db::upsert_document(pool, name, &key.to_string(), value).await {
            result = Err(e);
            break;
        }
        written.push((key.clone(), *revision));
    }
    if result.is_ok() {
        for key in &pending.deletes {
            if let Err(e) = db::delete_document(pool, name, &key.to_string()).await {
                result = Err(e);
                break;
            }
            deleted.push(key.clone());
        }
    }

    let mut table = table.write().await;
    table.ack_upserts(written);
    table.ack_deletes(deleted);
    result
}

/// Load persisted posts and sessions into the in-memory tables.
///
/// # Errors
///
/// Returns an error if either table cannot be read.
pub async fn hydrate(pool: &PgPool, state: &AppState) -> Result<(), sqlx::Error> {
    let posts = load(pool, POSTS_TABLE, |id| id.parse::<Uuid>().ok()).await?;
    let post_count = posts.len();
    let interrupted = state.posts.hydrate(posts).await;

    let sessions = load(pool, SESSIONS_TABLE, |id| Some(id.to_string())).await?;
    let session_count = sessions.len();
    state.sessions.table().write().await.hydrate(sessions);

    info!(posts = post_count, interrupted, sessions = session_count, "persistence: hydrated");
    Ok(())
}

async fn load<K, V: DeserializeOwned>(
    pool: &PgPool,
    table: &'static str,
    key: impl Fn(&str) -> Option<K>,
) -> Result<Vec<(K, V)>, sqlx::Error> {
    Ok(db::load_documents::<V>(pool, table)
        .await?
        .into_iter()
        .filter_map(|(id, value)| match key(&id) {
            Some(k) => Some((k, value)),
            None => {
                warn!(table, %id, "persistence: skipping row with invalid id");
                None
            }
        })
        .collect())
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
