/// Repository layer: key/value stores backing the remote data cache
use crate::errors::ApiResult;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Key → opaque JSON blob with a time-to-live.
///
/// Expired entries are never returned by `get`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = ApiResult<Option<Value>>> + Send;
    fn set(&self, key: &str, payload: Value, ttl: Duration) -> impl Future<Output = ApiResult<()>> + Send;
    fn delete(&self, key: &str) -> impl Future<Output = ApiResult<()>> + Send;
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CacheStore for PgCacheStore {
    async fn get(&self, key: &str) -> ApiResult<Option<Value>> {
        let row = sqlx::query_as::<_, (Value,)>(
            "SELECT payload FROM transient_cache WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(payload,)| payload))
    }

    async fn set(&self, key: &str, payload: Value, ttl: Duration) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO transient_cache(key, payload, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (key) DO UPDATE
             SET payload = EXCLUDED.payload, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expiry(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM transient_cache WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Process-local store used when no database is configured
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, (DateTime<Utc>, Value)>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> ApiResult<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(expires_at, _)| *expires_at > Utc::now())
            .map(|(_, payload)| payload.clone()))
    }

    async fn set(&self, key: &str, payload: Value, ttl: Duration) -> ApiResult<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (expires_at, _)| *expires_at > Utc::now());
        entries.insert(key.to_string(), (expiry(ttl), payload));
        Ok(())
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Store chosen at startup
#[derive(Clone)]
pub enum AnyCacheStore {
    Postgres(PgCacheStore),
    Memory(MemoryCacheStore),
}

impl CacheStore for AnyCacheStore {
    async fn get(&self, key: &str) -> ApiResult<Option<Value>> {
        match self {
            AnyCacheStore::Postgres(s) => s.get(key).await,
            AnyCacheStore::Memory(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, payload: Value, ttl: Duration) -> ApiResult<()> {
        match self {
            AnyCacheStore::Postgres(s) => s.set(key, payload, ttl).await,
            AnyCacheStore::Memory(s) => s.set(key, payload, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        match self {
            AnyCacheStore::Postgres(s) => s.delete(key).await,
            AnyCacheStore::Memory(s) => s.delete(key).await,
        }
    }
}

/// Initialize database tables
pub async fn init_db(pool: &PgPool) -> ApiResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS transient_cache(
            key TEXT PRIMARY KEY,
            payload JSONB NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            stored_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS ix_transient_cache_expires
         ON transient_cache(expires_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
