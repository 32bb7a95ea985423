//! libSQL-backed HTTP response cache.
//!
//! The [`ResponseCache`] stores successful GET responses keyed by a SHA-256
//! of the request line. Entries younger than the configured expiry are served
//! back without touching the network; older ones are refetched and replaced.

mod migrations;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use imchef_shared::{ChefError, Result};
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};

/// Response cache handle wrapping a libSQL database.
pub struct ResponseCache {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// A cached response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Summary of the cache contents.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl ResponseCache {
    /// Open or create a cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChefError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))?;

        let conn = db.connect().map_err(|e| ChefError::Storage(e.to_string()))?;

        let cache = Self { db, conn };
        cache.run_migrations().await?;
        Ok(cache)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ChefError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Return the cached response for `url` if it is younger than `max_age`.
    pub async fn get_fresh(&self, url: &str, max_age: Duration) -> Result<Option<CachedResponse>> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, status, body, fetched_at FROM http_cache WHERE cache_key = ?1",
                params![cache_key(url)],
            )
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))?;

        let cached = match rows.next().await {
            Ok(Some(row)) => row_to_cached(&row)?,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ChefError::Storage(e.to_string())),
        };

        let age = Utc::now()
            .signed_duration_since(cached.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            Ok(Some(cached))
        } else {
            tracing::trace!(url, age_secs = age.as_secs(), "cached response expired");
            Ok(None)
        }
    }

    /// Store (or replace) a successful response for `url`.
    pub async fn put(&self, url: &str, status: u16, body: &str) -> Result<()> {
        self.insert(url, status, body, Utc::now()).await
    }

    async fn insert(
        &self,
        url: &str,
        status: u16,
        body: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO http_cache (cache_key, url, status, body, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cache_key) DO UPDATE SET
                   status = excluded.status,
                   body = excluded.body,
                   fetched_at = excluded.fetched_at",
                params![
                    cache_key(url),
                    url,
                    i64::from(status),
                    body,
                    timestamp(fetched_at)
                ],
            )
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete entries older than `max_age`. Returns the number removed.
    pub async fn purge_expired(&self, max_age: Duration) -> Result<u64> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| ChefError::Storage(format!("invalid cache expiry: {e}")))?;
        let cutoff = timestamp(Utc::now() - max_age);
        let removed = self
            .conn
            .execute(
                "DELETE FROM http_cache WHERE fetched_at <= ?1",
                params![cutoff],
            )
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))?;
        tracing::debug!(removed, "purged expired cache entries");
        Ok(removed)
    }

    /// Remove every cached response.
    pub async fn clear(&self) -> Result<u64> {
        self.conn
            .execute("DELETE FROM http_cache", params![])
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*), MIN(fetched_at), MAX(fetched_at) FROM http_cache",
                params![],
            )
            .await
            .map_err(|e| ChefError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(CacheStats {
                entries: row
                    .get::<i64>(0)
                    .map_err(|e| ChefError::Storage(e.to_string()))? as u64,
                oldest: row.get::<String>(1).ok().and_then(|s| parse_timestamp(&s).ok()),
                newest: row.get::<String>(2).ok().and_then(|s| parse_timestamp(&s).ok()),
            }),
            Ok(None) => Ok(CacheStats::default()),
            Err(e) => Err(ChefError::Storage(e.to_string())),
        }
    }
}

/// SHA-256 of the request line, hex encoded.
fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"GET ");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fixed-width UTC timestamp so that text comparison orders correctly.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChefError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row to a [`CachedResponse`].
fn row_to_cached(row: &libsql::Row) -> Result<CachedResponse> {
    Ok(CachedResponse {
        url: row
            .get::<String>(0)
            .map_err(|e| ChefError::Storage(e.to_string()))?,
        status: row
            .get::<i64>(1)
            .map_err(|e| ChefError::Storage(e.to_string()))? as u16,
        body: row
            .get::<String>(2)
            .map_err(|e| ChefError::Storage(e.to_string()))?,
        fetched_at: {
            let s: String = row
                .get(3)
                .map_err(|e| ChefError::Storage(e.to_string()))?;
            parse_timestamp(&s)?
        },
    })
}
