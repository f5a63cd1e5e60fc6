//! Key/value operations on the shared cache table.
//!
//! Values are opaque strings; the expiry is fixed when the entry is written
//! and rows past their expiry read as absent.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;

/// Longest expiry a row can carry. Keeps `expires_at` inside four-digit
/// years, where text order matches time order.
const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Fixed-width UTC timestamps so that SQLite text comparison orders them correctly.
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl CacheDb {
    /// Get an unexpired value by key.
    ///
    /// Returns None if the key doesn't exist or its entry has expired.
    pub async fn get_entry(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM shared_cache WHERE key = ?1 AND expires_at > ?2")?;

                let result = stmt.query_row(params![key, now], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a value that expires `ttl` from now.
    pub async fn put_entry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();

        let created = Utc::now();
        let ttl = chrono::Duration::from_std(ttl.min(MAX_ENTRY_TTL)).unwrap_or(chrono::Duration::zero());
        let expires = created.checked_add_signed(ttl).unwrap_or(created);
        let (created_at, expires_at) = (timestamp(created), timestamp(expires));

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO shared_cache (key, value, created_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at",
                    params![key, value, created_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self) -> Result<u64, Error> {
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM shared_cache WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let value = r#"{"result":{"valueRange":"$10–$12 USD"}}"#;

        db.put_entry("fp1", value, Duration::from_secs(600)).await.unwrap();

        let retrieved = db.get_entry("fp1").await.unwrap().unwrap();
        assert_eq!(retrieved, value);
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_entry("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("stale", "{}", Duration::ZERO).await.unwrap();
        assert!(db.get_entry("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_very_long_ttl_entry_stays_readable() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let twenty_thousand_years = Duration::from_secs(20_000 * 365 * 24 * 60 * 60);
        db.put_entry("fp", "v", twenty_thousand_years).await.unwrap();

        assert_eq!(db.get_entry("fp").await.unwrap().as_deref(), Some("v"));
        assert_eq!(db.purge_expired_entries().await.unwrap(), 0);

        db.put_entry("max", "v", Duration::MAX).await.unwrap();
        assert_eq!(db.get_entry("max").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_upsert_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("fp", "old", Duration::from_secs(600)).await.unwrap();
        db.put_entry("fp", "new", Duration::from_secs(600)).await.unwrap();
        assert_eq!(db.get_entry("fp").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_purge_expired_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("expiring", "{}", Duration::ZERO).await.unwrap();
        db.put_entry("fresh", "{}", Duration::from_secs(3600)).await.unwrap();

        let deleted = db.purge_expired_entries().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry("fresh").await.unwrap().is_some());
    }
}
