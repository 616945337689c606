//! SQLite-backed storage area.
//!
//! A single database file can host both tiers; rows are keyed by
//! `(area, key)` where `area` is the tier name. Once open, driver and lock
//! failures surface as `StorageUnavailable` for the area's tier.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{item_size, StorageArea, TierQuota};
use crate::error::{Error, Result};
use crate::types::Tier;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS storage_items (
        area  TEXT NOT NULL,
        key   TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (area, key)
    );
";

/// Durable storage area.
///
/// Thread-safe via internal Mutex. All operations acquire the lock.
pub struct SqliteStorageArea {
    conn: Arc<Mutex<Connection>>,
    tier: Tier,
    quota: TierQuota,
}

impl SqliteStorageArea {
    /// Open (or create) the database at `path` and return the sync and local
    /// areas sharing it.
    pub fn open_pair(
        path: impl AsRef<Path>,
        sync_quota: TierQuota,
        local_quota: TierQuota,
    ) -> Result<(Self, Self)> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::pair_from_connection(conn, sync_quota, local_quota)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory_pair(sync_quota: TierQuota, local_quota: TierQuota) -> Result<(Self, Self)> {
        Self::pair_from_connection(Connection::open_in_memory()?, sync_quota, local_quota)
    }

    fn pair_from_connection(
        conn: Connection,
        sync_quota: TierQuota,
        local_quota: TierQuota,
    ) -> Result<(Self, Self)> {
        conn.execute_batch(SCHEMA)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok((
            Self {
                conn: Arc::clone(&conn),
                tier: Tier::Sync,
                quota: sync_quota,
            },
            Self {
                conn,
                tier: Tier::Local,
                quota: local_quota,
            },
        ))
    }

    fn area_name(&self) -> String {
        self.tier.to_string()
    }

    fn unavailable(&self, e: impl Display) -> Error {
        Error::unavailable(self.tier, e.to_string())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| self.unavailable("database lock poisoned"))
    }

    fn item_sizes(&self, conn: &Connection) -> Result<BTreeMap<String, u64>> {
        let mut stmt = conn
            .prepare("SELECT key, value FROM storage_items WHERE area = ?1")
            .map_err(|e| self.unavailable(e))?;
        let rows = stmt
            .query_map(params![self.area_name()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| self.unavailable(e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.unavailable(e))?;

        Ok(rows
            .into_iter()
            .map(|(key, value)| {
                let size = item_size(&key, &value);
                (key, size)
            })
            .collect())
    }
}

#[async_trait]
impl StorageArea for SqliteStorageArea {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn quota(&self) -> TierQuota {
        self.quota
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM storage_items WHERE area = ?1 AND key = ?2",
                params![self.area_name(), key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| self.unavailable(e))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;
        let conn = self.lock()?;

        let sizes = self.item_sizes(&conn)?;
        self.quota
            .check_set(self.tier, &sizes, key, &value, &raw)?;

        conn.execute(
            "INSERT INTO storage_items (area, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(area, key) DO UPDATE SET value = excluded.value",
            params![self.area_name(), key, raw],
        )
        .map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        let conn = self.lock()?;
        Ok(self.item_sizes(&conn)?.values().sum())
    }
}
