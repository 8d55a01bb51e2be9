//! Connection bootstrap utilities for SQLite-backed stores.
//!
//! # Responsibility
//! - Open SQLite store files without touching their schema.
//! - Classify an existing store file before anything is written to it.
//! - Configure connection pragmas and apply schema migrations.
//!
//! # Invariants
//! - Prepared connections have `foreign_keys=ON`.
//! - Prepared connections have migrations fully applied.
//! - `inspect_store` only reads; it never migrates or creates tables.

use super::migrations::{current_user_version, StoreSchema};
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout applied when callers do not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema state of a store file relative to the schema this binary ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// No prior store existed at the path; it is created from scratch.
    Fresh,
    /// Existing store already at the latest version.
    Current,
    /// Existing store that must be upgraded before use.
    ///
    /// `from_version` is `None` when the existing file could not be read.
    NeedsMigration {
        from_version: Option<u32>,
        to_version: u32,
    },
    /// Existing store written by a newer binary.
    Newer { db_version: u32, latest_supported: u32 },
}

impl StoreStatus {
    pub fn requires_migration(&self) -> bool {
        matches!(self, Self::NeedsMigration { .. })
    }
}

/// Returns whether a non-empty store file is present at `path`.
///
/// Zero-length files are treated as absent: SQLite reads them as empty
/// databases with no schema.
pub fn has_existing_store(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Opens (creating if absent) the SQLite file at `path` without touching its
/// schema.
///
/// # Side effects
/// - Creates the parent directory when missing.
/// - Emits `db_connect` logging events.
pub fn open_connection(path: &Path) -> DbResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(source) = std::fs::create_dir_all(parent) {
            error!(
                "event=db_connect module=db status=error error_code=dir_create_failed error={}",
                source
            );
            return Err(DbError::Io {
                path: parent.to_path_buf(),
                source,
            });
        }
    }

    match Connection::open(path) {
        Ok(conn) => {
            info!("event=db_connect module=db status=ok mode=file");
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_connect module=db status=error mode=file error_code=db_open_failed error={}",
                err
            );
            Err(err.into())
        }
    }
}

/// Classifies the store behind `conn`.
///
/// `existed_on_disk` must be sampled before the connection was opened,
/// because opening may create an empty file.
pub fn inspect_store(
    conn: &Connection,
    schema: &StoreSchema,
    existed_on_disk: bool,
) -> StoreStatus {
    if !existed_on_disk {
        return StoreStatus::Fresh;
    }

    let latest = schema.latest_version();
    match current_user_version(conn) {
        Ok(version) if version == latest => StoreStatus::Current,
        Ok(version) if version > latest => StoreStatus::Newer {
            db_version: version,
            latest_supported: latest,
        },
        Ok(version) => StoreStatus::NeedsMigration {
            from_version: Some(version),
            to_version: latest,
        },
        Err(err) => {
            warn!(
                "event=db_inspect module=db status=unreadable schema={} error={}",
                schema.name(),
                err
            );
            StoreStatus::NeedsMigration {
                from_version: None,
                to_version: latest,
            }
        }
    }
}

/// Configures pragmas and applies all pending migrations of `schema`.
///
/// # Side effects
/// - Emits `db_prepare` logging events with duration and status.
pub fn prepare_connection(
    conn: &mut Connection,
    schema: &StoreSchema,
    busy_timeout: Duration,
) -> DbResult<()> {
    let started_at = Instant::now();
    match bootstrap_connection(conn, schema, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_prepare module=db status=ok schema={} duration_ms={}",
                schema.name(),
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=db_prepare module=db status=error schema={} duration_ms={} error_code=db_bootstrap_failed error={}",
                schema.name(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    schema: &StoreSchema,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    schema.apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{has_existing_store, inspect_store, StoreStatus};
    use crate::db::DIARY_SCHEMA;
    use rusqlite::Connection;

    #[test]
    fn missing_or_empty_file_is_not_an_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        assert!(!has_existing_store(&path));

        std::fs::write(&path, b"").unwrap();
        assert!(!has_existing_store(&path));
        assert!(!has_existing_store(dir.path()));
    }

    #[test]
    fn inspect_reports_fresh_without_reading() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 999;").unwrap();
        assert_eq!(
            inspect_store(&conn, &DIARY_SCHEMA, false),
            StoreStatus::Fresh
        );
    }

    #[test]
    fn inspect_classifies_versions() {
        let conn = Connection::open_in_memory().unwrap();
        let latest = DIARY_SCHEMA.latest_version();

        conn.execute_batch(&format!("PRAGMA user_version = {latest};"))
            .unwrap();
        assert_eq!(
            inspect_store(&conn, &DIARY_SCHEMA, true),
            StoreStatus::Current
        );

        conn.execute_batch("PRAGMA user_version = 1;").unwrap();
        let status = inspect_store(&conn, &DIARY_SCHEMA, true);
        assert_eq!(
            status,
            StoreStatus::NeedsMigration {
                from_version: Some(1),
                to_version: latest
            }
        );
        assert!(status.requires_migration());

        conn.execute_batch(&format!("PRAGMA user_version = {};", latest + 1))
            .unwrap();
        assert_eq!(
            inspect_store(&conn, &DIARY_SCHEMA, true),
            StoreStatus::Newer {
                db_version: latest + 1,
                latest_supported: latest
            }
        );
    }
}
