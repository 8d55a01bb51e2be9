//! Per-store SQLite migration registries and executor.
//!
//! # Responsibility
//! - Register each store's schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic within one schema.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Shipped migrations are never edited; schema changes append a new file.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

/// Ordered migration set for one backing store.
#[derive(Debug, Clone, Copy)]
pub struct StoreSchema {
    name: &'static str,
    migrations: &'static [Migration],
}

const DIARY_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("diary/0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("diary/0002_attachments.sql"),
    },
    Migration {
        version: 3,
        sql: include_str!("diary/0003_report_marks.sql"),
    },
];

const REPORT_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("report/0001_init.sql"),
}];

/// Schema of the primary diary store.
pub const DIARY_SCHEMA: StoreSchema = StoreSchema {
    name: "diary",
    migrations: DIARY_MIGRATIONS,
};

/// Schema of the report data store.
pub const REPORT_SCHEMA: StoreSchema = StoreSchema {
    name: "report",
    migrations: REPORT_MIGRATIONS,
};

impl StoreSchema {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the latest migration version known by this binary.
    pub fn latest_version(&self) -> u32 {
        self.migrations
            .last()
            .map_or(0, |migration| migration.version)
    }

    /// Returns every registered version in application order.
    pub fn versions(&self) -> Vec<u32> {
        self.migrations
            .iter()
            .map(|migration| migration.version)
            .collect()
    }

    /// Applies all pending migrations on the provided connection.
    pub fn apply_migrations(&self, conn: &mut Connection) -> DbResult<()> {
        self.migrate_to(conn, self.latest_version())
    }

    /// Applies pending migrations up to and including `target`.
    ///
    /// A database already at or past `target` is left untouched; migrations
    /// never run backwards.
    ///
    /// # Errors
    /// - `UnknownTargetVersion` when `target` is neither `0` nor a registered
    ///   version.
    /// - `UnsupportedSchemaVersion` when the database is newer than this
    ///   binary.
    /// - `Sqlite` when a migration statement fails; the transaction is rolled
    ///   back and `user_version` keeps its previous value.
    pub fn migrate_to(&self, conn: &mut Connection, target: u32) -> DbResult<()> {
        if target != 0 && !self.migrations.iter().any(|m| m.version == target) {
            return Err(DbError::UnknownTargetVersion {
                schema: self.name,
                target,
            });
        }

        let current_version = current_user_version(conn)?;
        let latest = self.latest_version();
        if current_version > latest {
            return Err(DbError::UnsupportedSchemaVersion {
                schema: self.name,
                db_version: current_version,
                latest_supported: latest,
            });
        }

        if current_version >= target {
            return Ok(());
        }

        let tx = conn.transaction()?;
        for migration in self.migrations {
            if migration.version <= current_version || migration.version > target {
                continue;
            }

            tx.execute_batch(migration.sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        }
        tx.commit()?;

        Ok(())
    }
}

/// Reads `PRAGMA user_version` from the connection.
///
/// This is the first statement that touches the file, so unreadable or
/// non-SQLite files surface here.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
