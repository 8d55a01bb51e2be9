//! Dual-store coordinator.
//!
//! # Responsibility
//! - Attach and detach the primary diary and report data stores.
//! - Migrate existing stores before they are attached.
//! - Announce migration phases to registered observers.
//!
//! # Invariants
//! - At most one connection is attached per `StoreKind`.
//! - A store is attached only after its schema is current.
//! - `WillBegin` is followed by exactly one of `DidComplete`/`DidFail`, and
//!   no event fires for stores that need no migration.
//! - Failed stores stay detached; nothing is retried.

mod config;
mod default;

pub use config::{CoordinatorConfig, DATA_DIR_ENV};
pub use default::{
    default_coordinator, init_default_coordinator, teardown_default_coordinator,
    with_default_coordinator,
};

use crate::db::{
    has_existing_store, inspect_store, open_connection, prepare_connection, DbError, StoreStatus,
};
use crate::events::{MigrationEvent, MigrationObservers};
use crate::store::{StoreDescriptor, StoreKind, StoreLayout};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Debug)]
pub enum CoordinatorError {
    /// The store could not be opened: unwritable path, unreadable file, or a
    /// schema newer than this binary.
    StoreOpenFailed { store: StoreKind, source: DbError },
    /// The store needed an upgrade and the upgrade did not complete.
    MigrationFailed { store: StoreKind, source: DbError },
    DefaultAlreadyInitialized {
        active_root: PathBuf,
        requested_root: PathBuf,
    },
}

impl CoordinatorError {
    pub fn store(&self) -> Option<StoreKind> {
        match self {
            Self::StoreOpenFailed { store, .. } | Self::MigrationFailed { store, .. } => {
                Some(*store)
            }
            Self::DefaultAlreadyInitialized { .. } => None,
        }
    }

    /// Stable error code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreOpenFailed { .. } => "store_open_failed",
            Self::MigrationFailed { .. } => "migration_failed",
            Self::DefaultAlreadyInitialized { .. } => "default_already_initialized",
        }
    }
}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreOpenFailed { store, source } => {
                write!(f, "failed to open {store} store: {source}")
            }
            Self::MigrationFailed { store, source } => {
                write!(f, "failed to migrate {store} store: {source}")
            }
            Self::DefaultAlreadyInitialized {
                active_root,
                requested_root,
            } => write!(
                f,
                "default coordinator already initialized at `{}`; refusing to switch to `{}`",
                active_root.display(),
                requested_root.display()
            ),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreOpenFailed { source, .. } | Self::MigrationFailed { source, .. } => {
                Some(source)
            }
            Self::DefaultAlreadyInitialized { .. } => None,
        }
    }
}

/// One store attached to the coordinator.
pub struct AttachedStore {
    descriptor: StoreDescriptor,
    conn: Connection,
}

impl AttachedStore {
    pub fn descriptor(&self) -> &StoreDescriptor {
        &self.descriptor
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Single access point for both backing stores.
///
/// Operations take `&mut self`; the process-wide instance is serialized by
/// the mutex returned from [`default_coordinator`]. Observers run while the
/// coordinator is borrowed and must not call back into it.
pub struct StoreCoordinator {
    layout: StoreLayout,
    busy_timeout: Duration,
    attached: BTreeMap<StoreKind, AttachedStore>,
    observers: MigrationObservers,
}

impl StoreCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            layout: StoreLayout::new(config.app_data_root),
            busy_timeout: config.busy_timeout,
            attached: BTreeMap::new(),
            observers: MigrationObservers::new(),
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn observers(&self) -> &MigrationObservers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut MigrationObservers {
        &mut self.observers
    }

    pub fn is_attached(&self, kind: StoreKind) -> bool {
        self.attached.contains_key(&kind)
    }

    /// Attached store kinds, in attach order.
    pub fn attached_stores(&self) -> Vec<StoreKind> {
        self.attached.keys().copied().collect()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn store(&self, kind: StoreKind) -> Option<&AttachedStore> {
        self.attached.get(&kind)
    }

    pub fn connection(&self, kind: StoreKind) -> Option<&Connection> {
        self.attached.get(&kind).map(|store| &store.conn)
    }

    pub fn connection_mut(&mut self, kind: StoreKind) -> Option<&mut Connection> {
        self.attached.get_mut(&kind).map(|store| &mut store.conn)
    }

    /// Attaches both stores, primary diary first.
    ///
    /// Stops at the first failure; stores attached before it stay attached.
    ///
    /// # Side effects
    /// - Creates the root, store files, and external data directory.
    /// - Publishes migration events for stores that need an upgrade.
    pub fn add_stores(&mut self) -> CoordinatorResult<()> {
        for kind in StoreKind::ALL {
            self.add_store(kind)?;
        }
        Ok(())
    }

    /// Attaches one store. Already attached stores are left untouched.
    pub fn add_store(&mut self, kind: StoreKind) -> CoordinatorResult<()> {
        if self.is_attached(kind) {
            debug!(
                "event=store_attach module=coordinator status=skipped store={} reason=already_attached",
                kind
            );
            return Ok(());
        }

        let started_at = Instant::now();
        info!(
            "event=store_attach module=coordinator status=start store={}",
            kind
        );

        let descriptor = self.layout.descriptor(kind);
        let fail_open = |source: DbError| open_failed(kind, source, started_at);

        if let Some(external) = descriptor.external_data_path.as_deref() {
            std::fs::create_dir_all(external).map_err(|source| {
                fail_open(DbError::Io {
                    path: external.to_path_buf(),
                    source,
                })
            })?;
        }

        let existed_on_disk = has_existing_store(&descriptor.path);
        let mut conn = open_connection(&descriptor.path).map_err(fail_open)?;
        let schema = kind.schema();

        match inspect_store(&conn, schema, existed_on_disk) {
            StoreStatus::Fresh | StoreStatus::Current => {
                prepare_connection(&mut conn, schema, self.busy_timeout).map_err(fail_open)?;
            }
            StoreStatus::NeedsMigration {
                from_version,
                to_version,
            } => {
                self.migrate_store(kind, &mut conn, from_version, to_version)?;
            }
            StoreStatus::Newer {
                db_version,
                latest_supported,
            } => {
                return Err(fail_open(DbError::UnsupportedSchemaVersion {
                    schema: schema.name(),
                    db_version,
                    latest_supported,
                }));
            }
        }

        info!(
            "event=store_attach module=coordinator status=ok store={} fresh={} duration_ms={}",
            kind,
            !existed_on_disk,
            started_at.elapsed().as_millis()
        );
        self.attached
            .insert(kind, AttachedStore { descriptor, conn });
        Ok(())
    }

    /// Detaches both stores. Never fails and publishes no events.
    pub fn remove_stores(&mut self) {
        for kind in StoreKind::ALL {
            self.remove_store(kind);
        }
    }

    /// Detaches one store. Returns `false` when it was not attached.
    pub fn remove_store(&mut self, kind: StoreKind) -> bool {
        let Some(store) = self.attached.remove(&kind) else {
            return false;
        };

        // The connection is dropped either way; a close error only loses
        // the chance to report it.
        if let Err((_conn, err)) = store.conn.close() {
            warn!(
                "event=store_detach module=coordinator status=degraded store={} error={}",
                kind, err
            );
        } else {
            info!(
                "event=store_detach module=coordinator status=ok store={}",
                kind
            );
        }
        true
    }

    fn migrate_store(
        &self,
        kind: StoreKind,
        conn: &mut Connection,
        from_version: Option<u32>,
        to_version: u32,
    ) -> CoordinatorResult<()> {
        let migration_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(
            "event=store_migration module=coordinator status=start store={} migration_id={} from_version={} to_version={}",
            kind,
            migration_id,
            from_version.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
            to_version
        );
        self.observers.publish(MigrationEvent::WillBegin);

        match prepare_connection(conn, kind.schema(), self.busy_timeout) {
            Ok(()) => {
                info!(
                    "event=store_migration module=coordinator status=ok store={} migration_id={} duration_ms={}",
                    kind,
                    migration_id,
                    started_at.elapsed().as_millis()
                );
                self.observers.publish(MigrationEvent::DidComplete);
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=store_migration module=coordinator status=error store={} migration_id={} duration_ms={} error_code=migration_failed error={}",
                    kind,
                    migration_id,
                    started_at.elapsed().as_millis(),
                    source
                );
                self.observers.publish(MigrationEvent::DidFail);
                Err(CoordinatorError::MigrationFailed {
                    store: kind,
                    source,
                })
            }
        }
    }
}

fn open_failed(kind: StoreKind, source: DbError, started_at: Instant) -> CoordinatorError {
    error!(
        "event=store_attach module=coordinator status=error store={} duration_ms={} error_code=store_open_failed error={}",
        kind,
        started_at.elapsed().as_millis(),
        source
    );
    CoordinatorError::StoreOpenFailed {
        store: kind,
        source,
    }
}
