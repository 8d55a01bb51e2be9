//! Dual-store coordination for the diary application.
//! Attaches the primary diary and report data SQLite stores under one
//! coordinator and announces migration phases to observers.

pub mod coordinator;
pub mod db;
pub mod events;
pub mod logging;
pub mod store;

pub use coordinator::{
    default_coordinator, init_default_coordinator, teardown_default_coordinator,
    with_default_coordinator, AttachedStore, CoordinatorConfig, CoordinatorError,
    CoordinatorResult, StoreCoordinator,
};
pub use events::{
    EventError, MigrationEvent, MigrationObserver, MigrationObservers, ObserverId,
    DID_COMPLETE_MIGRATION, DID_FAIL_MIGRATION, WILL_BEGIN_MIGRATION,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use store::{default_app_data_root, StoreDescriptor, StoreKind, StoreLayout};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
