//! Process-wide default coordinator.
//!
//! # Invariants
//! - At most one default coordinator exists per process.
//! - Its root is fixed on first use; teardown detaches stores and observers
//!   but keeps the handle.
//! - Every structural operation runs with the whole coordinator locked.

use super::{CoordinatorConfig, CoordinatorError, CoordinatorResult, StoreCoordinator};
use log::info;
use once_cell::sync::OnceCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

static DEFAULT_COORDINATOR: OnceCell<Mutex<StoreCoordinator>> = OnceCell::new();

/// Creates the default coordinator with an explicit configuration.
///
/// Calling again with the same root is a no-op.
///
/// # Errors
/// - `DefaultAlreadyInitialized` when the default coordinator already exists
///   with a different root, including one created implicitly by
///   [`default_coordinator`].
pub fn init_default_coordinator(config: CoordinatorConfig) -> CoordinatorResult<()> {
    let requested_root = config.app_data_root.clone();
    let cell = DEFAULT_COORDINATOR.get_or_init(|| create(config));

    let active_root = lock(cell).layout().root().to_path_buf();
    if active_root != requested_root {
        return Err(CoordinatorError::DefaultAlreadyInitialized {
            active_root,
            requested_root,
        });
    }
    Ok(())
}

/// Returns the default coordinator, creating it from
/// [`CoordinatorConfig::from_env`] on first call.
pub fn default_coordinator() -> &'static Mutex<StoreCoordinator> {
    DEFAULT_COORDINATOR.get_or_init(|| create(CoordinatorConfig::from_env()))
}

/// Runs `f` with the default coordinator locked.
///
/// A poisoned lock is recovered; a panic mid-operation never leaves a store
/// half-attached.
pub fn with_default_coordinator<T>(f: impl FnOnce(&mut StoreCoordinator) -> T) -> T {
    let mut guard = lock(default_coordinator());
    f(&mut guard)
}

/// Detaches every store and observer from the default coordinator.
///
/// Does nothing when the default coordinator was never created.
pub fn teardown_default_coordinator() {
    let Some(cell) = DEFAULT_COORDINATOR.get() else {
        return;
    };
    let mut coordinator = lock(cell);
    coordinator.remove_stores();
    coordinator.observers_mut().clear();
    info!("event=coordinator_teardown module=coordinator status=ok");
}

fn create(config: CoordinatorConfig) -> Mutex<StoreCoordinator> {
    info!(
        "event=coordinator_init module=coordinator status=ok root={}",
        config.app_data_root.display()
    );
    Mutex::new(StoreCoordinator::new(config))
}

fn lock(cell: &Mutex<StoreCoordinator>) -> MutexGuard<'_, StoreCoordinator> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}
