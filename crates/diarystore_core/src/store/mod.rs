//! Store identities and on-disk layout.
//!
//! # Responsibility
//! - Name the two backing stores the coordinator manages.
//! - Derive every store path from one application-data root.
//!
//! # Invariants
//! - File names and the external-data directory name are persisted state;
//!   changing them strands existing installations.
//! - Path computation never touches the file system.

pub mod descriptor;
pub mod layout;

pub use descriptor::{StoreDescriptor, StoreKind};
pub use layout::{default_app_data_root, StoreLayout};
