//! Store kinds and descriptors.

use crate::db::{StoreSchema, DIARY_SCHEMA, REPORT_SCHEMA};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Logical identity of one backing store.
///
/// Ordering follows attach order: the primary diary store is always attached
/// before the report data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Day-to-day diary entries and their attachments.
    PrimaryDiary,
    /// Derived report snapshots.
    ReportData,
}

impl StoreKind {
    /// Every store kind in attach order.
    pub const ALL: [StoreKind; 2] = [StoreKind::PrimaryDiary, StoreKind::ReportData];

    /// Stable logical name used in logs and serialized descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Self::PrimaryDiary => "primary_diary",
            Self::ReportData => "report_data",
        }
    }

    /// File name of the store beneath the application-data root.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PrimaryDiary => "primaryDiaryStore.sqlite",
            Self::ReportData => "reportDataStore.sqlite",
        }
    }

    /// Schema the store is migrated against.
    pub fn schema(self) -> &'static StoreSchema {
        match self {
            Self::PrimaryDiary => &DIARY_SCHEMA,
            Self::ReportData => &REPORT_SCHEMA,
        }
    }

    /// Whether large binary attributes of this store live outside the file.
    pub fn uses_external_storage(self) -> bool {
        matches!(self, Self::PrimaryDiary)
    }
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved location of one backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDescriptor {
    pub kind: StoreKind,
    pub path: PathBuf,
    /// Directory holding large binary payloads, when the store has one.
    pub external_data_path: Option<PathBuf>,
}

impl StoreDescriptor {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
