//! Path layout rooted at the application-data directory.
//!
//! ```text
//! <root>/primaryDiaryStore.sqlite
//! <root>/reportDataStore.sqlite
//! <root>/primaryDiaryStore_EXTERNAL_DATA/
//! ```

use super::descriptor::{StoreDescriptor, StoreKind};
use std::path::{Path, PathBuf};

const APP_DATA_DIR_NAME: &str = "DiaryStore";
const EXTERNAL_STORAGE_PATH_COMPONENT: &str = "primaryDiaryStore_EXTERNAL_DATA";

/// Returns the platform application-data root for this application.
///
/// Falls back to the temp directory on platforms without a data directory.
/// Never touches the file system.
pub fn default_app_data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DATA_DIR_NAME)
}

/// Deterministic path computations for both stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn primary_diary_store_path(&self) -> PathBuf {
        self.store_path(StoreKind::PrimaryDiary)
    }

    pub fn report_data_store_path(&self) -> PathBuf {
        self.store_path(StoreKind::ReportData)
    }

    /// Directory name used for externally stored binary payloads.
    pub fn path_component_to_external_storage() -> &'static str {
        EXTERNAL_STORAGE_PATH_COMPONENT
    }

    /// External data directory, beside the primary diary store file.
    pub fn primary_diary_store_external_data_path(&self) -> PathBuf {
        self.root.join(Self::path_component_to_external_storage())
    }

    pub fn store_path(&self, kind: StoreKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn descriptor(&self, kind: StoreKind) -> StoreDescriptor {
        StoreDescriptor {
            kind,
            path: self.store_path(kind),
            external_data_path: kind
                .uses_external_storage()
                .then(|| self.primary_diary_store_external_data_path()),
        }
    }

    /// Descriptors for every store, in attach order.
    pub fn descriptors(&self) -> Vec<StoreDescriptor> {
        StoreKind::ALL
            .into_iter()
            .map(|kind| self.descriptor(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::StoreLayout;
    use crate::store::StoreKind;
    use std::path::Path;

    #[test]
    fn external_data_path_sits_beside_primary_store() {
        let layout = StoreLayout::new("/data/app");
        let primary = layout.primary_diary_store_path();
        let external = layout.primary_diary_store_external_data_path();

        assert_eq!(primary.parent(), external.parent());
        assert_eq!(
            external.file_name().and_then(|name| name.to_str()),
            Some(StoreLayout::path_component_to_external_storage())
        );
    }

    #[test]
    fn descriptors_follow_attach_order() {
        let layout = StoreLayout::new("/data/app");
        let descriptors = layout.descriptors();
        let kinds: Vec<StoreKind> = descriptors.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, StoreKind::ALL.to_vec());

        assert_eq!(
            descriptors[0].external_data_path.as_deref(),
            Some(Path::new("/data/app/primaryDiaryStore_EXTERNAL_DATA"))
        );
        assert!(descriptors[1].external_data_path.is_none());
    }
}
