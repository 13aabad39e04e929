mod atomic_io;
mod debounce;
mod document;
mod storage;
mod storage_keys;

use thiserror::Error;

use crate::assets::AssetLibraryError;
use crate::world::{AssetId, InstanceId};

pub(crate) use atomic_io::write_text_atomic;
pub use debounce::{SaveDebouncer, DEFAULT_SAVE_DEBOUNCE};
pub(crate) use document::{parse_instance_entry, validate_import};
pub use document::{build_document, SavedInstance, WorldDocument, WORLD_DOCUMENT_VERSION};
pub use storage::{FileStorage, MemoryStorage, StorageError, WorldStorage};
pub use storage_keys::{validate_storage_key, StorageKeyError};

/// Document-level import failures. Any of these rejects the whole import
/// before the world is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportValidationError {
    #[error("document is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("document is null")]
    NullDocument,
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document has no 'version' field")]
    MissingVersion,
    #[error("document has no 'placedInstances' field")]
    MissingPlacedInstances,
    #[error("'placedInstances' is not a list")]
    PlacedInstancesNotArray,
    #[error("invalid field {path}: {message}")]
    MalformedField { path: String, message: String },
}

/// Failure to restore a single instance during load or import. These are
/// logged and skipped; they never abort the surrounding operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceRestoreError {
    #[error("asset '{asset_id}' is not in the library and has no embedded data")]
    Unresolved { asset_id: AssetId },
    #[error(transparent)]
    Library(#[from] AssetLibraryError),
    #[error("instance id '{0}' appears more than once")]
    DuplicateInstance(InstanceId),
    #[error("malformed instance entry: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("import rejected: {0}")]
    Validation(#[from] ImportValidationError),
    #[error("failed to parse saved world at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("failed to encode world document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to save world ({asset_count} assets): {source}")]
    Storage {
        #[source]
        source: StorageError,
        asset_count: usize,
    },
    #[error("failed to read saved world: {0}")]
    Read(#[source] StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstance {
    pub index: usize,
    pub instance_id: Option<InstanceId>,
    pub error: InstanceRestoreError,
}

/// Outcome of a load or import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub document_found: bool,
    pub restored: usize,
    pub skipped: Vec<SkippedInstance>,
    /// Set when the document version differs from [`WORLD_DOCUMENT_VERSION`].
    pub version_mismatch: Option<String>,
    /// Implicit save after import that could not be written.
    pub save_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReceipt {
    pub asset_count: usize,
    pub timestamp_ms: u64,
    pub bytes: usize,
}
