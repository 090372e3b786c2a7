//! Low-level key-value storage backend trait and supporting types.
//!
//! The [`StorageBackend`] trait is the contract every storage engine
//! implements: [`get`](StorageBackend::get), [`put`](StorageBackend::put),
//! [`put_if_version`](StorageBackend::put_if_version),
//! [`delete`](StorageBackend::delete) and
//! [`list_by_prefix`](StorageBackend::list_by_prefix).
//!
//! Domain rules (assignee check, pending check, action lookup) do **not**
//! belong here. Backends are dumb KV stores; the rules live in
//! [`UserJobStore`](crate::store::generic::UserJobStore).
//!
//! # Key Structure
//!
//! Keys are `{collection}:{id}`, e.g. `users_jobs:42`. Collection names
//! never contain a colon, so `{collection}:` is a prefix selecting one
//! collection.
//!
//! # Versioning
//!
//! Each stored record carries a monotonic `u64` version starting at 1 and
//! incremented on every successful write.
//! [`put_if_version`](StorageBackend::put_if_version) is the
//! compare-and-swap primitive resolutions rely on.

use std::fmt;

use async_trait::async_trait;

/// A stored record paired with its version.
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::backend::VersionedRecord;
///
/// let record = VersionedRecord {
///     data: b"{}".to_vec(),
///     version: 1,
/// };
/// assert_eq!(record.version, 1);
/// ```
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    /// Serialized record (canonical JSON).
    pub data: Vec<u8>,

    /// Monotonic version, starting at 1.
    pub version: u64,
}

/// Errors from raw storage operations.
///
/// [`UserJobStore`](crate::store::generic::UserJobStore) maps them to
/// [`StoreError`](crate::error::StoreError) variants before surfacing them.
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::backend::StorageError;
///
/// let err = StorageError::VersionConflict {
///     key: "users_jobs:1".to_string(),
///     expected: 2,
///     actual: 3,
/// };
/// assert!(err.to_string().contains("expected 2"));
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// No record under this key.
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A [`put_if_version`](StorageBackend::put_if_version) lost: the
    /// stored version moved on.
    VersionConflict {
        /// The contested key.
        key: String,
        /// Version the caller read.
        expected: u64,
        /// Version found in storage.
        actual: u64,
    },

    /// The backend is full.
    CapacityExceeded {
        /// What limit was hit.
        message: String,
    },

    /// I/O or engine failure.
    Backend {
        /// Description of the failure.
        message: String,
        /// Underlying error, if any.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "key not found: {key}"),
            Self::VersionConflict {
                key,
                expected,
                actual,
            } => write!(
                f,
                "version conflict on key {key}: expected {expected}, found {actual}"
            ),
            Self::CapacityExceeded { message } => {
                write!(f, "capacity exceeded: {message}")
            },
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// Key-value storage backend for user job persistence.
///
/// Implementations must be `Send + Sync`; the store is shared by every
/// request handler. Keys are stored and returned verbatim.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves a record and its version.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the key is absent.
    async fn get(&self, key: &str) -> Result<VersionedRecord, StorageError>;

    /// Stores a record unconditionally and returns its new version (1 for a
    /// new key).
    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError>;

    /// Stores a record only if its version is still `expected_version`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if the key is absent.
    /// - [`StorageError::VersionConflict`] if another write got there
    ///   first.
    async fn put_if_version(
        &self,
        key: &str,
        data: &[u8],
        expected_version: u64,
    ) -> Result<u64, StorageError>;

    /// Deletes a record; `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists every record whose key starts with `prefix`.
    async fn list_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, VersionedRecord)>, StorageError>;
}

/// Builds the key of record `id` in `collection`.
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::backend::make_key;
///
/// assert_eq!(make_key("users_jobs", 42), "users_jobs:42");
/// ```
pub fn make_key(collection: &str, id: i64) -> String {
    format!("{collection}:{id}")
}

/// Splits a key into `(collection, id)`.
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::backend::parse_key;
///
/// assert_eq!(parse_key("users_jobs:42"), Some(("users_jobs", 42)));
/// assert_eq!(parse_key("users_jobs:x"), None);
/// assert_eq!(parse_key("no-colon"), None);
/// ```
pub fn parse_key(key: &str) -> Option<(&str, i64)> {
    let (collection, id) = key.split_once(':')?;
    Some((collection, id.parse().ok()?))
}

/// Prefix selecting every record of `collection`.
pub fn make_prefix(collection: &str) -> String {
    format!("{collection}:")
}
