//! In-memory storage backend.
//!
//! [`InMemoryBackend`] is a thread-safe [`StorageBackend`] over
//! `DashMap<String, (Vec<u8>, u64)>`. Versions are bumped under the
//! entry's shard lock, so `put_if_version` is a real compare-and-swap.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::store::backend::{StorageBackend, StorageError, VersionedRecord};

/// Thread-safe in-memory storage backend.
///
/// # Examples
///
/// ```
/// use manual_tasks_store::store::memory::InMemoryBackend;
/// use manual_tasks_store::store::generic::UserJobStore;
///
/// let store = UserJobStore::new(InMemoryBackend::new());
/// assert!(store.backend().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: DashMap<String, (Vec<u8>, u64)>,
    max_records: Option<usize>,
}

impl InMemoryBackend {
    /// Creates an empty, unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of stored records; inserting a new key beyond it
    /// fails with [`StorageError::CapacityExceeded`].
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_capacity(&self) -> Result<(), StorageError> {
        match self.max_records {
            Some(max) if self.data.len() >= max => Err(StorageError::CapacityExceeded {
                message: format!("max {max} records"),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<VersionedRecord, StorageError> {
        let entry = self.data.get(key).ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })?;
        let (data, version) = entry.value();
        Ok(VersionedRecord {
            data: data.clone(),
            version: *version,
        })
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<u64, StorageError> {
        if !self.data.contains_key(key) {
            self.check_capacity()?;
        }
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let version = entry.get().1 + 1;
                entry.insert((data.to_vec(), version));
                Ok(version)
            },
            Entry::Vacant(entry) => {
                entry.insert((data.to_vec(), 1));
                Ok(1)
            },
        }
    }

    async fn put_if_version(
        &self,
        key: &str,
        data: &[u8],
        expected_version: u64,
    ) -> Result<u64, StorageError> {
        let mut entry = self
            .data
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })?;
        let current_version = entry.value().1;
        if current_version != expected_version {
            return Err(StorageError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: current_version,
            });
        }
        let new_version = current_version + 1;
        *entry.value_mut() = (data.to_vec(), new_version);
        Ok(new_version)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.remove(key).is_some())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, VersionedRecord)>, StorageError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| {
                let (data, version) = entry.value();
                (
                    entry.key().clone(),
                    VersionedRecord {
                        data: data.clone(),
                        version: *version,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_assigns_increasing_versions() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.put("users:1", b"a").await.unwrap(), 1);
        assert_eq!(backend.put("users:1", b"b").await.unwrap(), 2);
        let record = backend.get("users:1").await.unwrap();
        assert_eq!(record.data, b"b");
        assert_eq!(record.version, 2);
    }

    #[tokio::test]
    async fn put_if_version_rejects_stale_writes() {
        let backend = InMemoryBackend::new();
        backend.put("users_jobs:1", b"v1").await.unwrap();
        assert_eq!(backend.put_if_version("users_jobs:1", b"v2", 1).await.unwrap(), 2);

        let err = backend.put_if_version("users_jobs:1", b"v3", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(backend.get("users_jobs:1").await.unwrap().data, b"v2");
    }

    #[tokio::test]
    async fn put_if_version_on_missing_key() {
        let backend = InMemoryBackend::new();
        let err = backend.put_if_version("users_jobs:9", b"x", 1).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_by_prefix_and_delete() {
        let backend = InMemoryBackend::new();
        backend.put("users:1", b"u").await.unwrap();
        backend.put("users_jobs:1", b"j").await.unwrap();
        backend.put("users_jobs:2", b"j").await.unwrap();

        let mut keys: Vec<String> = backend
            .list_by_prefix("users_jobs:")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["users_jobs:1", "users_jobs:2"]);

        assert!(backend.delete("users:1").await.unwrap());
        assert!(!backend.delete("users:1").await.unwrap());
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn capacity_limit_applies_to_new_keys() {
        let backend = InMemoryBackend::new().with_max_records(1);
        backend.put("users:1", b"a").await.unwrap();
        // overwriting an existing key is fine
        backend.put("users:1", b"b").await.unwrap();
        let err = backend.put("users:2", b"c").await.unwrap_err();
        assert!(matches!(err, StorageError::CapacityExceeded { .. }));
    }
}
