pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::ResourceMetadata;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Persistence collaborator boundary.
///
/// The engine only ever calls these three operations; everything else about
/// storage is the store's concern, including serializing concurrent writes
/// for the same resource id.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn exists(&self, resource_id: Uuid) -> Result<bool, StoreError>;

    /// Persists a fully translated metadata record and returns the locally
    /// generated resource identifier (distinct from the external resource's
    /// own id). A later save for the same external resource overwrites by
    /// getting a fresh local record.
    async fn save_metadata(&self, metadata: &ResourceMetadata) -> Result<Uuid, StoreError>;

    /// Persists fetched artifact data against a known resource.
    async fn save_data(&self, resource_id: Uuid, payload: &str) -> Result<(), StoreError>;
}

/// Lock-guarded in-memory store. Default backend for the CLI one-shot
/// commands and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<Uuid, StoredResource>>,
}

struct StoredResource {
    metadata: ResourceMetadata,
    data: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under a known id. Test convenience.
    pub fn seed(&self, resource_id: Uuid, metadata: ResourceMetadata) {
        self.inner.lock().unwrap().insert(
            resource_id,
            StoredResource {
                metadata,
                data: None,
            },
        );
    }

    pub fn metadata(&self, resource_id: Uuid) -> Option<ResourceMetadata> {
        self.inner
            .lock()
            .unwrap()
            .get(&resource_id)
            .map(|r| r.metadata.clone())
    }

    pub fn data(&self, resource_id: Uuid) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .get(&resource_id)
            .and_then(|r| r.data.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn exists(&self, resource_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().contains_key(&resource_id))
    }

    async fn save_metadata(&self, metadata: &ResourceMetadata) -> Result<Uuid, StoreError> {
        let resource_id = Uuid::new_v4();
        self.inner.lock().unwrap().insert(
            resource_id,
            StoredResource {
                metadata: metadata.clone(),
                data: None,
            },
        );
        Ok(resource_id)
    }

    async fn save_data(&self, resource_id: Uuid, payload: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .get_mut(&resource_id)
            .ok_or(StoreError::NotFound(resource_id))?;
        record.data = Some(payload.to_string());
        Ok(())
    }
}
