use std::collections::HashMap;
use std::sync::Arc;

use common::BackupDescriptor;

use crate::error::{BackupError, StoreError};

pub mod filesystem;
pub mod memory;
pub mod paths;

/// Backend that receives backup objects and the backup's metadata file.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;
    /// Destination location of backup `id`, reported back to callers.
    fn home_dir(&self, id: &str) -> String;
    async fn get_meta(&self, id: &str) -> Result<BackupDescriptor, StoreError>;
    async fn put_meta(&self, id: &str, desc: &BackupDescriptor) -> Result<(), StoreError>;
    async fn put_object(&self, id: &str, key: &str, data: &[u8]) -> Result<(), StoreError>;
    async fn get_object(&self, id: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Resolves a backend name to its object store.
pub trait BackendProvider: Send + Sync {
    fn backup_backend(&self, name: &str) -> Result<Arc<dyn ObjectStore>, BackupError>;
}

#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ObjectStore>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `store` under its own name, replacing any previous entry.
    pub fn register(&mut self, store: Arc<dyn ObjectStore>) -> Option<Arc<dyn ObjectStore>> {
        self.backends.insert(store.name().to_owned(), store)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

impl BackendProvider for BackendRegistry {
    fn backup_backend(&self, name: &str) -> Result<Arc<dyn ObjectStore>, BackupError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| BackupError::Unprocessable(format!("backend {name} is not registered")))
    }
}
