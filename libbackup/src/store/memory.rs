//! In-memory object store, used for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::BackupDescriptor;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::ObjectStore;

type ObjectKey = (String /*backup id*/, String /*object key*/);

#[derive(Default)]
pub struct InMemoryStore {
    name: String,
    metas: RwLock<HashMap<String, BackupDescriptor>>,
    objects: RwLock<HashMap<ObjectKey, Vec<u8>>>,
    meta_reads: AtomicUsize,
    fail_put_meta: AtomicBool,
}

impl InMemoryStore {
    pub fn new(name: &str) -> Self {
        InMemoryStore {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Number of `get_meta` calls served so far.
    pub fn meta_reads(&self) -> usize {
        self.meta_reads.load(Ordering::SeqCst)
    }

    /// Makes every following `put_meta` fail with an IO error.
    pub fn fail_put_meta(&self, fail: bool) {
        self.fail_put_meta.store(fail, Ordering::SeqCst);
    }

    pub async fn object_keys(&self, id: &str) -> Vec<String> {
        let objects = self.objects.read().await;
        let mut keys: Vec<_> = objects
            .keys()
            .filter(|(bak, _)| bak == id)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn home_dir(&self, id: &str) -> String {
        format!("mem://{}/{}", self.name, id)
    }

    async fn get_meta(&self, id: &str) -> Result<BackupDescriptor, StoreError> {
        self.meta_reads.fetch_add(1, Ordering::SeqCst);
        self.metas
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(self.home_dir(id)))
    }

    async fn put_meta(&self, id: &str, desc: &BackupDescriptor) -> Result<(), StoreError> {
        if self.fail_put_meta.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(
                "metadata writes are disabled",
            )));
        }
        self.metas.write().await.insert(id.to_owned(), desc.clone());
        Ok(())
    }

    async fn put_object(&self, id: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.objects
            .write()
            .await
            .insert((id.to_owned(), key.to_owned()), data.to_vec());
        Ok(())
    }

    async fn get_object(&self, id: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let objects = self.objects.read().await;
        Ok(objects.get(&(id.to_owned(), key.to_owned())).cloned())
    }
}
