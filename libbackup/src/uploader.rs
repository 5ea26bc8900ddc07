use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{BackupDescriptor, ClassDescriptor, ShardDescriptor, Status};
use tracing::{debug, info};

use crate::error::BackupError;
use crate::store::ObjectStore;

/// Data of one shard as handed out by a [`Sourcer`].
#[derive(Debug, Clone, Default)]
pub struct ShardSource {
    pub name: String,
    pub node: String,
    /// `(file name, content)` pairs, written in order.
    pub files: Vec<(String, Vec<u8>)>,
}

/// Enumerates the shards of a class and their content.
#[async_trait]
pub trait Sourcer: Send + Sync {
    async fn list_shards(&self, class: &str) -> Result<Vec<ShardSource>, BackupError>;
}

/// Fixed set of classes held in memory.
#[derive(Debug, Default)]
pub struct InMemorySourcer {
    classes: HashMap<String, Vec<ShardSource>>,
    failing: HashSet<String>,
}

impl InMemorySourcer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shard(mut self, class: &str, shard: ShardSource) -> Self {
        self.classes.entry(class.to_owned()).or_default().push(shard);
        self
    }

    /// Makes listing `class` fail, simulating an unreadable shard.
    pub fn with_failing_class(mut self, class: &str) -> Self {
        self.failing.insert(class.to_owned());
        self
    }
}

#[async_trait]
impl Sourcer for InMemorySourcer {
    async fn list_shards(&self, class: &str) -> Result<Vec<ShardSource>, BackupError> {
        if self.failing.contains(class) {
            return Err(BackupError::Source(format!("class {class}: shard unreadable")));
        }
        self.classes
            .get(class)
            .cloned()
            .ok_or_else(|| BackupError::Source(format!("class {class} not found")))
    }
}

/// Publishes progress of the running backup.
pub type StatusSetter = Arc<dyn Fn(Status) + Send + Sync>;

/// Copies the requested classes of one backup into an object store.
pub struct Uploader {
    sourcer: Arc<dyn Sourcer>,
    store: Arc<dyn ObjectStore>,
    backup_id: String,
    set_status: StatusSetter,
}

impl Uploader {
    pub fn new(
        sourcer: Arc<dyn Sourcer>,
        store: Arc<dyn ObjectStore>,
        backup_id: &str,
        set_status: StatusSetter,
    ) -> Self {
        Uploader {
            sourcer,
            store,
            backup_id: backup_id.to_owned(),
            set_status,
        }
    }

    /// Uploads `classes` in the given order, appending one class
    /// descriptor per class. Stops at the first error.
    pub async fn all(
        &self,
        classes: &[String],
        desc: &mut BackupDescriptor,
    ) -> Result<(), BackupError> {
        (self.set_status)(Status::Transferring);
        for class in classes {
            let class_desc = self.class(class).await?;
            info!(
                backup_id = %self.backup_id,
                class = %class,
                bytes = class_desc.bytes,
                "class uploaded"
            );
            desc.classes.push(class_desc);
        }
        (self.set_status)(Status::Transferred);
        Ok(())
    }

    async fn class(&self, class: &str) -> Result<ClassDescriptor, BackupError> {
        let shards = self.sourcer.list_shards(class).await?;
        let mut class_desc = ClassDescriptor {
            name: class.to_owned(),
            shards: Vec::with_capacity(shards.len()),
            ..Default::default()
        };

        for shard in shards {
            let mut shard_desc = ShardDescriptor {
                name: shard.name.clone(),
                node: shard.node.clone(),
                ..Default::default()
            };
            for (file, content) in &shard.files {
                let key = format!("{class}/{}/{file}", shard.name);
                debug!(backup_id = %self.backup_id, key = %key, "uploading object");
                self.store
                    .put_object(&self.backup_id, &key, content)
                    .await?;
                shard_desc.files.push(key);
                shard_desc.bytes += content.len() as u64;
            }
            class_desc.chunks += shard_desc.files.len() as u64;
            class_desc.bytes += shard_desc.bytes;
            class_desc.shards.push(shard_desc);
        }
        Ok(class_desc)
    }
}
