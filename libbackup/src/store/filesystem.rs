use std::path::{Path, PathBuf};

use common::BackupDescriptor;
use tokio::fs::{File, create_dir_all, read, rename};
use tokio::io::{self, AsyncWriteExt, BufWriter};

use crate::error::StoreError;
use crate::store::ObjectStore;
use crate::store::paths::PathManager;

pub const FILESYSTEM_BACKEND: &str = "filesystem";

/// Object store backed by a local directory.
pub struct FilesystemStore {
    name: String,
    path_manager: PathManager,
}

impl FilesystemStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_name(FILESYSTEM_BACKEND, root)
    }

    pub fn with_name<P: AsRef<Path>>(name: &str, root: P) -> Self {
        FilesystemStore {
            name: name.to_owned(),
            path_manager: PathManager::new(root),
        }
    }

    async fn crate_path(&self, path: PathBuf) -> io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        Ok(path)
    }

    async fn write_file(&self, path: PathBuf, data: &[u8]) -> io::Result<()> {
        let file_path = self.crate_path(path).await?;
        let mut writer = BufWriter::new(File::create(file_path).await?);
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStore for FilesystemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn home_dir(&self, id: &str) -> String {
        self.path_manager.home_path(id).display().to_string()
    }

    async fn get_meta(&self, id: &str) -> Result<BackupDescriptor, StoreError> {
        let path = self.path_manager.meta_path(id);
        let content = match read(&path).await {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&content)?)
    }

    async fn put_meta(&self, id: &str, desc: &BackupDescriptor) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(desc)?;
        let meta_path = self.path_manager.meta_path(id);
        // readers never observe a half-written metadata file
        let tmp_path = meta_path.with_extension("json.tmp");
        self.write_file(tmp_path.clone(), &content).await?;
        rename(tmp_path, meta_path).await?;
        Ok(())
    }

    async fn put_object(&self, id: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_manager.object_path(id, key)?;
        self.write_file(path, data).await?;
        Ok(())
    }

    async fn get_object(&self, id: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_manager.object_path(id, key)?;
        match read(path).await {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
