// PathManager maps backup ids and object keys to locations under the
// backend root.
//
// The layout of a filesystem backend is as follows:
//
//	<root>
//	└── <backup id>
//	    ├── backup_config.json
//	    └── <class>
//	        └── <shard>
//	            └── <file>
//
// Object keys are relative to the backup home and never escape it.

use std::io;
use std::path::{Component, Path, PathBuf};

use common::BACKUP_FILE;

#[derive(Clone, Debug)]
pub struct PathManager {
    root_path: PathBuf,
}

impl PathManager {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        PathManager {
            root_path: root.as_ref().to_path_buf(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Returns the home directory of a backup,
    /// (e.g. `<root>/<id>`).
    pub fn home_path(&self, id: &str) -> PathBuf {
        self.root_path.join(id)
    }

    /// Returns the path of the metadata file of a backup,
    /// (e.g. `<root>/<id>/backup_config.json`).
    pub fn meta_path(&self, id: &str) -> PathBuf {
        self.home_path(id).join(BACKUP_FILE)
    }

    /// Returns the path of an object written by a backup,
    /// (e.g. `<root>/<id>/<class>/<shard>/<file>`).
    pub fn object_path(&self, id: &str, key: &str) -> io::Result<PathBuf> {
        let key = Path::new(key);
        let plain = key
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain || key.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid object key {}", key.display()),
            ));
        }
        Ok(self.home_path(id).join(key))
    }
}
