use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the descriptor layout written by this crate.
pub const DESCRIPTOR_VERSION: &str = "1.0";

/// Name of the metadata file stored in the home directory of every backup.
pub const BACKUP_FILE: &str = "backup_config.json";

pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Started,
    Transferring,
    Transferred,
    Success,
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success | Status::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Started => "STARTED",
            Status::Transferring => "TRANSFERRING",
            Status::Transferred => "TRANSFERRED",
            Status::Success => "SUCCESS",
            Status::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShardDescriptor {
    pub name: String,
    pub node: String,
    /// Object keys written for this shard, relative to the backup home.
    pub files: Vec<String>,
    pub bytes: u64,
}

/// What was captured for a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClassDescriptor {
    pub name: String,
    pub shards: Vec<ShardDescriptor>,
    /// Number of objects written for the class.
    pub chunks: u64,
    pub bytes: u64,
}

/// The durable result of a backup.
///
/// Built incrementally by the orchestrator and the uploader, then handed to
/// the object store. `completed_at` is only set for a successful run; a
/// failed run keeps it empty and carries the reason in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDescriptor {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub version: String,
    pub server_version: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub classes: Vec<ClassDescriptor>,
}

impl BackupDescriptor {
    pub fn new(id: &str, started_at: DateTime<Utc>) -> Self {
        BackupDescriptor {
            id: id.to_owned(),
            started_at,
            completed_at: None,
            version: DESCRIPTOR_VERSION.to_owned(),
            server_version: SERVER_VERSION.to_owned(),
            status: Status::Started,
            error: None,
            classes: Vec::new(),
        }
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    pub fn total_bytes(&self) -> u64 {
        self.classes.iter().map(|c| c.bytes).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Success && self.completed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&Status::Transferring).unwrap(), "\"TRANSFERRING\"");
        let st: Status = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(st, Status::Failed);
        assert!(st.is_terminal());
        assert!(!Status::Transferred.is_terminal());
        assert_eq!(Status::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn test_descriptor_json_layout() {
        let mut desc = BackupDescriptor::new("bak-1", Utc::now());
        desc.classes.push(ClassDescriptor {
            name: "Article".to_string(),
            chunks: 2,
            bytes: 10,
            ..Default::default()
        });
        desc.classes.push(ClassDescriptor {
            name: "Author".to_string(),
            chunks: 1,
            bytes: 5,
            ..Default::default()
        });

        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["id"], "bak-1");
        assert_eq!(json["status"], "STARTED");
        assert!(json.get("completedAt").is_none());
        assert!(json.get("serverVersion").is_some());

        let back: BackupDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back.class_names(), vec!["Article", "Author"]);
        assert_eq!(back.total_bytes(), 15);
        assert!(!back.is_complete());
    }
}
