//! Backup orchestration.
//!
//! [`Backupper`] admits at most one backup at a time, waits for the
//! coordinator to commit it within a bounded timeout, uploads the requested
//! classes to an [`ObjectStore`] in the background and persists the
//! resulting descriptor. Callers learn the outcome by polling
//! [`Backupper::status`].

pub mod backupper;
pub mod config;
pub mod error;
pub mod handshake;
pub mod store;
pub mod tracker;
pub mod uploader;

pub use backupper::{
    BackupCreateStatusResponse, Backupper, CanCommitResponse, CreateMeta, Method, Outcome, Request,
};
pub use config::{BackupConfig, load_config};
pub use error::{BackupError, HandshakeError, StoreError};
pub use handshake::Coordinator;
pub use store::{BackendProvider, BackendRegistry, ObjectStore};
pub use uploader::{InMemorySourcer, ShardSource, Sourcer};
