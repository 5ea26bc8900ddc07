use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("coordinator did not commit within {0:?}")]
    Timeout(Duration),

    #[error("coordinator aborted backup {0}")]
    Aborted(String),

    #[error("coordination channel closed")]
    ChannelClosed,

    #[error("coordination channel is full")]
    ChannelFull,
}

#[derive(Error, Debug)]
pub enum BackupError {
    // Surfaced synchronously to the caller of backup/status
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backup {0} already in progress")]
    InProgress(String),

    // Raised inside the worker, recorded as the last async error
    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("source: {0}")]
    Source(String),

    #[error("backup worker {0}")]
    Worker(String),
}

impl BackupError {
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, BackupError::Unprocessable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackupError::NotFound(_))
    }
}
