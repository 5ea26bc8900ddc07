use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use common::{BACKUP_FILE, BackupDescriptor, Status};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::BackupConfig;
use crate::error::BackupError;
use crate::handshake::{Coordinator, Handshake};
use crate::store::{BackendProvider, ObjectStore};
use crate::tracker::{OperationRecord, Tracker};
use crate::uploader::{Sourcer, StatusSetter, Uploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub id: String,
    pub classes: Vec<String>,
    /// Requested handshake timeout, zero means the configured default.
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanCommitResponse {
    pub method: Method,
    pub id: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMeta {
    pub path: String,
    pub status: Status,
}

/// Status of a backup, whether it is still running or already persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupCreateStatusResponse {
    pub id: String,
    pub path: String,
    pub status: Status,
    pub backend: String,
}

/// Terminal result of an admitted backup, published after its slot has
/// been released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub id: String,
    pub status: Status,
    pub error: Option<String>,
}

struct Shared {
    config: BackupConfig,
    sourcer: Arc<dyn Sourcer>,
    tracker: Tracker,
    handshake: Handshake,
    last_async_error: Mutex<Option<String>>,
    outcome_tx: watch::Sender<Option<Outcome>>,
}

/// Entry point for creating backups and querying their status.
///
/// At most one backup runs at a time. `backup` only decides admission and
/// returns; the transfer runs on a detached task that first waits for the
/// coordinator to commit.
pub struct Backupper {
    shared: Arc<Shared>,
    backends: Arc<dyn BackendProvider>,
    coordinator: Coordinator,
}

impl Backupper {
    pub fn new(
        config: BackupConfig,
        sourcer: Arc<dyn Sourcer>,
        backends: Arc<dyn BackendProvider>,
    ) -> Self {
        let (handshake, coordinator) = Handshake::channel(config.coordination_capacity);
        let (outcome_tx, _) = watch::channel(None);
        Backupper {
            shared: Arc::new(Shared {
                config,
                sourcer,
                tracker: Tracker::new(),
                handshake,
                last_async_error: Mutex::new(None),
                outcome_tx,
            }),
            backends,
            coordinator,
        }
    }

    /// Handle used by the coordinator to commit or abort a waiting backup.
    pub fn coordinator(&self) -> Coordinator {
        self.coordinator.clone()
    }

    /// Completion hook: holds the latest [`Outcome`].
    pub fn subscribe(&self) -> watch::Receiver<Option<Outcome>> {
        self.shared.outcome_tx.subscribe()
    }

    pub fn last_async_error(&self) -> Option<String> {
        self.shared.last_async_error()
    }

    pub fn active(&self) -> OperationRecord {
        self.shared.tracker.get()
    }

    pub fn is_waiting_for_coordinator(&self) -> bool {
        self.shared.handshake.is_waiting()
    }

    pub async fn backup(
        &self,
        store: Arc<dyn ObjectStore>,
        id: &str,
        classes: Vec<String>,
    ) -> Result<CreateMeta, BackupError> {
        let req = Request {
            method: Method::Create,
            id: id.to_owned(),
            classes,
            duration: self.shared.config.commit_timeout(),
        };
        if let Err(e) = self.create_backup(store.clone(), req) {
            return Err(match e {
                BackupError::Unprocessable(msg) => BackupError::Unprocessable(msg),
                other => BackupError::Unprocessable(other.to_string()),
            });
        }

        Ok(CreateMeta {
            path: store.home_dir(id),
            status: Status::Started,
        })
    }

    /// Returns the live status if `id` is the running backup, otherwise the
    /// status persisted by `backend`.
    pub async fn status(
        &self,
        backend: &str,
        id: &str,
    ) -> Result<BackupCreateStatusResponse, BackupError> {
        let st = self.shared.tracker.get();
        if st.is_active() && st.id == id {
            return Ok(BackupCreateStatusResponse {
                id: id.to_owned(),
                path: st.path,
                status: st.status,
                backend: backend.to_owned(),
            });
        }

        let store = self.backends.backup_backend(backend).map_err(|_| {
            BackupError::Unprocessable(format!(
                "no backup provider {backend:?}, did you enable the right module?"
            ))
        })?;

        let meta = store.get_meta(id).await.map_err(|e| {
            BackupError::NotFound(format!("backup status: get metafile {id}/{BACKUP_FILE}: {e}"))
        })?;

        Ok(BackupCreateStatusResponse {
            id: id.to_owned(),
            path: store.home_dir(id),
            status: meta.status,
            backend: backend.to_owned(),
        })
    }

    /// Admits `req` and spawns its worker on the current tokio runtime.
    ///
    /// Returns as soon as the slot is taken; the handshake and the transfer
    /// happen in the background. Called outside a runtime, the request is
    /// rejected before the slot is touched.
    pub fn create_backup(
        &self,
        store: Arc<dyn ObjectStore>,
        req: Request,
    ) -> Result<CanCommitResponse, BackupError> {
        if req.id.is_empty() {
            return Err(BackupError::Unprocessable("empty backup id".to_owned()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| BackupError::Unprocessable(format!("cannot start backup worker: {e}")))?;
        let timeout = self.shared.config.clamp_timeout(req.duration);
        let ret = CanCommitResponse {
            method: req.method,
            id: req.id.clone(),
            timeout,
        };

        let prev_id = self
            .shared
            .tracker
            .renew(&req.id, Utc::now(), &store.home_dir(&req.id));
        if !prev_id.is_empty() {
            return Err(BackupError::InProgress(prev_id));
        }
        // cleared by Handshake::wait
        self.shared.handshake.begin();

        let shared = self.shared.clone();
        runtime.spawn(async move {
            let id = req.id.clone();
            let worker = tokio::spawn({
                let shared = shared.clone();
                async move { shared.execute(store, req, timeout).await }
            });
            // the slot is released even if the worker panicked
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = BackupError::Worker(if e.is_panic() {
                        "panicked".to_owned()
                    } else {
                        "was cancelled".to_owned()
                    });
                    error!(action = "create_backup", backup_id = %id, "{err}");
                    shared.record_error(&err);
                    shared.handshake.end();
                    Outcome {
                        id,
                        status: Status::Failed,
                        error: Some(err.to_string()),
                    }
                }
            };
            shared.tracker.reset();
            shared.outcome_tx.send_replace(Some(outcome));
        });

        Ok(ret)
    }
}

impl Shared {
    fn last_async_error(&self) -> Option<String> {
        self.last_async_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record_error(&self, err: &BackupError) {
        *self
            .last_async_error
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(err.to_string());
    }

    async fn execute(
        self: &Arc<Self>,
        store: Arc<dyn ObjectStore>,
        req: Request,
        timeout: Duration,
    ) -> Outcome {
        if let Err(e) = self.handshake.wait(&req.id, timeout).await {
            let err = BackupError::from(e);
            error!(action = "create_backup", backup_id = %req.id, "{err}");
            self.record_error(&err);
            return Outcome {
                id: req.id,
                status: Status::Failed,
                error: Some(err.to_string()),
            };
        }
        info!(action = "create_backup", backup_id = %req.id, "coordinator committed");

        let shared = self.clone();
        let set_status: StatusSetter = Arc::new(move |st: Status| shared.tracker.set(st));
        let uploader = Uploader::new(self.sourcer.clone(), store.clone(), &req.id, set_status);

        let mut result = BackupDescriptor::new(&req.id, Utc::now());
        result.classes.reserve(req.classes.len());
        match uploader.all(&req.classes, &mut result).await {
            Ok(()) => {
                result.status = Status::Success;
                result.completed_at = Some(Utc::now());
            }
            Err(err) => {
                error!(action = "create_backup", backup_id = %req.id, "{err}");
                self.record_error(&err);
                result.status = Status::Failed;
                result.error = Some(err.to_string());
            }
        }

        if let Err(e) = store.put_meta(&req.id, &result).await {
            let err = BackupError::from(e);
            warn!(action = "create_backup", backup_id = %req.id, "persist descriptor: {err}");
            self.record_error(&err);
            result.status = Status::Failed;
            result.completed_at = None;
            if result.error.is_none() {
                result.error = Some(err.to_string());
            }
        }

        self.tracker.set(result.status);
        info!(
            action = "create_backup",
            backup_id = %req.id,
            status = %result.status,
            bytes = result.total_bytes(),
            "backup finished"
        );
        Outcome {
            id: req.id,
            status: result.status,
            error: result.error,
        }
    }
}
