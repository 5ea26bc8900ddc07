//! Can-commit gate between an admitted backup and its execution.
//!
//! The coordinator side holds cloneable [`Coordinator`] handles that push
//! commit/abort signals into a small bounded channel. The worker side owns
//! the single receiver through [`Handshake`] and waits on it under one
//! deadline: whichever comes first, a matching signal or the deadline,
//! decides the outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time;
use tracing::debug;

use crate::error::HandshakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Commit,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub id: String,
    pub kind: SignalKind,
}

/// Sending half of the coordination channel.
#[derive(Debug, Clone)]
pub struct Coordinator {
    tx: mpsc::Sender<Signal>,
}

impl Coordinator {
    pub fn commit(&self, id: &str) -> Result<(), HandshakeError> {
        self.send(id, SignalKind::Commit)
    }

    pub fn abort(&self, id: &str) -> Result<(), HandshakeError> {
        self.send(id, SignalKind::Abort)
    }

    // Never blocks: a full channel is reported back to the signaller.
    fn send(&self, id: &str, kind: SignalKind) -> Result<(), HandshakeError> {
        self.tx
            .try_send(Signal {
                id: id.to_owned(),
                kind,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => HandshakeError::ChannelFull,
                mpsc::error::TrySendError::Closed(_) => HandshakeError::ChannelClosed,
            })
    }
}

#[derive(Debug)]
pub struct Handshake {
    rx: Mutex<mpsc::Receiver<Signal>>,
    waiting: AtomicBool,
}

impl Handshake {
    pub fn channel(capacity: usize) -> (Handshake, Coordinator) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handshake = Handshake {
            rx: Mutex::new(rx),
            waiting: AtomicBool::new(false),
        };
        (handshake, Coordinator { tx })
    }

    /// Marks that an admitted backup is waiting for the coordinator.
    ///
    /// Signals still queued from earlier attempts are discarded, so a late
    /// commit for a timed-out backup cannot release a retry with the same id.
    pub fn begin(&self) {
        // the previous worker has left `wait` before its slot was released
        if let Ok(mut rx) = self.rx.try_lock() {
            while let Ok(signal) = rx.try_recv() {
                debug!(
                    "discarding stale {:?} signal for backup {}",
                    signal.kind, signal.id
                );
            }
        }
        self.waiting.store(true, Ordering::SeqCst);
    }

    /// Clears the waiting flag when a worker ended without reaching `wait`'s
    /// own cleanup.
    pub(crate) fn end(&self) {
        self.waiting.store(false, Ordering::SeqCst);
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Waits for the coordinator to commit backup `id` within `timeout`.
    ///
    /// Signals addressed to other backups are dropped. A closed channel ends
    /// the wait as if no commit had arrived. The waiting flag is cleared on
    /// every return path.
    pub async fn wait(&self, id: &str, timeout: Duration) -> Result<(), HandshakeError> {
        // a single deadline for the whole wait; oversized timeouts saturate
        let received = time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            loop {
                match rx.recv().await {
                    None => return Err(HandshakeError::ChannelClosed),
                    Some(signal) if signal.id == id => {
                        return match signal.kind {
                            SignalKind::Commit => Ok(()),
                            SignalKind::Abort => Err(HandshakeError::Aborted(signal.id)),
                        };
                    }
                    Some(signal) => {
                        debug!(
                            backup_id = %id,
                            "dropping {:?} signal addressed to {}",
                            signal.kind, signal.id
                        );
                    }
                }
            }
        })
        .await;
        self.waiting.store(false, Ordering::SeqCst);

        match received {
            Ok(result) => result,
            Err(_) => Err(HandshakeError::Timeout(timeout)),
        }
    }
}
