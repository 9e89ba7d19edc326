//! Background autosave worker.
//!
//! # Responsibility
//! - Move snapshot persistence off the caller's thread.
//! - Apply save requests strictly in the order they were enqueued.
//! - Report save failures without propagating them to mutation callers.
//!
//! # Invariants
//! - Exactly one consumer thread drains the queue; writes never overlap.
//! - Requests carry owned snapshots captured at enqueue time.
//! - No request is coalesced or dropped; shutdown drains the queue first.

use crate::repo::snapshot_repo::{PersistResult, PersistenceError, TaskPersistence, TaskSnapshot};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

const WORKER_THREAD_NAME: &str = "taskheat-autosave";

enum SaveRequest {
    Save {
        snapshot: TaskSnapshot,
        reply: Option<Sender<PersistResult<()>>>,
    },
    Flush(Sender<()>),
}

/// Autosave request could not be served.
#[derive(Debug)]
pub enum AutosaveError {
    /// Worker thread is gone (shut down or panicked).
    Stopped,
    /// Synchronous save reached storage and failed.
    Persistence(PersistenceError),
}

impl Display for AutosaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "autosave worker is not running"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AutosaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stopped => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<PersistenceError> for AutosaveError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Point-in-time counters of worker activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveStatus {
    pub completed: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct SharedStatus {
    completed: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SharedStatus {
    fn record(&self, result: &PersistResult<()>) {
        match result {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                let mut last_error = self
                    .last_error
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *last_error = Some(err.to_string());
            }
        }
    }

    fn snapshot(&self) -> AutosaveStatus {
        let last_error = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        AutosaveStatus {
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            last_error,
        }
    }
}

/// Handle to the single autosave consumer thread.
pub struct AutosaveWorker {
    sender: Option<Sender<SaveRequest>>,
    handle: Option<JoinHandle<()>>,
    status: Arc<SharedStatus>,
}

impl AutosaveWorker {
    /// Starts the worker thread with a queue bounded at `capacity` requests.
    ///
    /// A `capacity` of zero is raised to one so enqueueing is never a
    /// rendezvous with the worker.
    pub fn spawn<P>(persistence: P, capacity: usize) -> io::Result<Self>
    where
        P: TaskPersistence + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        let status = Arc::new(SharedStatus::default());
        let worker_status = Arc::clone(&status);

        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || run_worker(persistence, receiver, worker_status))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            status,
        })
    }

    /// Queues `snapshot` for saving and returns without waiting for I/O.
    ///
    /// Blocks only while the queue is full.
    pub fn enqueue(&self, snapshot: TaskSnapshot) -> Result<(), AutosaveError> {
        self.send(SaveRequest::Save {
            snapshot,
            reply: None,
        })
    }

    /// Queues `snapshot` behind every pending request and waits for its result.
    pub fn save_and_wait(&self, snapshot: TaskSnapshot) -> Result<(), AutosaveError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(SaveRequest::Save {
            snapshot,
            reply: Some(reply_tx),
        })?;
        let result = reply_rx.recv().map_err(|_| AutosaveError::Stopped)?;
        result.map_err(AutosaveError::from)
    }

    /// Waits until every request enqueued so far has been applied.
    pub fn flush(&self) -> Result<(), AutosaveError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(SaveRequest::Flush(ack_tx))?;
        ack_rx.recv().map_err(|_| AutosaveError::Stopped)
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.snapshot()
    }

    /// Closes the queue, lets the worker drain it, and joins the thread.
    ///
    /// Idempotent; later requests fail with `AutosaveError::Stopped`.
    pub fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=autosave_shutdown module=autosave status=error error=worker_panicked");
            }
        }
    }

    fn send(&self, request: SaveRequest) -> Result<(), AutosaveError> {
        let sender = self.sender.as_ref().ok_or(AutosaveError::Stopped)?;
        sender.send(request).map_err(|_| AutosaveError::Stopped)
    }
}

impl Drop for AutosaveWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<P: TaskPersistence>(
    persistence: P,
    receiver: Receiver<SaveRequest>,
    status: Arc<SharedStatus>,
) {
    info!("event=autosave_worker module=autosave status=start");

    // `iter` ends only once every sender is dropped and the queue is empty.
    for request in receiver.iter() {
        match request {
            SaveRequest::Save { snapshot, reply } => {
                let started_at = Instant::now();
                let result = persistence.save(&snapshot);
                status.record(&result);
                match &result {
                    Ok(()) => info!(
                        "event=autosave_write module=autosave status=ok tasks={} duration_ms={} backlog={}",
                        snapshot.tasks.len(),
                        started_at.elapsed().as_millis(),
                        receiver.len()
                    ),
                    Err(err) => warn!(
                        "event=autosave_write module=autosave status=error tasks={} duration_ms={} error={}",
                        snapshot.tasks.len(),
                        started_at.elapsed().as_millis(),
                        err
                    ),
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            SaveRequest::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    info!("event=autosave_worker module=autosave status=stopped");
}
