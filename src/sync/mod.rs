//! Persistence Sync
//!
//! Best-effort, fire-and-forget writes of sessions and parking-lot items to
//! a remote store:
//! - Only sessions with UUID ids are synced; others are skipped silently
//! - Dispatch never blocks: jobs go onto a channel and return immediately
//! - A single background worker executes jobs in FIFO order, so a create
//!   always reaches the store before the update for the same session
//! - Failures are logged and reported, never retried or rolled back
//! - At most [`REPORT_CAPACITY`] undrained reports are kept; later ones are
//!   discarded until the [`SyncWorker`] owner drains

mod memory;
mod records;
#[cfg(feature = "remote")]
mod rest;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::session::{is_persistable_id, ParkingLotItem, Session};

pub use memory::{MemoryStore, StoreCall};
pub use records::{ParkingLotRow, SessionPatch, SessionRow};
#[cfg(feature = "remote")]
pub use rest::RestStore;

/// Undrained job outcomes held by a [`SyncWorker`]
pub const REPORT_CAPACITY: usize = 256;

/// Remote persistent store boundary
///
/// Implementations should treat `create_session` as an upsert.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, row: &SessionRow) -> Result<()>;

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<()>;

    async fn create_parking_lot_items(&self, rows: &[ParkingLotRow]) -> Result<()>;
}

/// What happened to a dispatch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the background worker
    Queued,
    /// Session id is not a UUID; nothing attempted
    Skipped,
    /// No worker is attached (sync disabled or worker gone)
    Dropped,
}

/// Kind of write a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Create,
    Update,
    BulkCreate,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncKind::Create => write!(f, "create"),
            SyncKind::Update => write!(f, "update"),
            SyncKind::BulkCreate => write!(f, "bulk-create"),
        }
    }
}

/// Outcome of one executed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub session_id: String,
    /// `Err` carries the store's error message
    pub result: std::result::Result<(), String>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

enum SyncJob {
    Create(SessionRow),
    Update { id: String, patch: SessionPatch },
    BulkCreate { session_id: String, rows: Vec<ParkingLotRow> },
    Flush(oneshot::Sender<()>),
}

/// Handle used by the session core to dispatch writes
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct PersistenceSync {
    jobs: Option<mpsc::UnboundedSender<SyncJob>>,
    user_id: Option<String>,
}

impl fmt::Debug for PersistenceSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceSync")
            .field("enabled", &self.jobs.is_some())
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Default for PersistenceSync {
    fn default() -> Self {
        Self::disabled()
    }
}

impl PersistenceSync {
    /// Start a background worker writing to `store`
    ///
    /// Must be called within a tokio runtime. The worker stops once every
    /// clone of the returned handle has been dropped.
    pub fn spawn(store: Arc<dyn SessionStore>, user_id: Option<String>) -> (Self, SyncWorker) {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::channel(REPORT_CAPACITY);
        let handle = tokio::spawn(run_worker(store, job_rx, report_tx));

        (
            Self {
                jobs: Some(job_tx),
                user_id,
            },
            SyncWorker {
                handle,
                reports: report_rx,
            },
        )
    }

    /// A handle with no worker; every write is dropped
    pub fn disabled() -> Self {
        Self {
            jobs: None,
            user_id: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.jobs.is_some()
    }

    /// Dispatch an upsert of a newly started session
    pub fn create(&self, session: &Session) -> Dispatch {
        if !is_persistable_id(&session.id) {
            return skip(SyncKind::Create, &session.id);
        }
        let row = SessionRow::from_session(session, self.user_id.as_deref());
        self.send(SyncKind::Create, &session.id, SyncJob::Create(row))
    }

    /// Dispatch a partial update of an existing session
    pub fn update(&self, session_id: &str, patch: SessionPatch) -> Dispatch {
        if !is_persistable_id(session_id) {
            return skip(SyncKind::Update, session_id);
        }
        let job = SyncJob::Update {
            id: session_id.to_string(),
            patch,
        };
        self.send(SyncKind::Update, session_id, job)
    }

    /// Dispatch a bulk insert of parking-lot items owned by `session_id`
    pub fn bulk_create(&self, items: &[ParkingLotItem], session_id: &str) -> Dispatch {
        if !is_persistable_id(session_id) {
            return skip(SyncKind::BulkCreate, session_id);
        }
        let rows = items
            .iter()
            .map(|item| ParkingLotRow::from_item(item, session_id))
            .collect();
        let job = SyncJob::BulkCreate {
            session_id: session_id.to_string(),
            rows,
        };
        self.send(SyncKind::BulkCreate, session_id, job)
    }

    /// Wait until every job queued before this call has executed
    ///
    /// Never called by the session core itself.
    pub async fn flush(&self) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if jobs.send(SyncJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    fn send(&self, kind: SyncKind, session_id: &str, job: SyncJob) -> Dispatch {
        let Some(jobs) = &self.jobs else {
            trace!("Sync disabled, dropping {} for {}", kind, session_id);
            return Dispatch::Dropped;
        };
        match jobs.send(job) {
            Ok(()) => {
                debug!("Queued {} for {}", kind, session_id);
                Dispatch::Queued
            }
            Err(_) => {
                warn!("Sync worker gone, dropping {} for {}", kind, session_id);
                Dispatch::Dropped
            }
        }
    }
}

fn skip(kind: SyncKind, session_id: &str) -> Dispatch {
    debug!("Session id {} is not a UUID, skipping {}", session_id, kind);
    Dispatch::Skipped
}

/// Background worker executing sync jobs
///
/// Outcomes are buffered up to [`REPORT_CAPACITY`]. Owners that care about
/// them should drain regularly; owners that don't can ignore this handle.
pub struct SyncWorker {
    handle: JoinHandle<()>,
    reports: mpsc::Receiver<SyncReport>,
}

impl SyncWorker {
    /// Next job outcome, or `None` once the worker has stopped
    pub async fn next_report(&mut self) -> Option<SyncReport> {
        self.reports.recv().await
    }

    /// Outcomes that have already arrived
    pub fn drain_reports(&mut self) -> Vec<SyncReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            reports.push(report);
        }
        reports
    }

    /// Wait for the worker to stop and collect its remaining reports
    ///
    /// Only returns after every `PersistenceSync` clone has been dropped.
    pub async fn join(mut self) -> Vec<SyncReport> {
        if let Err(err) = (&mut self.handle).await {
            warn!("Sync worker terminated abnormally: {}", err);
        }
        self.drain_reports()
    }
}

async fn run_worker(
    store: Arc<dyn SessionStore>,
    mut jobs: mpsc::UnboundedReceiver<SyncJob>,
    reports: mpsc::Sender<SyncReport>,
) {
    while let Some(job) = jobs.recv().await {
        let (kind, session_id, result) = match job {
            SyncJob::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            SyncJob::Create(row) => {
                let result = store.create_session(&row).await;
                (SyncKind::Create, row.id, result)
            }
            SyncJob::Update { id, patch } => {
                let result = store.update_session(&id, &patch).await;
                (SyncKind::Update, id, result)
            }
            SyncJob::BulkCreate { session_id, rows } => {
                let result = store.create_parking_lot_items(&rows).await;
                (SyncKind::BulkCreate, session_id, result)
            }
        };

        match &result {
            Ok(()) => debug!("Sync {} for {} done", kind, session_id),
            Err(err) => warn!(
                "Sync {} for {} failed [{}]: {}; local state kept",
                kind,
                session_id,
                err.error_code(),
                err
            ),
        }

        let report = SyncReport {
            kind,
            session_id,
            result: result.map_err(|e| e.to_string()),
        };
        // A closed receiver means nobody is listening
        if let Err(mpsc::error::TrySendError::Full(report)) = reports.try_send(report) {
            debug!(
                "Report buffer full, discarding {} outcome for {}",
                report.kind, report.session_id
            );
        }
    }
    debug!("Sync worker stopped");
}
