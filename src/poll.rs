//! Periodic daemon polling
//!
//! A [`PollHandle`] owns one background fetch loop and the latest value it
//! produced. Readers get cheap clones of the snapshot; the loop stops when
//! the handle is stopped or dropped.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::DaemonApi;
use crate::constants::MIN_POLL_PERIOD_MS;
use crate::protocol::{PtpStatus, RemoteSource};

/// A fetched value and when it was fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

/// Read side of a poller, shareable across tasks
#[derive(Debug)]
pub struct SnapshotReader<T> {
    cell: Arc<RwLock<Option<Snapshot<T>>>>,
}

impl<T> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone> SnapshotReader<T> {
    /// Latest successful fetch, `None` until the first one lands
    pub fn latest(&self) -> Option<Snapshot<T>> {
        self.cell.read().clone()
    }
}

/// Handle to a running poll loop
#[derive(Debug)]
pub struct PollHandle<T> {
    name: &'static str,
    reader: SnapshotReader<T>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T> PollHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling `fetch` every `period`, first fetch immediately.
    ///
    /// Must be called from within a tokio runtime. Periods shorter than
    /// [`MIN_POLL_PERIOD_MS`] are raised to it.
    pub fn spawn<F, Fut, E>(name: &'static str, period: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Display + Send,
    {
        let floor = Duration::from_millis(MIN_POLL_PERIOD_MS);
        if period < floor {
            warn!(
                poller = name,
                period_ms = period.as_millis() as u64,
                "Poll period raised to minimum"
            );
        }
        let period = period.max(floor);

        let cell = Arc::new(RwLock::new(None));
        let cancel = CancellationToken::new();

        let task_cell = cell.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            info!(poller = name, period_ms = period.as_millis() as u64, "Poller started");

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match fetch().await {
                            Ok(value) => {
                                *task_cell.write() = Some(Snapshot {
                                    value,
                                    fetched_at: Utc::now(),
                                });
                                debug!(poller = name, "Snapshot updated");
                            }
                            Err(e) => {
                                // previous snapshot stays in place
                                warn!(poller = name, error = %e, "Poll failed");
                            }
                        }
                    }
                    _ = task_cancel.cancelled() => break,
                }
            }

            info!(poller = name, "Poller stopped");
        });

        Self {
            name,
            reader: SnapshotReader { cell },
            cancel,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn latest(&self) -> Option<Snapshot<T>> {
        self.reader.latest()
    }

    pub fn reader(&self) -> SnapshotReader<T> {
        self.reader.clone()
    }

    /// Signal the loop to stop without waiting for it
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the loop and wait for it to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(poller = self.name, error = %e, "Poller task ended abnormally");
            }
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll the daemon's PTP status
pub fn poll_ptp_status<A>(api: Arc<A>, period: Duration) -> PollHandle<PtpStatus>
where
    A: DaemonApi + ?Sized + 'static,
{
    PollHandle::spawn("ptp_status", period, move || {
        let api = api.clone();
        async move { api.ptp_status().await }
    })
}

/// Poll the sources discovered on the network
pub fn poll_remote_sources<A>(api: Arc<A>, period: Duration) -> PollHandle<Vec<RemoteSource>>
where
    A: DaemonApi + ?Sized + 'static,
{
    PollHandle::spawn("remote_sources", period, move || {
        let api = api.clone();
        async move { api.remote_sources().await }
    })
}
