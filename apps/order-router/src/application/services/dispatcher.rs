//! Order Dispatcher Service
//!
//! A single serialized, rate-limited execution lane for venue calls.
//!
//! Any number of tasks may submit operations concurrently. One loop task
//! owns the pending queue and the rate-limit clock, takes requests in FIFO
//! order, and runs exactly one of them at a time. After an operation
//! completes, the next one starts no earlier than `pause` later; the first
//! operation starts immediately.
//!
//! ```text
//!  submitters ──▶ bounded mpsc ──▶ loop ─┬─ wait until last_completed + pause
//!   (await reply)                        ├─ run operation (bounded by timeout)
//!        ▲                               └─ send result on the request's oneshot
//!        └──────────── oneshot ◀─────────┘
//! ```
//!
//! A full queue blocks submitters instead of dropping work. On close,
//! requests that are queued but not started fail with
//! [`DispatchError::Closed`]; the request already executing finishes.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::VenueError;
use crate::observability;

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Minimum time between one completion and the next start.
    pub pause: Duration,
    /// Maximum number of queued, not yet started requests.
    pub capacity: usize,
    /// Upper bound on a single operation.
    pub operation_timeout: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(100),
            capacity: 64,
            operation_timeout: Duration::from_secs(10),
        }
    }
}

impl DispatcherSettings {
    /// Check the settings can back a running dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSettings`] for a zero capacity or a
    /// zero timeout.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.capacity == 0 {
            return Err(DispatchError::InvalidSettings {
                message: "queue capacity must be greater than zero".to_string(),
            });
        }
        if self.operation_timeout.is_zero() {
            return Err(DispatchError::InvalidSettings {
                message: "operation timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Dispatch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The venue call itself failed.
    #[error(transparent)]
    Venue(#[from] VenueError),

    /// The venue call did not finish in time.
    #[error("venue call timed out after {}ms", .after.as_millis())]
    TimedOut {
        /// Configured timeout.
        after: Duration,
    },

    /// The dispatcher closed before the request started.
    #[error("dispatcher closed")]
    Closed,

    /// Settings rejected at construction.
    #[error("invalid dispatcher settings: {message}")]
    InvalidSettings {
        /// Error details.
        message: String,
    },
}

impl DispatchError {
    /// The venue error, if the call reached the venue and failed there.
    #[must_use]
    pub const fn venue_error(&self) -> Option<&VenueError> {
        match self {
            Self::Venue(e) => Some(e),
            _ => None,
        }
    }
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    /// Requests accepted into the queue.
    pub enqueued: u64,
    /// Requests queued and not yet taken by the loop.
    pub pending: u64,
    /// Operations run to completion, whatever their result.
    pub executed: u64,
    /// Operations that returned `Ok`.
    pub succeeded: u64,
    /// Operations that returned a venue error.
    pub failed: u64,
    /// Operations cut off by the timeout.
    pub timed_out: u64,
    /// Requests refused with `Closed`.
    pub rejected: u64,
    /// Requests skipped because the submitter went away.
    pub abandoned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    executed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    rejected: AtomicU64,
    abandoned: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        let enqueued = self.enqueued.load(Ordering::SeqCst);
        let dequeued = self.dequeued.load(Ordering::SeqCst);
        DispatcherStats {
            enqueued,
            pending: enqueued.saturating_sub(dequeued),
            executed: self.executed.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            abandoned: self.abandoned.load(Ordering::SeqCst),
        }
    }

    fn pending(&self) -> u64 {
        self.enqueued
            .load(Ordering::SeqCst)
            .saturating_sub(self.dequeued.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl JobOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Type-erased queued request.
trait Job: Send {
    /// Run the operation and deliver its result to the submitter.
    fn execute(self: Box<Self>, timeout: Duration) -> BoxFuture<'static, JobOutcome>;

    /// Deliver an error without running the operation.
    fn reject(self: Box<Self>, error: DispatchError);

    /// The submitter stopped waiting for the result.
    fn is_abandoned(&self) -> bool;
}

type Operation<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, VenueError>> + Send>;

/// One submitted operation plus the slot for its result.
struct DispatchRequest<T> {
    operation: Operation<T>,
    reply: oneshot::Sender<Result<T, DispatchError>>,
}

impl<T: Send + 'static> Job for DispatchRequest<T> {
    fn execute(self: Box<Self>, timeout: Duration) -> BoxFuture<'static, JobOutcome> {
        let Self { operation, reply } = *self;
        Box::pin(async move {
            let result = match tokio::time::timeout(timeout, operation()).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(DispatchError::Venue(e)),
                Err(_) => Err(DispatchError::TimedOut { after: timeout }),
            };
            let outcome = match &result {
                Ok(_) => JobOutcome::Succeeded,
                Err(DispatchError::TimedOut { .. }) => JobOutcome::TimedOut,
                Err(_) => JobOutcome::Failed,
            };
            // Submitter may have given up while the call ran.
            let _ = reply.send(result);
            outcome
        })
    }

    fn reject(self: Box<Self>, error: DispatchError) {
        let _ = self.reply.send(Err(error));
    }

    fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}

struct Shared {
    settings: DispatcherSettings,
    counters: Counters,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the dispatch lane. Cheap to clone; all clones feed the same loop.
#[derive(Clone)]
pub struct OrderDispatcher {
    tx: mpsc::Sender<Box<dyn Job>>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OrderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderDispatcher")
            .field("settings", &self.shared.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl OrderDispatcher {
    /// Validate `settings` and spawn the execution loop.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSettings`] if the settings are unusable.
    pub fn start(settings: DispatcherSettings) -> Result<Self, DispatchError> {
        settings.validate()?;

        let (tx, rx) = mpsc::channel::<Box<dyn Job>>(settings.capacity);
        let shared = Arc::new(Shared {
            settings,
            counters: Counters::default(),
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        });

        let handle = tokio::spawn(run_loop(rx, Arc::clone(&shared)));
        *shared.worker.lock() = Some(handle);

        tracing::info!(
            pause_ms = settings.pause.as_millis() as u64,
            capacity = settings.capacity,
            timeout_ms = settings.operation_timeout.as_millis() as u64,
            "Order dispatcher started"
        );

        Ok(Self { tx, shared })
    }

    /// Queue `operation` and wait for its result.
    ///
    /// Waits for queue space when the queue is full. The operation is not
    /// invoked until its turn in the lane.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, [`DispatchError::TimedOut`], or
    /// [`DispatchError::Closed`] if the dispatcher closed before the
    /// operation started.
    pub async fn dispatch<T, F, Fut>(&self, operation: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, VenueError>> + Send + 'static,
    {
        if self.shared.shutdown.is_cancelled() {
            return Err(self.refuse());
        }

        let (reply, result) = oneshot::channel();
        let request: Box<dyn Job> = Box::new(DispatchRequest {
            operation: Box::new(move || -> BoxFuture<'static, Result<T, VenueError>> {
                Box::pin(operation())
            }),
            reply,
        });

        if self.tx.send(request).await.is_err() {
            return Err(self.refuse());
        }
        let enqueued = self.shared.counters.enqueued.fetch_add(1, Ordering::SeqCst) + 1;
        observability::set_dispatch_queue_depth(
            enqueued.saturating_sub(self.shared.counters.dequeued.load(Ordering::SeqCst)),
        );

        // A dropped sender means the loop discarded the request.
        result.await.map_err(|_| DispatchError::Closed)?
    }

    fn refuse(&self) -> DispatchError {
        self.shared.counters.rejected.fetch_add(1, Ordering::SeqCst);
        observability::record_dispatch_rejected(1);
        DispatchError::Closed
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.shared.counters.snapshot()
    }

    /// Requests queued and not yet taken by the loop.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.shared.counters.pending()
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &DispatcherSettings {
        &self.shared.settings
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Stop accepting work and fail every request not yet started.
    pub fn close(&self) {
        self.shared.shutdown.cancel();
    }

    /// Close and wait for the loop to exit, including the call in flight.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Dispatcher loop terminated abnormally");
        }
    }
}

async fn run_loop(mut rx: mpsc::Receiver<Box<dyn Job>>, shared: Arc<Shared>) {
    let settings = shared.settings;
    let counters = &shared.counters;
    let shutdown = &shared.shutdown;
    let mut last_completed: Option<Instant> = None;
    let mut seq: u64 = 0;

    loop {
        let job = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job,
                // Every handle dropped.
                None => break,
            },
        };
        counters.dequeued.fetch_add(1, Ordering::SeqCst);
        observability::set_dispatch_queue_depth(counters.pending());

        if let Some(last) = last_completed {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    job.reject(DispatchError::Closed);
                    counters.rejected.fetch_add(1, Ordering::SeqCst);
                    observability::record_dispatch_rejected(1);
                    break;
                }
                () = tokio::time::sleep_until(last + settings.pause) => {}
            }
        }

        if job.is_abandoned() {
            counters.abandoned.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Skipping dispatch request abandoned by its submitter");
            continue;
        }

        seq += 1;
        let started = Instant::now();
        tracing::debug!(dispatch_seq = seq, "Dispatch started");
        let outcome = job.execute(settings.operation_timeout).await;
        let completed = Instant::now();
        last_completed = Some(completed);

        counters.executed.fetch_add(1, Ordering::SeqCst);
        match outcome {
            JobOutcome::Succeeded => counters.succeeded.fetch_add(1, Ordering::SeqCst),
            JobOutcome::Failed => counters.failed.fetch_add(1, Ordering::SeqCst),
            JobOutcome::TimedOut => counters.timed_out.fetch_add(1, Ordering::SeqCst),
        };
        let elapsed = completed.duration_since(started);
        observability::record_dispatch(outcome.as_str(), elapsed.as_secs_f64());
        tracing::debug!(
            dispatch_seq = seq,
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Dispatch completed"
        );
    }

    rx.close();
    let mut drained = 0_u64;
    while let Ok(job) = rx.try_recv() {
        counters.dequeued.fetch_add(1, Ordering::SeqCst);
        job.reject(DispatchError::Closed);
        drained += 1;
    }
    if drained > 0 {
        counters.rejected.fetch_add(drained, Ordering::SeqCst);
        observability::record_dispatch_rejected(drained);
    }
    observability::set_dispatch_queue_depth(0);

    tracing::info!(
        executed = counters.executed.load(Ordering::SeqCst),
        rejected = counters.rejected.load(Ordering::SeqCst),
        "Order dispatcher stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pause_ms: u64, capacity: usize) -> DispatcherSettings {
        DispatcherSettings {
            pause: Duration::from_millis(pause_ms),
            capacity,
            operation_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = settings(10, 0).validate().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidSettings { .. }));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let mut s = settings(10, 1);
        s.operation_timeout = Duration::ZERO;
        assert!(s.validate().is_err());
    }

    #[tokio::test]
    async fn start_rejects_invalid_settings() {
        assert!(OrderDispatcher::start(settings(10, 0)).is_err());
    }

    #[tokio::test]
    async fn returns_operation_result() {
        let dispatcher = OrderDispatcher::start(settings(0, 4)).unwrap();
        let value = dispatcher.dispatch(|| async { Ok::<_, VenueError>(42) }).await;
        assert_eq!(value, Ok(42));

        let err = dispatcher
            .dispatch(|| async { Err::<(), _>(VenueError::RateLimited) })
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Venue(VenueError::RateLimited));

        let stats = dispatcher.stats();
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn first_dispatch_does_not_wait() {
        let dispatcher = OrderDispatcher::start(settings(500, 4)).unwrap();
        let begin = Instant::now();
        dispatcher.dispatch(|| async { Ok::<_, VenueError>(()) }).await.unwrap();
        assert!(begin.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn consecutive_dispatches_are_paced() {
        let dispatcher = OrderDispatcher::start(settings(50, 4)).unwrap();
        dispatcher.dispatch(|| async { Ok::<_, VenueError>(()) }).await.unwrap();
        let first_done = Instant::now();
        let started = dispatcher
            .dispatch(|| async { Ok::<_, VenueError>(Instant::now()) })
            .await
            .unwrap();
        assert!(started.duration_since(first_done) >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn slow_operation_times_out() {
        let dispatcher = OrderDispatcher::start(DispatcherSettings {
            pause: Duration::ZERO,
            capacity: 4,
            operation_timeout: Duration::from_millis(20),
        })
        .unwrap();

        let err = dispatcher
            .dispatch(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, VenueError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TimedOut { .. }));

        // The lane keeps going afterwards.
        assert_eq!(dispatcher.dispatch(|| async { Ok::<_, VenueError>(1) }).await, Ok(1));
        assert_eq!(dispatcher.stats().timed_out, 1);
    }

    #[tokio::test]
    async fn closed_dispatcher_refuses_work() {
        let dispatcher = OrderDispatcher::start(settings(0, 4)).unwrap();
        dispatcher.shutdown().await;
        assert!(dispatcher.is_closed());
        let err = dispatcher
            .dispatch(|| async { Ok::<_, VenueError>(()) })
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Closed);
    }

    #[tokio::test]
    async fn operation_is_lazy_until_its_turn() {
        use std::sync::atomic::AtomicBool;

        let dispatcher = OrderDispatcher::start(settings(0, 4)).unwrap();
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);
        let (release, gate) = oneshot::channel::<()>();

        let blocker = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch(move || async move {
                        let _ = gate.await;
                        Ok::<_, VenueError>(())
                    })
                    .await
            })
        };
        while dispatcher.stats().enqueued < 1 {
            tokio::task::yield_now().await;
        }

        let second = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch(move || {
                        flag.store(true, Ordering::SeqCst);
                        async { Ok::<_, VenueError>(()) }
                    })
                    .await
            })
        };
        while dispatcher.stats().enqueued < 2 {
            tokio::task::yield_now().await;
        }
        assert!(!invoked.load(Ordering::SeqCst));

        release.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert!(invoked.load(Ordering::SeqCst));
    }
}
