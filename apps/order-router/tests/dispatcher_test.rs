//! Dispatch Lane Integration Tests
//!
//! Properties of the shared dispatch lane under concurrent submitters:
//! - Requests execute in submission order
//! - At most one operation runs at a time
//! - Consecutive operations are separated by the configured pause
//! - A full queue makes submitters wait
//! - Shutdown finishes the running call and refuses the rest

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use order_router::application::services::DispatcherStats;
use order_router::{DispatchError, DispatcherSettings, OrderDispatcher, VenueError};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

fn settings(pause_ms: u64, capacity: usize) -> DispatcherSettings {
    DispatcherSettings {
        pause: Duration::from_millis(pause_ms),
        capacity,
        operation_timeout: Duration::from_secs(5),
    }
}

/// Poll the dispatcher until `done` holds or two seconds pass.
async fn wait_for(dispatcher: &OrderDispatcher, done: impl Fn(&DispatcherStats) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !done(&dispatcher.stats()) {
        assert!(Instant::now() < deadline, "timed out: {:?}", dispatcher.stats());
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

// ============================================
// Ordering
// ============================================

#[tokio::test]
async fn executes_in_submission_order() {
    let dispatcher = OrderDispatcher::start(settings(5, 16)).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..8_u64 {
        let d = dispatcher.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            d.dispatch(move || async move {
                order.lock().push(i);
                Ok::<_, VenueError>(i)
            })
            .await
        }));
        // Next submitter only starts once this one is queued.
        wait_for(&dispatcher, |s| s.enqueued > i).await;
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let value = assert_ok!(handle.await.unwrap());
        assert_eq!(value, i as u64);
    }
    assert_eq!(*order.lock(), (0..8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_runs_two_operations_at_once() {
    let dispatcher = OrderDispatcher::start(settings(0, 4)).unwrap();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let d = dispatcher.clone();
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            d.dispatch(move || async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, VenueError>(())
            })
            .await
        }));
    }

    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pause_separates_completion_from_next_start() {
    let dispatcher = OrderDispatcher::start(settings(40, 8)).unwrap();
    let spans = Arc::new(Mutex::new(Vec::<(Instant, Instant)>::new()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let d = dispatcher.clone();
        let spans = Arc::clone(&spans);
        handles.push(tokio::spawn(async move {
            d.dispatch(move || async move {
                let start = Instant::now();
                tokio::time::sleep(Duration::from_millis(5)).await;
                spans.lock().push((start, Instant::now()));
                Ok::<_, VenueError>(())
            })
            .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let spans = spans.lock();
    assert_eq!(spans.len(), 4);
    for pair in spans.windows(2) {
        let gap = pair[1].0.duration_since(pair[0].1);
        assert!(gap >= Duration::from_millis(40), "gap was {gap:?}");
    }
}

// ============================================
// Backpressure and shutdown
// ============================================

#[tokio::test]
async fn full_queue_makes_submitters_wait() {
    let dispatcher = OrderDispatcher::start(settings(0, 1)).unwrap();
    let gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());

    let first = {
        let d = dispatcher.clone();
        let gate = Arc::clone(&gate);
        let started = Arc::clone(&started);
        tokio::spawn(async move {
            d.dispatch(move || async move {
                started.notify_one();
                gate.notified().await;
                Ok::<_, VenueError>(1)
            })
            .await
        })
    };
    started.notified().await;

    let mut waiting = Vec::new();
    for i in 2..=5 {
        let d = dispatcher.clone();
        waiting.push(tokio::spawn(async move {
            d.dispatch(move || async move { Ok::<_, VenueError>(i) }).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // One running, one buffered; the other three are still waiting for space.
    let stats = dispatcher.stats();
    assert_eq!(stats.enqueued, 2);
    assert_eq!(stats.executed, 0);

    gate.notify_one();
    assert_eq!(assert_ok!(first.await.unwrap()), 1);
    for handle in waiting {
        assert_ok!(handle.await.unwrap());
    }
    wait_for(&dispatcher, |s| s.executed == 5).await;
    assert_eq!(dispatcher.stats().rejected, 0);
}

#[tokio::test]
async fn shutdown_finishes_running_call_and_refuses_queued() {
    let dispatcher = OrderDispatcher::start(settings(0, 8)).unwrap();
    let gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());
    let ran_queued = Arc::new(AtomicUsize::new(0));

    let running = {
        let d = dispatcher.clone();
        let gate = Arc::clone(&gate);
        let started = Arc::clone(&started);
        tokio::spawn(async move {
            d.dispatch(move || async move {
                started.notify_one();
                gate.notified().await;
                Ok::<_, VenueError>("done")
            })
            .await
        })
    };
    started.notified().await;

    let mut queued = Vec::new();
    for _ in 0..3 {
        let d = dispatcher.clone();
        let ran = Arc::clone(&ran_queued);
        queued.push(tokio::spawn(async move {
            d.dispatch(move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, VenueError>("late")
            })
            .await
        }));
    }
    wait_for(&dispatcher, |s| s.enqueued == 4).await;

    let stopping = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.shutdown().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();

    assert_eq!(assert_ok!(running.await.unwrap()), "done");
    for handle in queued {
        let err = assert_err!(handle.await.unwrap());
        assert_eq!(err, DispatchError::Closed);
    }
    stopping.await.unwrap();

    assert_eq!(ran_queued.load(Ordering::SeqCst), 0);
    let stats = dispatcher.stats();
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.rejected, 3);

    // Nothing gets in after shutdown.
    let err = dispatcher
        .dispatch(|| async { Ok::<_, VenueError>("after") })
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::Closed);
}
