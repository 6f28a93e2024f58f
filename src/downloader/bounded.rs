//! Bounded parallel executor
//!
//! Runs an async action over a set of items with at most `max_concurrency`
//! actions in flight. Workers pull from one shared cursor, so a slow item only
//! holds up the worker running it. A failing action never pre-empts its
//! siblings; the first error is kept and reported once everything settles.

use crate::shutdown::ShutdownCoordinator;
use futures_util::future::join_all;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Concurrency used when none is configured: the number of available cores
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Outcome of a run in which every action succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedSummary {
    /// Number of actions that completed
    pub completed: usize,
}

/// Why a bounded run did not complete cleanly
#[derive(Debug, thiserror::Error)]
pub enum BoundedError<E> {
    /// Cancellation was requested; remaining items were not started
    #[error("cancelled after {completed} completed actions")]
    Cancelled {
        /// Actions that finished successfully before workers stopped
        completed: usize,
    },

    /// At least one action failed; all other items were still attempted
    #[error("{failed} actions failed, first error: {first}")]
    Failed {
        /// First error observed
        first: E,
        /// Number of failed actions
        failed: usize,
        /// Number of successful actions
        completed: usize,
    },
}

struct RunState<I, E> {
    cursor: Mutex<I>,
    first_error: Mutex<Option<E>>,
    failed: AtomicUsize,
    completed: AtomicUsize,
}

impl<I: Iterator, E> RunState<I, E> {
    fn next_item(&self) -> Option<I::Item> {
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }

    fn record_failure(&self, error: E) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}

/// Apply `action` to every item with at most `max_concurrency` in flight.
///
/// A limit of 0 is treated as 1. Each item is handed to `action` at most once,
/// and exactly once unless `cancel` fires. Workers check `cancel` before
/// pulling each item; in-flight actions are expected to watch it themselves
/// (capture it in the closure). Work already completed is never rolled back.
///
/// # Errors
/// - [`BoundedError::Cancelled`] whenever cancellation was requested, even if
///   every item happened to finish
/// - [`BoundedError::Failed`] carrying the first error when any action failed
pub async fn run_bounded<T, E, F, Fut>(
    items: impl IntoIterator<Item = T>,
    max_concurrency: usize,
    cancel: &ShutdownCoordinator,
    action: F,
) -> Result<BoundedSummary, BoundedError<E>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let limit = max_concurrency.max(1);
    let state = RunState {
        cursor: Mutex::new(items.into_iter()),
        first_error: Mutex::new(None),
        failed: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    };

    join_all((0..limit).map(|worker_id| worker(worker_id, &state, cancel, &action))).await;

    let completed = state.completed.load(Ordering::SeqCst);
    if cancel.is_shutdown_requested() {
        return Err(BoundedError::Cancelled { completed });
    }

    let first = state
        .first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    match first {
        Some(first) => Err(BoundedError::Failed {
            first,
            failed: state.failed.load(Ordering::SeqCst),
            completed,
        }),
        None => Ok(BoundedSummary { completed }),
    }
}

async fn worker<I, T, E, F, Fut>(
    worker_id: usize,
    state: &RunState<I, E>,
    cancel: &ShutdownCoordinator,
    action: &F,
) where
    I: Iterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut handled = 0usize;
    loop {
        if cancel.is_shutdown_requested() {
            debug!(worker_id, handled, "Worker stopping on cancellation");
            break;
        }

        let Some(item) = state.next_item() else {
            break;
        };

        match action(item).await {
            Ok(()) => {
                state.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => state.record_failure(e),
        }
        handled += 1;
    }
}
