//! Single-flight refresh queue.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::client::error::AuthFailure;

/// Default bound on one refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

type Outcome = Result<(), AuthFailure>;

#[derive(Default)]
struct QueueState {
    refreshing: bool,
    /// Bumped by every successful refresh.
    generation: u64,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

/// Result of [`RefreshCoordinator::enqueue`].
#[derive(Debug)]
pub enum Enqueued {
    /// No refresh was in flight: the caller performs it and must settle the
    /// queue with [`RefreshCoordinator::resolve_all`] or
    /// [`RefreshCoordinator::reject_all`].
    Leader,
    /// A refresh is in flight; the receiver yields its outcome.
    Waiting(oneshot::Receiver<Outcome>),
    /// A refresh succeeded after the caller's generation was read: its
    /// request went out with the old token and only needs replaying.
    Refreshed,
}

/// Collapses concurrent refresh attempts into one call and fans its outcome
/// out to every caller. The lock is never held across an `.await`.
pub struct RefreshCoordinator {
    state: Mutex<QueueState>,
    timeout: Duration,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_TIMEOUT)
    }
}

impl RefreshCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            timeout,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers parked behind the in-flight refresh.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Count of successful refreshes so far. Read it before sending a
    /// request and hand it to [`Self::run_since`] if that request fails.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn enqueue(&self) -> Enqueued {
        self.enqueue_since(None)
    }

    fn enqueue_since(&self, seen: Option<u64>) -> Enqueued {
        let mut state = self.state.lock();
        if seen.is_some_and(|seen| seen != state.generation) {
            Enqueued::Refreshed
        } else if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Enqueued::Waiting(rx)
        } else {
            state.refreshing = true;
            Enqueued::Leader
        }
    }

    /// Ends the in-flight refresh successfully and wakes every waiter.
    pub fn resolve_all(&self) {
        self.settle(Ok(()));
    }

    /// Ends the in-flight refresh with `failure` and wakes every waiter.
    pub fn reject_all(&self, failure: AuthFailure) {
        self.settle(Err(failure));
    }

    fn settle(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            if outcome.is_ok() {
                state.generation = state.generation.wrapping_add(1);
            }
            std::mem::take(&mut state.waiters)
        };
        tracing::debug!(waiters = waiters.len(), ok = outcome.is_ok(), "refresh settled");
        for waiter in waiters {
            // Receiver gone means that caller was cancelled.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Runs `refresh` unless one is already in flight, in which case waits
    /// for that one. Every caller gets the same outcome.
    pub async fn run<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        self.run_from(None, refresh).await
    }

    /// Like [`Self::run`] for a request sent at generation `seen`: when a
    /// refresh has succeeded since, returns at once without refreshing.
    pub async fn run_since<F, Fut>(&self, seen: u64, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        self.run_from(Some(seen), refresh).await
    }

    async fn run_from<F, Fut>(&self, seen: Option<u64>, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        match self.enqueue_since(seen) {
            Enqueued::Refreshed => Ok(()),
            Enqueued::Waiting(rx) => rx.await.unwrap_or(Err(AuthFailure::Abandoned)),
            Enqueued::Leader => {
                let guard = LeaderGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = tokio::time::timeout(self.timeout, refresh())
                    .await
                    .unwrap_or(Err(AuthFailure::Timeout));
                guard.settle(outcome.clone());
                outcome
            }
        }
    }
}

/// Rejects the queue if the leader's future is dropped before settling.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.reject_all(AuthFailure::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[test]
    fn first_enqueue_leads_then_others_wait() {
        let coordinator = RefreshCoordinator::default();

        assert!(matches!(coordinator.enqueue(), Enqueued::Leader));
        assert!(coordinator.is_refreshing());
        assert!(matches!(coordinator.enqueue(), Enqueued::Waiting(_)));

        coordinator.resolve_all();
        assert!(!coordinator.is_refreshing());
        assert!(matches!(coordinator.enqueue(), Enqueued::Leader));
    }

    #[tokio::test]
    async fn reject_all_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::default();
        let _leader = coordinator.enqueue();
        let waiters: Vec<_> = (0..3)
            .map(|_| match coordinator.enqueue() {
                Enqueued::Waiting(rx) => rx,
                other => panic!("refresh already in flight, got {other:?}"),
            })
            .collect();

        coordinator.reject_all(AuthFailure::SessionExpired);

        for rx in waiters {
            assert_eq!(rx.await.unwrap(), Err(AuthFailure::SessionExpired));
        }
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = coordinator.clone();
                let calls = calls.clone();
                let release = release.clone();
                tokio::spawn(async move {
                    coordinator
                        .run(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            release.notified().await;
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        // Laisse toutes les tâches rejoindre la file
        while coordinator.waiting() < 4 {
            tokio::task::yield_now().await;
        }
        release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn slow_refresh_times_out_and_rejects_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new(Duration::from_millis(50)));

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| std::future::pending::<Outcome>())
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let waiter = coordinator.run(|| async { Ok(()) }).await;

        assert_eq!(leader.await.unwrap(), Err(AuthFailure::Timeout));
        assert_eq!(waiter, Err(AuthFailure::Timeout));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn dropped_leader_rejects_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::default());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| std::future::pending::<Outcome>())
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let Enqueued::Waiting(rx) = coordinator.enqueue() else {
            panic!("refresh already in flight");
        };

        leader.abort();

        assert_eq!(rx.await.unwrap(), Err(AuthFailure::Abandoned));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn late_caller_after_success_skips_refresh() {
        let coordinator = RefreshCoordinator::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let seen = coordinator.generation();

        let first = coordinator
            .run_since(seen, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        let late = coordinator
            .run_since(seen, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(first, Ok(()));
        assert_eq!(late, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.generation(), seen + 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_generation() {
        let coordinator = RefreshCoordinator::default();
        let seen = coordinator.generation();

        let outcome = coordinator
            .run_since(seen, || async { Err(AuthFailure::SessionExpired) })
            .await;

        assert_eq!(outcome, Err(AuthFailure::SessionExpired));
        assert_eq!(coordinator.generation(), seen);
        assert!(matches!(coordinator.enqueue_since(Some(seen)), Enqueued::Leader));
    }
}
