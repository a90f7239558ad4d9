//! Single-flight re-authorization.
//!
//! # Responsibilities
//! - Run at most one `resolve_unauthorized` per slot at a time
//! - Hand every concurrent unauthorized request the same outcome
//! - Remember when the last successful re-authorization completed
//! - Fire `on_authorized` exactly once per request that reaches it
//!
//! # State Transitions
//! ```text
//! Idle → InFlight: request arrives, nothing pending, resolve started
//! InFlight → InFlight: request arrives, joins the shared outcome
//! InFlight → Idle: resolve settles (true records last_authorized_at)
//! ```
//!
//! The pending run is a `Shared` boxed future. Whichever waiter polls it
//! drives `resolve_unauthorized`; the future clears the in-flight slot itself
//! before any waiter can observe the result.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::schema::{OnAuthorizedFn, ResolveUnauthorizedFn};
use crate::observability::metrics;
use crate::request::RequestDescriptor;

/// Why a re-authorization run did not grant a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationFailure {
    #[error("re-authorization declined")]
    Denied,

    #[error("re-authorization failed: {0}")]
    Failed(String),

    #[error("re-authorization panicked")]
    Panicked,
}

/// How a request obtained its authorization outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// This request started the run.
    Started,
    /// This request joined a run already in flight.
    Joined,
    /// A run completed at or after this request was created; no new run needed.
    Reused,
}

type SharedOutcome = Shared<BoxFuture<'static, bool>>;

struct InFlight {
    cycle: u64,
    outcome: SharedOutcome,
}

#[derive(Default)]
struct EpochState {
    in_flight: Option<InFlight>,
    last_authorized_at: Option<Instant>,
    cycle: u64,
}

enum Entry {
    Run(SharedOutcome, Resolution),
    Reuse,
}

/// Per-slot coordinator owning the authorization epoch.
pub struct AuthorizationCoordinator {
    state: Arc<Mutex<EpochState>>,
    resolve: ResolveUnauthorizedFn,
    on_authorized: Option<OnAuthorizedFn>,
    reuse_completed: bool,
}

impl AuthorizationCoordinator {
    pub fn new(resolve: ResolveUnauthorizedFn, on_authorized: Option<OnAuthorizedFn>, reuse_completed: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(EpochState::default())),
            resolve,
            on_authorized,
            reuse_completed,
        }
    }

    /// Resolve the unauthorized failure of `request`.
    ///
    /// Returns the shared outcome and how it was obtained. Never fails:
    /// resolver errors and panics come back as `false`.
    pub async fn authorize(&self, request: &RequestDescriptor) -> (bool, Resolution) {
        let (authorized, resolution) = match self.enter(request) {
            Entry::Run(outcome, resolution) => {
                if resolution == Resolution::Joined {
                    metrics::record_authorization_joined();
                    tracing::debug!(request_id = %request.id(), "Joining in-flight re-authorization");
                }
                (outcome.await, resolution)
            }
            Entry::Reuse => {
                metrics::record_authorization_reused();
                tracing::debug!(
                    request_id = %request.id(),
                    "Request predates last re-authorization, approving without a new run"
                );
                (true, Resolution::Reused)
            }
        };

        self.notify(request);
        (authorized, resolution)
    }

    /// Whether a re-authorization run is pending.
    pub fn in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Completion instant of the last successful run.
    pub fn last_authorized_at(&self) -> Option<Instant> {
        self.lock().last_authorized_at
    }

    fn lock(&self) -> MutexGuard<'_, EpochState> {
        lock_epoch(&self.state)
    }

    fn enter(&self, request: &RequestDescriptor) -> Entry {
        let mut state = self.lock();

        if let Some(in_flight) = &state.in_flight {
            return Entry::Run(in_flight.outcome.clone(), Resolution::Joined);
        }

        if self.reuse_completed {
            if let Some(last) = state.last_authorized_at {
                if request.created_at() <= last {
                    return Entry::Reuse;
                }
            }
        }

        state.cycle += 1;
        let cycle = state.cycle;
        let outcome = self.start(cycle, request);
        state.in_flight = Some(InFlight {
            cycle,
            outcome: outcome.clone(),
        });

        Entry::Run(outcome, Resolution::Started)
    }

    fn start(&self, cycle: u64, request: &RequestDescriptor) -> SharedOutcome {
        let resolve = self.resolve.clone();
        let state = self.state.clone();
        let request_id = request.id();

        tracing::info!(cycle, %request_id, "Starting re-authorization");

        async move {
            let result = AssertUnwindSafe(async move { resolve().await }).catch_unwind().await;

            let outcome = match result {
                Ok(Ok(true)) => Ok(()),
                Ok(Ok(false)) => Err(AuthorizationFailure::Denied),
                Ok(Err(e)) => Err(AuthorizationFailure::Failed(e.to_string())),
                Err(_) => Err(AuthorizationFailure::Panicked),
            };

            settle(&state, cycle, outcome.is_ok());

            match &outcome {
                Ok(()) => {
                    metrics::record_authorization_cycle("granted");
                    tracing::info!(cycle, "Re-authorization succeeded");
                }
                Err(failure) => {
                    metrics::record_authorization_cycle(match failure {
                        AuthorizationFailure::Denied => "denied",
                        AuthorizationFailure::Failed(_) => "failed",
                        AuthorizationFailure::Panicked => "panicked",
                    });
                    tracing::warn!(cycle, error = %failure, "Re-authorization did not grant retry");
                }
            }

            outcome.is_ok()
        }
        .boxed()
        .shared()
    }

    fn notify(&self, request: &RequestDescriptor) {
        let Some(on_authorized) = &self.on_authorized else {
            return;
        };

        if std::panic::catch_unwind(AssertUnwindSafe(|| on_authorized())).is_err() {
            tracing::warn!(request_id = %request.id(), "on_authorized callback panicked");
        }
    }
}

fn lock_epoch(state: &Mutex<EpochState>) -> MutexGuard<'_, EpochState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn settle(state: &Mutex<EpochState>, cycle: u64, authorized: bool) {
    let mut state = lock_epoch(state);

    if state.in_flight.as_ref().map(|f| f.cycle) == Some(cycle) {
        state.in_flight = None;
    }
    if authorized {
        state.last_authorized_at = Some(Instant::now());
    }
}

impl std::fmt::Debug for AuthorizationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("AuthorizationCoordinator")
            .field("in_flight", &state.in_flight.is_some())
            .field("last_authorized_at", &state.last_authorized_at)
            .field("cycle", &state.cycle)
            .field("reuse_completed", &self.reuse_completed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::config::RetryConfig;

    fn coordinator(config: RetryConfig) -> AuthorizationCoordinator {
        AuthorizationCoordinator::new(
            config.resolve_unauthorized.unwrap(),
            config.on_authorized,
            config.reuse_completed_authorization,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_run() {
        let resolves = Arc::new(AtomicUsize::new(0));
        let notified = Arc::new(AtomicUsize::new(0));
        let r = resolves.clone();
        let n = notified.clone();

        let coordinator = coordinator(
            RetryConfig::default()
                .with_resolve_unauthorized(move || {
                    let r = r.clone();
                    async move {
                        r.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        true
                    }
                })
                .with_on_authorized(move || {
                    n.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let requests: Vec<_> = (0..4).map(|i| RequestDescriptor::new("get", format!("/r{i}"))).collect();
        let results = futures_util::future::join_all(requests.iter().map(|r| coordinator.authorize(r))).await;

        assert_eq!(resolves.load(Ordering::SeqCst), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 4);
        assert!(results.iter().all(|(authorized, _)| *authorized));
        assert_eq!(results.iter().filter(|(_, r)| *r == Resolution::Started).count(), 1);
        assert_eq!(results.iter().filter(|(_, r)| *r == Resolution::Joined).count(), 3);
        assert!(!coordinator.in_flight());
        assert!(coordinator.last_authorized_at().is_some());
    }

    #[tokio::test]
    async fn test_denied_run_does_not_record_timestamp() {
        let coordinator = coordinator(RetryConfig::default().with_resolve_unauthorized(|| async { false }));
        let request = RequestDescriptor::new("get", "/");

        assert_eq!(coordinator.authorize(&request).await, (false, Resolution::Started));
        assert!(coordinator.last_authorized_at().is_none());
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn test_panicking_resolver_is_contained() {
        let coordinator = coordinator(RetryConfig::default().with_resolve_unauthorized(|| async {
            let token_store: Option<bool> = None;
            token_store.expect("token store exploded")
        }));
        let request = RequestDescriptor::new("get", "/");

        assert_eq!(coordinator.authorize(&request).await, (false, Resolution::Started));
        assert!(!coordinator.in_flight());

        // The slot is free again for the next run.
        assert_eq!(coordinator.authorize(&request).await.1, Resolution::Started);
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_block_waiters() {
        let coordinator = coordinator(
            RetryConfig::default()
                .with_resolve_unauthorized(|| async {
                    tokio::task::yield_now().await;
                    true
                })
                .with_on_authorized(|| panic!("listener bug")),
        );

        let a = RequestDescriptor::new("get", "/a");
        let b = RequestDescriptor::new("get", "/b");
        let (ra, rb) = tokio::join!(coordinator.authorize(&a), coordinator.authorize(&b));

        assert!(ra.0);
        assert!(rb.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuse_completed_run_for_stale_request() {
        let resolves = Arc::new(AtomicUsize::new(0));
        let notified = Arc::new(AtomicUsize::new(0));
        let r = resolves.clone();
        let n = notified.clone();

        let coordinator = coordinator(
            RetryConfig::default()
                .with_reuse_completed_authorization(true)
                .with_resolve_unauthorized(move || {
                    let r = r.clone();
                    async move {
                        r.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        true
                    }
                })
                .with_on_authorized(move || {
                    n.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let stale = RequestDescriptor::new("get", "/stale");
        tokio::time::advance(Duration::from_millis(1)).await;
        let first = RequestDescriptor::new("get", "/first");

        assert_eq!(coordinator.authorize(&first).await, (true, Resolution::Started));
        assert_eq!(coordinator.authorize(&stale).await, (true, Resolution::Reused));
        assert_eq!(resolves.load(Ordering::SeqCst), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_millis(1)).await;
        let fresh = RequestDescriptor::new("get", "/fresh");
        assert_eq!(coordinator.authorize(&fresh).await, (true, Resolution::Started));
        assert_eq!(resolves.load(Ordering::SeqCst), 2);
    }
}
