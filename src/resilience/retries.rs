//! Retry decision slot.
//!
//! # Responsibilities
//! - Decide whether a failed attempt should be re-issued
//! - Apply the veto, cancellation, budget, unauthorized and status checks in order
//! - Route unauthorized failures through the single-flight coordinator
//!
//! # Design Decisions
//! - Cancellation is never retried
//! - Transport failures retry by default; status failures are opt-in
//! - Once the veto passes, an eligible unauthorized failure skips the status allow-list

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::config::loader::ConfigError;
use crate::config::validation::validate_retry;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::request::{FailureOutcome, RequestDescriptor};
use crate::resilience::authorization::{AuthorizationCoordinator, Resolution};

/// Why the slot reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// The configured `validate` predicate refused (or panicked).
    Vetoed,
    /// The caller cancelled the request.
    Cancelled,
    /// `attempt` exceeded `max_times`.
    BudgetExhausted,
    /// Re-authorization granted the retry.
    Authorized(Resolution),
    /// Re-authorization declined, failed or panicked.
    AuthorizationDenied,
    /// The status is on the allow-list.
    StatusAllowed,
    /// The status is not on the allow-list (or the list is empty).
    StatusRejected,
    /// No HTTP status: connection-level failure.
    TransportFailure,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Vetoed => "vetoed",
            DecisionReason::Cancelled => "cancelled",
            DecisionReason::BudgetExhausted => "budget_exhausted",
            DecisionReason::Authorized(_) => "authorized",
            DecisionReason::AuthorizationDenied => "authorization_denied",
            DecisionReason::StatusAllowed => "status_allowed",
            DecisionReason::StatusRejected => "status_rejected",
            DecisionReason::TransportFailure => "transport_failure",
        }
    }
}

/// Outcome of a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub reason: DecisionReason,
}

impl RetryDecision {
    fn approve(reason: DecisionReason) -> Self {
        Self { retry: true, reason }
    }

    fn refuse(reason: DecisionReason) -> Self {
        Self { retry: false, reason }
    }
}

struct SlotInner {
    config: RetryConfig,
    coordinator: Option<AuthorizationCoordinator>,
}

/// Retry decision slot.
///
/// Cheap to clone; clones share the same authorization epoch.
#[derive(Clone)]
pub struct RetrySlot {
    inner: Arc<SlotInner>,
}

impl RetrySlot {
    pub fn new(config: RetryConfig) -> Self {
        let coordinator = config.resolve_unauthorized.clone().map(|resolve| {
            AuthorizationCoordinator::new(
                resolve,
                config.on_authorized.clone(),
                config.reuse_completed_authorization,
            )
        });

        Self {
            inner: Arc::new(SlotInner { config, coordinator }),
        }
    }

    /// Build a slot from a config assembled in code, rejecting bad status rules
    /// and blank method names the way a loaded file would be.
    pub fn try_new(config: RetryConfig) -> Result<Self, ConfigError> {
        validate_retry(&config).map_err(ConfigError::Validation)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// The coordinator, present when `resolve_unauthorized` is configured.
    pub fn coordinator(&self) -> Option<&AuthorizationCoordinator> {
        self.inner.coordinator.as_ref()
    }

    /// Should the request behind `failure` be re-issued as attempt `attempt`?
    ///
    /// `attempt` starts at 1 and is owned by the caller's retry loop.
    pub async fn validate(&self, failure: &FailureOutcome, attempt: u32) -> bool {
        self.decide(failure, attempt).await.retry
    }

    /// Same as [`validate`](Self::validate), with the reason attached.
    pub async fn decide(&self, failure: &FailureOutcome, attempt: u32) -> RetryDecision {
        let decision = self.evaluate(failure, attempt).await;
        let request = failure.request();

        metrics::record_decision(decision.retry, decision.reason.as_str());
        tracing::debug!(
            request_id = %request.id(),
            method = request.method(),
            url = request.url(),
            status = ?failure.status(),
            attempt,
            retry = decision.retry,
            reason = decision.reason.as_str(),
            "Retry decision"
        );

        decision
    }

    async fn evaluate(&self, failure: &FailureOutcome, attempt: u32) -> RetryDecision {
        let config = &self.inner.config;
        let request = failure.request();

        if !self.passes_veto(request) {
            return RetryDecision::refuse(DecisionReason::Vetoed);
        }

        if failure.is_cancelled() {
            return RetryDecision::refuse(DecisionReason::Cancelled);
        }

        if attempt > config.max_times {
            return RetryDecision::refuse(DecisionReason::BudgetExhausted);
        }

        if let Some(coordinator) = &self.inner.coordinator {
            if failure.is_unauthorized() && config.allows_method(request.method()) {
                let (authorized, resolution) = coordinator.authorize(request).await;
                return if authorized {
                    RetryDecision::approve(DecisionReason::Authorized(resolution))
                } else {
                    RetryDecision::refuse(DecisionReason::AuthorizationDenied)
                };
            }
        }

        match failure.status() {
            Some(status) if config.allows_status(status) => RetryDecision::approve(DecisionReason::StatusAllowed),
            Some(_) => RetryDecision::refuse(DecisionReason::StatusRejected),
            None => RetryDecision::approve(DecisionReason::TransportFailure),
        }
    }

    fn passes_veto(&self, request: &RequestDescriptor) -> bool {
        let Some(validate) = &self.inner.config.validate else {
            return true;
        };

        match std::panic::catch_unwind(AssertUnwindSafe(|| validate(request))) {
            Ok(allowed) => allowed,
            Err(_) => {
                tracing::warn!(request_id = %request.id(), "validate predicate panicked, refusing retry");
                false
            }
        }
    }
}

impl std::fmt::Debug for RetrySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySlot")
            .field("config", &self.inner.config)
            .field("coordinator", &self.inner.coordinator)
            .finish()
    }
}
