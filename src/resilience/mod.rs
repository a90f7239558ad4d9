//! Resilience subsystem: the retry decision slot.
//!
//! # Data Flow
//! ```text
//! Attempt fails in the host pipeline:
//!     → retries.rs RetrySlot::validate(failure, attempt)
//!         1. custom veto           → refuse
//!         2. cancellation          → refuse
//!         3. attempt budget        → refuse
//!         4. unauthorized path     → authorization.rs (single-flight)
//!         5. status allow-list / transport failure
//!     → bool back to the host's retry loop
//! ```
//!
//! # Design Decisions
//! - The slot is stateless with respect to attempts; the caller owns the count
//! - Timing (backoff, delays) belongs to the caller's retry loop
//! - Authorization state is owned per slot, never global
//! - User hook failures degrade to "do not retry"

pub mod authorization;
pub mod retries;

pub use authorization::{AuthorizationCoordinator, AuthorizationFailure, Resolution};
pub use retries::{DecisionReason, RetryDecision, RetrySlot};
