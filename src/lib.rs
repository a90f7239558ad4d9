//! Request-retry decision engine for HTTP client pipelines.
//!
//! # Architecture Overview
//!
//! ```text
//!     host pipeline ── attempt fails ──▶ request::FailureOutcome
//!                                              │
//!                                              ▼
//!                                   resilience::RetrySlot::validate
//!                                   ┌──────────────────────────────┐
//!                                   │ veto → cancel → budget       │
//!                                   │   → unauthorized ──────────┐ │
//!                                   │   → status allow-list      │ │
//!                                   └────────────────────────────┼─┘
//!                                                                ▼
//!                                      resilience::AuthorizationCoordinator
//!                                      (single-flight resolve_unauthorized)
//! ```
//!
//! `http` contains a reqwest-based host pipeline that drives the slot;
//! `config` and `observability` carry the ambient plumbing.

pub mod config;
pub mod http;
pub mod observability;
pub mod request;
pub mod resilience;

pub use config::{RetryConfig, RetrySlotConfig, StatusRule};
pub use http::{CancelSignal, ClientError, RetryingClient};
pub use request::{FailureKind, FailureOutcome, RequestDescriptor};
pub use resilience::{DecisionReason, RetryDecision, RetrySlot};
