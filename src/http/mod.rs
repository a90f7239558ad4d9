//! Host HTTP pipeline built on reqwest.
//!
//! # Data Flow
//! ```text
//! RetryingClient::execute(method, url, prepare)
//!     → fresh RequestDescriptor per attempt
//!     → reqwest send (raced against CancelSignal)
//!     → classify.rs (Response / reqwest::Error → FailureOutcome)
//!     → RetrySlot::validate(failure, attempt)
//!     → retry (fixed delay) or surface the last failure
//! ```
//!
//! # Design Decisions
//! - `prepare` runs per attempt so re-issued requests pick up refreshed credentials
//! - 4xx/5xx responses are failures; everything else is returned as-is
//! - Cancellation is classified before the slot sees it

pub mod cancel;
pub mod classify;
pub mod client;

pub use cancel::CancelSignal;
pub use classify::{classify_error, classify_response};
pub use client::{ClientError, RetryingClient};
