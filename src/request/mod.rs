//! Request and failure descriptors handed to the decision slot.
//!
//! # Data Flow
//! ```text
//! HTTP pipeline builds a request
//!     → descriptor.rs (method, url, creation timestamp, request id)
//! Attempt fails
//!     → failure.rs (Cancelled / NetworkError / HttpError{status})
//!     → resilience::RetrySlot::validate(failure, attempt)
//! ```
//!
//! # Design Decisions
//! - Descriptors are immutable once built; a re-issued request gets a new one
//! - Creation time is stamped at construction, never at failure time
//! - Cancellation is classified here so it never reaches the coordinator

pub mod descriptor;
pub mod failure;

pub use descriptor::RequestDescriptor;
pub use failure::{FailureKind, FailureOutcome};
