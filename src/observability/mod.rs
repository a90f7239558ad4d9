//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Decision slot and coordinator produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (decision and authorization counters)
//!
//! Consumers:
//!     → Host application's subscriber / exporter
//!     → retry-probe CLI (fmt subscriber, optional Prometheus listener)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers/recorders is the host's job
//! - Request ID flows through every decision log line
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
