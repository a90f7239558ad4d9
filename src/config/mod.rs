//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RetrySlotConfig (validated, immutable)
//!
//! In code:
//!     RetryConfig::default()
//!     → with_validate / with_resolve_unauthorized / with_on_authorized
//!     → RetrySlot::new(config)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a slot is built from it
//! - All fields have defaults to allow minimal configs
//! - Hooks are code-only; files carry the data options
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BoxError;
pub use schema::ClientConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryConfig;
pub use schema::RetrySlotConfig;
pub use schema::StatusRule;
