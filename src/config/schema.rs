//! Configuration schema definitions.
//!
//! Data options derive Serde traits for deserialization from config files.
//! Hooks (`validate`, `resolve_unauthorized`, `on_authorized`) are skipped by
//! Serde and attached in code.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::request::RequestDescriptor;

/// Boxed error returned by user hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Veto predicate. Returning `false` refuses the retry outright.
pub type ValidateFn = Arc<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>;

/// Re-authorization action. Resolves to `true` when a retry should follow.
pub type ResolveUnauthorizedFn = Arc<dyn Fn() -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync>;

/// Called once per request whose unauthorized decision has been resolved.
pub type OnAuthorizedFn = Arc<dyn Fn() + Send + Sync>;

/// Values a re-authorization action may resolve to.
pub trait IntoAuthorized {
    fn into_authorized(self) -> Result<bool, BoxError>;
}

impl IntoAuthorized for bool {
    fn into_authorized(self) -> Result<bool, BoxError> {
        Ok(self)
    }
}

impl<E> IntoAuthorized for Result<bool, E>
where
    E: Into<BoxError>,
{
    fn into_authorized(self) -> Result<bool, BoxError> {
        self.map_err(Into::into)
    }
}

/// Root configuration file layout.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RetrySlotConfig {
    /// Retry decision options.
    pub retry: RetryConfig,

    /// Host HTTP client settings.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One entry of the HTTP status allow-list.
///
/// Deserializes from either `429` or `[500, 599]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StatusRule {
    /// A single status code.
    Code(u16),
    /// An inclusive `[low, high]` range.
    Range([u16; 2]),
}

impl StatusRule {
    pub fn range(low: u16, high: u16) -> Self {
        StatusRule::Range([low, high])
    }

    pub fn matches(&self, status: u16) -> bool {
        match *self {
            StatusRule::Code(code) => code == status,
            StatusRule::Range([low, high]) => (low..=high).contains(&status),
        }
    }
}

impl From<u16> for StatusRule {
    fn from(code: u16) -> Self {
        StatusRule::Code(code)
    }
}

impl From<[u16; 2]> for StatusRule {
    fn from(range: [u16; 2]) -> Self {
        StatusRule::Range(range)
    }
}

/// Retry decision configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Upper bound on the attempt number that may still be retried.
    pub max_times: u32,

    /// Methods eligible for the unauthorized path (case-insensitive).
    /// `None` allows every method.
    pub allowed_methods: Option<Vec<String>>,

    /// Status allow-list. Empty disables status-based retry.
    pub allowed_http_status: Vec<StatusRule>,

    /// Approve requests created before the last successful re-authorization
    /// without starting a new one.
    pub reuse_completed_authorization: bool,

    #[serde(skip)]
    pub validate: Option<ValidateFn>,

    #[serde(skip)]
    pub resolve_unauthorized: Option<ResolveUnauthorizedFn>,

    #[serde(skip)]
    pub on_authorized: Option<OnAuthorizedFn>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_times: 1,
            allowed_methods: None,
            allowed_http_status: Vec::new(),
            reuse_completed_authorization: false,
            validate: None,
            resolve_unauthorized: None,
            on_authorized: None,
        }
    }
}

impl RetryConfig {
    pub fn with_max_times(mut self, max_times: u32) -> Self {
        self.max_times = max_times;
        self
    }

    pub fn with_allowed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_allowed_http_status<I, R>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StatusRule>,
    {
        self.allowed_http_status = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reuse_completed_authorization(mut self, reuse: bool) -> Self {
        self.reuse_completed_authorization = reuse;
        self
    }

    /// Attach a veto predicate.
    pub fn with_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// Attach the re-authorization action; enables the unauthorized path.
    ///
    /// The future may resolve to a `bool` or a `Result<bool, E>`.
    pub fn with_resolve_unauthorized<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoAuthorized,
    {
        self.resolve_unauthorized = Some(Arc::new(move || f().map(IntoAuthorized::into_authorized).boxed()));
        self
    }

    pub fn with_on_authorized<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_authorized = Some(Arc::new(f));
        self
    }

    /// Whether `method` may take the unauthorized path.
    pub fn allows_method(&self, method: &str) -> bool {
        match &self.allowed_methods {
            Some(methods) => methods.iter().any(|m| m.eq_ignore_ascii_case(method)),
            None => true,
        }
    }

    /// Whether `status` is on the allow-list.
    pub fn allows_status(&self, status: u16) -> bool {
        self.allowed_http_status.iter().any(|rule| rule.matches(status))
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_times", &self.max_times)
            .field("allowed_methods", &self.allowed_methods)
            .field("allowed_http_status", &self.allowed_http_status)
            .field("reuse_completed_authorization", &self.reuse_completed_authorization)
            .field("validate", &self.validate.is_some())
            .field("resolve_unauthorized", &self.resolve_unauthorized.is_some())
            .field("on_authorized", &self.on_authorized.is_some())
            .finish()
    }
}

/// Host HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Fixed delay before re-issuing a request, in milliseconds.
    pub retry_delay_ms: u64,

    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 0,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
