//! Failure classification for a single attempt.

use std::fmt;

use crate::request::RequestDescriptor;

/// Status that marks a failure as needing re-authorization.
pub const UNAUTHORIZED_STATUS: u16 = 401;

/// What went wrong with an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The caller gave up on the request. Never retried.
    Cancelled,
    /// Transport failure with no HTTP status (connect, reset, timeout).
    NetworkError,
    /// The server answered with an error status.
    HttpError { status: u16 },
}

/// A failed attempt together with the request that produced it.
#[derive(Debug, Clone)]
pub struct FailureOutcome {
    kind: FailureKind,
    request: RequestDescriptor,
}

impl FailureOutcome {
    pub fn new(kind: FailureKind, request: RequestDescriptor) -> Self {
        Self { kind, request }
    }

    pub fn cancelled(request: RequestDescriptor) -> Self {
        Self::new(FailureKind::Cancelled, request)
    }

    pub fn network(request: RequestDescriptor) -> Self {
        Self::new(FailureKind::NetworkError, request)
    }

    pub fn http(request: RequestDescriptor, status: u16) -> Self {
        Self::new(FailureKind::HttpError { status }, request)
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpError { status } => Some(status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, FailureKind::Cancelled)
    }

    /// True when the failure calls for a re-authorization step.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(UNAUTHORIZED_STATUS)
    }
}

impl fmt::Display for FailureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Cancelled => write!(f, "{} cancelled", self.request),
            FailureKind::NetworkError => write!(f, "{} failed: network error", self.request),
            FailureKind::HttpError { status } => write!(f, "{} failed: HTTP {}", self.request, status),
        }
    }
}
