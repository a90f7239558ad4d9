//! Mapping reqwest outcomes onto failure outcomes.

use crate::request::{FailureOutcome, RequestDescriptor};

/// Classify a response. Returns `None` when the response is not a failure.
pub fn classify_response(request: RequestDescriptor, response: &reqwest::Response) -> Option<FailureOutcome> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        Some(FailureOutcome::http(request, status.as_u16()))
    } else {
        None
    }
}

/// Classify a transport error.
///
/// Errors produced by `error_for_status` keep their status; everything else
/// (connect, timeout, body, decode) is a network failure.
pub fn classify_error(request: RequestDescriptor, error: &reqwest::Error) -> FailureOutcome {
    match error.status() {
        Some(status) => FailureOutcome::http(request, status.as_u16()),
        None => FailureOutcome::network(request),
    }
}
