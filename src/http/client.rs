//! Retrying HTTP client.
//!
//! # Responsibilities
//! - Issue a request through reqwest
//! - Consult the retry slot after every failed attempt
//! - Re-issue with a fresh descriptor after a fixed delay
//! - Surface the last failure when the slot refuses

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http::cancel::CancelSignal;
use crate::http::classify::{classify_error, classify_response};
use crate::request::{FailureOutcome, RequestDescriptor};
use crate::resilience::RetrySlot;

/// Final failure surfaced to the application.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("server returned HTTP {} after {attempts} attempt(s)", .response.status())]
    Status { response: Response, attempts: u32 },

    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
        attempts: u32,
    },

    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl ClientError {
    /// Number of requests sent before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            ClientError::Build(_) => 0,
            ClientError::Status { attempts, .. }
            | ClientError::Transport { attempts, .. }
            | ClientError::Cancelled { attempts } => *attempts,
        }
    }
}

/// reqwest client driven by a [`RetrySlot`].
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    slot: RetrySlot,
    retry_delay: Duration,
    cancel: Option<CancelSignal>,
}

impl RetryingClient {
    /// Build a client with the configured per-attempt timeout.
    pub fn new(slot: RetrySlot, config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self::with_client(client, slot, config))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client, slot: RetrySlot, config: &ClientConfig) -> Self {
        Self {
            client,
            slot,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            cancel: None,
        }
    }

    /// Abort pending and future attempts when `signal` fires.
    pub fn with_cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn slot(&self) -> &RetrySlot {
        &self.slot
    }

    /// Send `method url`, retrying while the slot allows it.
    ///
    /// `prepare` is applied to every attempt's builder (headers, body, auth).
    pub async fn execute<F>(&self, method: Method, url: &str, prepare: F) -> Result<Response, ClientError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let descriptor = RequestDescriptor::new(method.as_str(), url);
            let request_id = descriptor.id();
            let builder = prepare(self.client.request(method.clone(), url));

            let sent = tokio::select! {
                biased;
                _ = self.cancelled() => None,
                result = builder.send() => Some(result),
            };

            let (failure, error) = match sent {
                None => (
                    FailureOutcome::cancelled(descriptor),
                    ClientError::Cancelled { attempts: attempt },
                ),
                Some(Ok(response)) => match classify_response(descriptor, &response) {
                    None => return Ok(response),
                    Some(failure) => (failure, ClientError::Status { response, attempts: attempt }),
                },
                Some(Err(source)) => (
                    classify_error(descriptor, &source),
                    ClientError::Transport { source, attempts: attempt },
                ),
            };

            if !self.slot.validate(&failure, attempt).await {
                tracing::debug!(%request_id, attempt, error = %error, "Giving up");
                return Err(error);
            }

            tracing::info!(%request_id, attempt, delay = ?self.retry_delay, failure = %failure, "Retrying request");
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }

    /// Shorthand for a GET with no extra request setup.
    pub async fn get(&self, url: &str) -> Result<Response, ClientError> {
        self.execute(Method::GET, url, |builder| builder).await
    }

    async fn cancelled(&self) {
        match &self.cancel {
            Some(signal) => signal.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
