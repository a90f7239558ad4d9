//! Request descriptor.

use std::fmt;

use tokio::time::Instant;
use uuid::Uuid;

/// Identity of a single issued request.
///
/// The creation timestamp is taken from the Tokio clock so that it is monotonic
/// and follows paused time in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    id: Uuid,
    method: String,
    url: String,
    created_at: Instant,
}

impl RequestDescriptor {
    /// Create a descriptor stamped with the current instant.
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self::with_created_at(method, url, Instant::now())
    }

    /// Create a descriptor with an explicit creation instant.
    pub fn with_created_at(method: impl AsRef<str>, url: impl Into<String>, created_at: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.as_ref().to_ascii_lowercase(),
            url: url.into(),
            created_at,
        }
    }

    /// Correlation id for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lower-cased HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.to_ascii_uppercase(), self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_is_normalized() {
        let req = RequestDescriptor::new("PoSt", "http://localhost/login");
        assert_eq!(req.method(), "post");
        assert_eq!(req.to_string(), "POST http://localhost/login");
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_order() {
        let first = RequestDescriptor::new("get", "/a");
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let second = RequestDescriptor::new("get", "/a");

        assert!(first.created_at() < second.created_at());
        assert_ne!(first.id(), second.id());
    }
}
