//! Operation Context
//!
//! Carries the request identity and timeout for one logical operation.
//! Finders and reconcilers pass it through untouched; only the HTTP layer
//! reads it.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Context threaded through page fetches and tag calls
#[derive(Debug, Clone)]
pub struct OperationContext {
    request_id: Uuid,
    operation: String,
    started_at: DateTime<Utc>,
    timeout: Option<Duration>,
}

impl OperationContext {
    /// Create a context for a named operation (e.g. "find aws_sqs_queue")
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation: operation.into(),
            started_at: Utc::now(),
            timeout: None,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Derive a context for a sub-operation, keeping the request id and timeout
    pub fn child(&self, operation: impl Into<String>) -> Self {
        Self {
            request_id: self.request_id,
            operation: operation.into(),
            started_at: Utc::now(),
            timeout: self.timeout,
        }
    }
}
