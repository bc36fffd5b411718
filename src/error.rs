//! Error types shared by finders, the HTTP layer and tag reconciliation
//!
//! Not-found is a distinguished condition: read paths use [`is_not_found`] to
//! decide whether a missing resource is an expected state (drop the local
//! record) or a failure to report.

use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A search or lookup completed without finding the resource
#[derive(Debug)]
pub struct NotFoundError {
    last_request: String,
    message: Option<String>,
    cause: Option<BoxError>,
}

impl NotFoundError {
    /// Create a not-found marker for the given request description
    pub fn new(last_request: impl Into<String>) -> Self {
        Self {
            last_request: last_request.into(),
            message: None,
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the lower-level error that reported the absence
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn last_request(&self) -> &str {
        &self.last_request
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// True when the backing API itself reported the absence
    pub fn has_cause(&self) -> bool {
        self.cause.is_some()
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.cause) {
            (Some(message), _) => write!(f, "{}", message),
            (None, Some(cause)) => write!(f, "couldn't find resource: {}", cause),
            (None, None) => write!(f, "couldn't find resource"),
        }
    }
}

impl StdError for NotFoundError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// A lookup expected a single result and got several
#[derive(Debug, Error)]
#[error("too many results: wanted 1, got {count} ({last_request})")]
pub struct TooManyResultsError {
    pub count: usize,
    pub last_request: String,
}

/// Error response returned by the cloud control plane
#[derive(Debug, Clone, Error)]
#[error("API error {status}{}: {message}", .code.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default())]
pub struct ApiError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

/// Error codes meaning "the resource does not exist"
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "ResourceNotFound",
    "NotFoundException",
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchEntity",
    "NoSuchHostedZone",
    "QueueDoesNotExist",
    "AWS.SimpleQueueService.NonExistentQueue",
    "ParameterNotFound",
    "LoadBalancerNotFound",
    "TargetGroupNotFound",
    "ClusterNotFoundFault",
    "WAFNonexistentItemException",
];

/// Error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

impl ApiError {
    /// Build an error from a non-success HTTP response body.
    ///
    /// Understands `{"__type": "ns#Code", "message": ..}` and
    /// `{"code": .., "message": ..}`; anything else keeps the raw body as
    /// the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        let code = parsed.as_ref().and_then(|v| {
            v.get("__type")
                .or_else(|| v.get("code"))
                .or_else(|| v.get("Code"))
                .and_then(|c| c.as_str())
                .map(|c| c.rsplit('#').next().unwrap_or(c).to_string())
        });

        let message = parsed
            .as_ref()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("Message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                }
            });

        Self {
            status,
            code: code.filter(|c| !c.is_empty()),
            message,
        }
    }

    /// Check if this error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self.code.as_deref() {
            Some(code) => NOT_FOUND_CODES.contains(&code),
            None => self.status == 404,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status == 429
            || self
                .code
                .as_deref()
                .map(|c| THROTTLING_CODES.contains(&c))
                .unwrap_or(false)
    }
}

/// Check whether an error means "resource absent" rather than a failure.
///
/// Walks the whole error chain so context added with `anyhow::Context`
/// does not hide the marker.
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if cause.downcast_ref::<NotFoundError>().is_some() {
            return true;
        }
        cause
            .downcast_ref::<ApiError>()
            .map(ApiError::is_not_found)
            .unwrap_or(false)
    })
}

/// Check whether an error is a too-many-results condition
pub fn is_too_many_results(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<TooManyResultsError>().is_some())
}

/// A listing endpoint does not exist (wrong endpoint or list path).
///
/// Carries the API error's details but not the error itself, so
/// [`is_not_found`] does not mistake a missing route for a missing resource.
#[derive(Debug, Error)]
#[error("listing route not found: {last_request} (status {status}): {message}")]
pub struct RouteNotFoundError {
    pub last_request: String,
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

/// Turn a not-found error from a listing call into a [`RouteNotFoundError`]
pub fn route_error_from_api(error: anyhow::Error, last_request: &str) -> anyhow::Error {
    match error.downcast::<ApiError>() {
        Ok(api) if api.is_not_found() => RouteNotFoundError {
            last_request: last_request.to_string(),
            status: api.status,
            code: api.code,
            message: api.message,
        }
        .into(),
        Ok(api) => api.into(),
        Err(other) => other,
    }
}

/// User-facing explanation of a not-found error, if `error` is one
pub fn not_found_reason(error: &anyhow::Error) -> Option<String> {
    let marker = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<NotFoundError>());
    match marker {
        Some(marker) => Some(match marker.message() {
            Some(message) => format!("{} ({})", message, marker.last_request()),
            None => format!("no match ({})", marker.last_request()),
        }),
        None if is_not_found(error) => Some("reported missing by the API".to_string()),
        None => None,
    }
}

/// Turn a not-found API error into a [`NotFoundError`], leave others alone
pub fn not_found_from_api(error: anyhow::Error, last_request: &str) -> anyhow::Error {
    match error.downcast::<ApiError>() {
        Ok(api) if api.is_not_found() => NotFoundError::new(last_request).with_cause(api).into(),
        Ok(api) => api.into(),
        Err(other) => other,
    }
}
