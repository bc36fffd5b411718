//! HTTP utilities for control-plane REST calls

use crate::context::OperationContext;
use crate::error::ApiError;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of a non-API error shown to the user, in characters
const MAX_ERROR_DISPLAY_CHARS: usize = 120;

/// Header carrying the operation's request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the target region
pub const REGION_HEADER: &str = "x-region";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for control-plane calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client sending `region` on every request
    pub fn new(region: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            REGION_HEADER,
            HeaderValue::from_str(region).context("Invalid region header value")?,
        );

        let client = Client::builder()
            .user_agent(concat!("provkit/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, ctx: &OperationContext, url: &str, token: Option<&str>) -> Result<Value> {
        tracing::debug!(request_id = %ctx.request_id(), "GET {}", url);
        self.send(ctx, self.client.get(url), token).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(
        &self,
        ctx: &OperationContext,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!(request_id = %ctx.request_id(), "POST {}", url);

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(ctx, request, token).await
    }

    /// Make a DELETE request
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        url: &str,
        token: Option<&str>,
    ) -> Result<Value> {
        tracing::debug!(request_id = %ctx.request_id(), "DELETE {}", url);
        self.send(ctx, self.client.delete(url), token).await
    }

    async fn send(
        &self,
        ctx: &OperationContext,
        request: RequestBuilder,
        token: Option<&str>,
    ) -> Result<Value> {
        let mut request = request.header(REQUEST_ID_HEADER, ctx.request_id().to_string());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = ctx.timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            let error = ApiError::from_response(status.as_u16(), &body);
            if error.is_not_found() {
                tracing::debug!(request_id = %ctx.request_id(), "API not found: {}", error);
            } else {
                // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
                tracing::error!(
                    request_id = %ctx.request_id(),
                    "API error: {} - {}",
                    status,
                    sanitize_for_log(&body)
                );
            }
            return Err(error.into());
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format an API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        if api.is_not_found() {
            return "Resource not found.".to_string();
        }
        if api.is_throttled() {
            return "Rate limit exceeded. Please try again later.".to_string();
        }
        return match api.status {
            401 => "Authentication failed. Set PROVKIT_TOKEN or add a token to the credentials file."
                .to_string(),
            403 => "Permission denied. Check the policy attached to your credentials.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            400 => match &api.code {
                Some(code) => format!("Invalid request ({}).", code),
                None => "Invalid request. Check your parameters.".to_string(),
            },
            500..=599 => "Service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed with status {}.", api.status),
        };
    }

    // Truncate long error messages and remove potential sensitive data
    let cleaned: String = format!("{:#}", error)
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if cleaned.chars().count() > MAX_ERROR_DISPLAY_CHARS {
        let truncated: String = cleaned.chars().take(MAX_ERROR_DISPLAY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\tb\nc d"), "abc d");
    }

    #[test]
    fn test_format_api_error_by_status() {
        let err: anyhow::Error = ApiError::from_response(403, r#"{"message": "denied"}"#).into();
        assert!(format_api_error(&err).starts_with("Permission denied"));

        let err: anyhow::Error =
            ApiError::from_response(400, r#"{"code": "NoSuchBucket"}"#).into();
        assert_eq!(format_api_error(&err), "Resource not found.");

        let err: anyhow::Error =
            ApiError::from_response(400, r#"{"code": "ValidationException"}"#).into();
        assert_eq!(format_api_error(&err), "Invalid request (ValidationException).");

        let err: anyhow::Error = ApiError::from_response(503, "").into();
        assert!(format_api_error(&err).starts_with("Service temporarily unavailable"));
    }

    #[test]
    fn test_format_other_errors_truncates() {
        let err = anyhow::anyhow!("{}", "e".repeat(300));
        let formatted = format_api_error(&err);
        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.len(), 123);
    }

    #[test]
    fn test_format_short_errors_keep_text() {
        let err = anyhow::anyhow!("queue «orders» missing\nretry later");
        assert_eq!(format_api_error(&err), "queue «orders» missing retry later");

        let err = anyhow::anyhow!("{}", "é".repeat(120));
        assert_eq!(format_api_error(&err), "é".repeat(120));
    }

    #[test]
    fn test_format_route_errors_are_not_not_found() {
        let api = ApiError::from_response(404, "");
        let err = crate::error::route_error_from_api(api.into(), "GET sqs/queues (aws_sqs_queue)");
        let formatted = format_api_error(&err);
        assert!(formatted.starts_with("listing route not found: GET sqs/queues"));
    }

    #[test]
    fn test_new_rejects_invalid_region_header() {
        assert!(HttpClient::new("us-east-1").is_ok());
        assert!(HttpClient::new("bad\nregion").is_err());
    }
}
