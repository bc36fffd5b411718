//! Cloud Client
//!
//! Main client for the control plane, combining credentials, the HTTP
//! client and endpoint URL building.

use super::auth::Credentials;
use super::http::HttpClient;
use crate::context::OperationContext;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use url::Url;

/// Main control-plane client
#[derive(Clone)]
pub struct CloudClient {
    pub credentials: Credentials,
    pub http: HttpClient,
    endpoint: String,
    region: String,
}

impl CloudClient {
    /// Create a new client for `endpoint` (e.g. `http://localhost:4566`)
    pub fn new(endpoint: &str, region: &str, credentials: Credentials) -> Result<Self> {
        let parsed = Url::parse(endpoint).with_context(|| format!("Invalid endpoint: {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Unsupported endpoint scheme: {}", parsed.scheme());
        }

        let http = HttpClient::new(region)?;

        Ok(Self {
            credentials,
            http,
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            region: region.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Make a GET request
    pub async fn get(&self, ctx: &OperationContext, url: &str) -> Result<Value> {
        self.http.get(ctx, url, self.credentials.token()).await
    }

    /// Make a POST request
    pub async fn post(&self, ctx: &OperationContext, url: &str, body: Option<&Value>) -> Result<Value> {
        self.http.post(ctx, url, self.credentials.token(), body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, ctx: &OperationContext, url: &str) -> Result<Value> {
        self.http.delete(ctx, url, self.credentials.token()).await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a service API URL: `{endpoint}/{service}/{path}`
    pub fn service_url(&self, service: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            service,
            path.trim_start_matches('/')
        )
    }

    /// Build the URL of one resource's tags: `{endpoint}/{service}/{tags_path}/{id}`
    pub fn tags_url(&self, service: &str, tags_path: &str, identifier: &str) -> String {
        self.service_url(
            service,
            &format!(
                "{}/{}",
                tags_path.trim_matches('/'),
                urlencoding::encode(identifier)
            ),
        )
    }
}
