//! Control-plane API interaction
//!
//! # Module Structure
//!
//! - [`auth`] - Token and region discovery
//! - [`client`] - Main client combining credentials, HTTP and URL building
//! - [`http`] - HTTP utilities and API error formatting
//!
//! # Example
//!
//! ```ignore
//! use provkit::cloud::{auth::Credentials, client::CloudClient};
//! use provkit::context::OperationContext;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = CloudClient::new("http://localhost:4566", "us-east-1", Credentials::resolve(None))?;
//!     let ctx = OperationContext::new("list queues");
//!     let queues = client.get(&ctx, &client.service_url("sqs", "queues")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
