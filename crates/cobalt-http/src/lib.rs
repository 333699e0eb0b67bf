//! Cobalt HTTP
//!
//! The transport seam between the workflow engine and the network. The
//! engine builds an [`HttpRequest`] per step and hands it to a [`Transport`];
//! timeouts, retries and connection reuse belong to the transport.
//!
//! [`ReqwestTransport`] is the production implementation. Tests inject their
//! own `Transport` that records requests and returns canned responses.

mod client;
mod error;
mod message;

pub use client::{ReqwestTransport, TransportConfig};
pub use error::TransportError;
pub use message::{HttpRequest, HttpResponse, RequestBody};

use async_trait::async_trait;

/// Issues one HTTP request and returns the response.
///
/// Non-2xx statuses are responses, not errors. An error means no response
/// was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
