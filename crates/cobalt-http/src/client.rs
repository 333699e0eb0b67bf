use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::message::{HttpRequest, HttpResponse, RequestBody};
use crate::Transport;

/// Configuration for [`ReqwestTransport`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
  /// Per-request timeout. `None` waits indefinitely.
  pub timeout: Option<Duration>,
  pub user_agent: Option<String>,
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
      builder = builder.timeout(timeout);
    }
    if let Some(user_agent) = config.user_agent {
      builder = builder.user_agent(user_agent);
    }
    Ok(Self {
      client: builder.build()?,
    })
  }

  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = parse_method(&request.method)?;
    let url = build_url(&request.url, &request.params)?;
    debug!(method = %method, url = %url, "sending request");

    let mut builder = self.client.request(method, url);
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }

    builder = match request.body {
      Some(RequestBody::Json(body)) => builder.json(&body),
      Some(RequestBody::Form(fields)) => builder.form(&fields),
      Some(RequestBody::Text(text)) => builder.body(text),
      None => builder,
    };

    let response = builder.send().await?;

    let status_code = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(k, v)| {
        v.to_str()
          .ok()
          .map(|val| (k.as_str().to_lowercase(), val.to_string()))
      })
      .collect();
    let text = response.text().await?;

    Ok(HttpResponse {
      status_code,
      headers,
      text,
    })
  }
}

fn build_url(base: &str, params: &[(String, String)]) -> Result<Url, TransportError> {
  let mut url = Url::parse(base).map_err(|e| TransportError::InvalidUrl {
    url: base.to_string(),
    message: e.to_string(),
  })?;
  if !params.is_empty() {
    url.query_pairs_mut().extend_pairs(params);
  }
  Ok(url)
}

fn parse_method(method: &str) -> Result<Method, TransportError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    "TRACE" => Ok(Method::TRACE),
    _ => Err(TransportError::UnsupportedMethod {
      method: method.to_string(),
    }),
  }
}
