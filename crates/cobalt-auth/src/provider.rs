use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::requirement::{RequestAuthValue, SecurityRequirement};

/// Context passed to a credential provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
  /// The API source the operation belongs to.
  pub source_name: Option<String>,
}

/// Produces request credentials for security requirements.
///
/// Implementors supply `get_credential` for a single requirement. The
/// provided `get_credentials` walks the alternatives in order and returns the
/// values for the first requirement that can be satisfied.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
  /// Credentials for every scheme of one requirement, or `None` if any
  /// scheme cannot be satisfied.
  async fn get_credential(
    &self,
    requirement: &SecurityRequirement,
    options: &FetchOptions,
  ) -> Option<Vec<RequestAuthValue>>;

  async fn get_credentials(
    &self,
    requirements: &[SecurityRequirement],
    options: &FetchOptions,
  ) -> Vec<RequestAuthValue> {
    for requirement in requirements {
      if requirement.is_anonymous() {
        debug!("anonymous access allowed");
        return Vec::new();
      }
      if let Some(values) = self.get_credential(requirement, options).await {
        return values;
      }
    }

    if !requirements.is_empty() {
      warn!(
        source = options.source_name.as_deref().unwrap_or("-"),
        "no credentials satisfy the operation's security requirements"
      );
    }
    Vec::new()
  }
}

/// Legacy bulk entry point, kept for callers that pass a bare source name.
#[deprecated(note = "use CredentialProvider::get_credentials with FetchOptions")]
pub async fn resolve_credentials(
  provider: &dyn CredentialProvider,
  requirements: &[SecurityRequirement],
  source_name: Option<&str>,
) -> Vec<RequestAuthValue> {
  let options = FetchOptions {
    source_name: source_name.map(str::to_string),
  };
  provider.get_credentials(requirements, &options).await
}

/// Provider that never has credentials.
#[derive(Debug, Clone, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
  async fn get_credential(
    &self,
    _requirement: &SecurityRequirement,
    _options: &FetchOptions,
  ) -> Option<Vec<RequestAuthValue>> {
    None
  }
}

/// Provider backed by a fixed scheme name to value table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
  values: HashMap<String, RequestAuthValue>,
}

impl StaticCredentialProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_scheme(mut self, scheme: impl Into<String>, value: RequestAuthValue) -> Self {
    self.values.insert(scheme.into(), value);
    self
  }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
  async fn get_credential(
    &self,
    requirement: &SecurityRequirement,
    _options: &FetchOptions,
  ) -> Option<Vec<RequestAuthValue>> {
    requirement
      .schemes()
      .map(|scheme| self.values.get(scheme).cloned())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  fn requirement(schemes: &[&str]) -> SecurityRequirement {
    SecurityRequirement::new(schemes.iter().map(|s| (*s, Vec::new())))
  }

  fn provider() -> StaticCredentialProvider {
    StaticCredentialProvider::new()
      .with_scheme("apiKey", RequestAuthValue::header("X-API-Key", "secret"))
      .with_scheme("session", RequestAuthValue::cookie("sid", "s1"))
  }

  #[tokio::test]
  async fn test_first_satisfiable_requirement_wins() {
    let requirements = vec![requirement(&["oauth"]), requirement(&["apiKey", "session"])];
    let values = provider()
      .get_credentials(&requirements, &FetchOptions::default())
      .await;
    assert_eq!(
      values,
      vec![
        RequestAuthValue::header("X-API-Key", "secret"),
        RequestAuthValue::cookie("sid", "s1"),
      ]
    );
  }

  #[tokio::test]
  async fn test_all_schemes_of_a_requirement_needed() {
    let requirements = vec![requirement(&["apiKey", "oauth"])];
    let values = provider()
      .get_credentials(&requirements, &FetchOptions::default())
      .await;
    assert!(values.is_empty());
  }

  #[tokio::test]
  async fn test_anonymous_alternative() {
    let requirements = vec![SecurityRequirement::default(), requirement(&["apiKey"])];
    let values = provider()
      .get_credentials(&requirements, &FetchOptions::default())
      .await;
    assert!(values.is_empty());
  }

  struct RecordingProvider {
    seen: Mutex<Vec<FetchOptions>>,
  }

  #[async_trait]
  impl CredentialProvider for RecordingProvider {
    async fn get_credential(
      &self,
      _requirement: &SecurityRequirement,
      options: &FetchOptions,
    ) -> Option<Vec<RequestAuthValue>> {
      self.seen.lock().unwrap().push(options.clone());
      Some(vec![RequestAuthValue::query("api_key", "k")])
    }
  }

  #[tokio::test]
  #[allow(deprecated)]
  async fn test_legacy_resolve_forwards_source_name() {
    let provider = RecordingProvider {
      seen: Mutex::new(Vec::new()),
    };
    let values = resolve_credentials(&provider, &[requirement(&["apiKey"])], Some("petstore")).await;

    assert_eq!(values, vec![RequestAuthValue::query("api_key", "k")]);
    assert_eq!(
      provider.seen.lock().unwrap()[0].source_name.as_deref(),
      Some("petstore")
    );
  }

  #[tokio::test]
  async fn test_no_credentials() {
    let values = NoCredentials
      .get_credentials(&[requirement(&["apiKey"])], &FetchOptions::default())
      .await;
    assert!(values.is_empty());
  }
}
