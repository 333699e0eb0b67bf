use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered list of media types accepted for request and response bodies.
///
/// The first entry found in an operation's `content` map wins. Keys carrying
/// parameters (`application/json; charset=utf-8`) match on their base type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTypePreference(Vec<String>);

impl Default for MediaTypePreference {
  fn default() -> Self {
    Self(vec![
      "application/json".to_string(),
      "application/x-www-form-urlencoded".to_string(),
    ])
  }
}

impl MediaTypePreference {
  pub fn new<I, S>(media_types: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(media_types.into_iter().map(Into::into).collect())
  }

  pub fn media_types(&self) -> &[String] {
    &self.0
  }

  /// Pick the preferred entry of a `content` map.
  ///
  /// Returns the content key as written together with its media type object.
  pub fn select<'c>(&self, content: &'c Value) -> Option<(&'c str, &'c Value)> {
    let content = content.as_object()?;
    self.0.iter().find_map(|preferred| {
      content
        .iter()
        .find(|(key, _)| base_type(key).eq_ignore_ascii_case(preferred))
        .map(|(key, media)| (key.as_str(), media))
    })
  }

  pub fn supports(&self, media_type: &str) -> bool {
    let base = base_type(media_type);
    self.0.iter().any(|m| m.eq_ignore_ascii_case(base))
  }
}

/// The media type without parameters.
pub(crate) fn base_type(media_type: &str) -> &str {
  media_type.split(';').next().unwrap_or(media_type).trim()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_prefers_json_over_form() {
    let content = json!({
      "application/x-www-form-urlencoded": {"schema": {"type": "object"}},
      "application/json": {"schema": {"type": "string"}}
    });
    let (key, media) = MediaTypePreference::default().select(&content).unwrap();
    assert_eq!(key, "application/json");
    assert_eq!(media["schema"]["type"], "string");
  }

  #[test]
  fn test_falls_back_to_form() {
    let content = json!({
      "text/plain": {},
      "application/x-www-form-urlencoded": {"schema": {"type": "object"}}
    });
    let (key, _) = MediaTypePreference::default().select(&content).unwrap();
    assert_eq!(key, "application/x-www-form-urlencoded");
  }

  #[test]
  fn test_matches_base_type_with_parameters() {
    let content = json!({"application/json; charset=utf-8": {"schema": {}}});
    let (key, _) = MediaTypePreference::default().select(&content).unwrap();
    assert_eq!(key, "application/json; charset=utf-8");
  }

  #[test]
  fn test_unsupported_or_empty_content() {
    let preference = MediaTypePreference::default();
    assert!(preference.select(&json!({"application/xml": {}})).is_none());
    assert!(preference.select(&json!({})).is_none());
  }

  #[test]
  fn test_custom_order() {
    let preference = MediaTypePreference::new(["text/plain", "application/json"]);
    let content = json!({"application/json": {}, "text/plain": {}});
    assert_eq!(preference.select(&content).unwrap().0, "text/plain");
    assert!(preference.supports("TEXT/PLAIN; charset=utf-8"));
  }
}
