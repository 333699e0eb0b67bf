use cobalt_config::RegexTransform;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

use crate::evaluator::to_text;

/// Run a value through a sequence of regex transforms.
///
/// Each stage matches against the string form of the previous stage's
/// output. A match replaces the value with the expanded `result` template; a
/// non-match passes the value through unchanged. A pattern that does not
/// compile is skipped.
pub fn apply_regex_transforms(value: Value, transforms: &[RegexTransform]) -> Value {
  let mut current = value;

  for transform in transforms {
    let regex = match Regex::new(&transform.pattern) {
      Ok(regex) => regex,
      Err(err) => {
        warn!(pattern = %transform.pattern, error = %err, "skipping invalid transform pattern");
        continue;
      }
    };

    let text = to_text(&current);
    match regex.captures(&text) {
      Some(captures) => current = Value::String(expand(&transform.result, &regex, &captures)),
      None => debug!(pattern = %transform.pattern, "transform did not match"),
    }
  }

  current
}

/// Expand `\<name>` and `\N` group references. `\\<name>` and `\\N` are
/// emitted as the literal `\<name>` and `\N`. A reference to a group the
/// pattern does not declare is kept as written.
fn expand(template: &str, regex: &Regex, captures: &Captures<'_>) -> String {
  let mut output = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(index) = rest.find('\\') {
    output.push_str(&rest[..index]);
    let after = &rest[index + 1..];

    if let Some(escaped) = after.strip_prefix('\\') {
      output.push('\\');
      if !(escaped.starts_with('<') || escaped.starts_with(|c: char| c.is_ascii_digit())) {
        output.push('\\');
      }
      rest = escaped;
      continue;
    }

    if let Some(named) = after.strip_prefix('<')
      && let Some(end) = named.find('>')
    {
      let name = &named[..end];
      if regex.capture_names().flatten().any(|declared| declared == name) {
        output.push_str(captures.name(name).map_or("", |m| m.as_str()));
      } else {
        warn!(pattern = %regex.as_str(), group = name, "transform references an unknown group");
        output.push_str(&rest[index..index + end + 3]);
      }
      rest = &named[end + 1..];
      continue;
    }

    let digits = after
      .char_indices()
      .take(2)
      .take_while(|(_, c)| c.is_ascii_digit())
      .count();
    if digits > 0 {
      let group: usize = after[..digits].parse().unwrap_or(0);
      if group < regex.captures_len() {
        output.push_str(captures.get(group).map_or("", |m| m.as_str()));
      } else {
        warn!(pattern = %regex.as_str(), group, "transform references an unknown group");
        output.push_str(&rest[index..index + 1 + digits]);
      }
      rest = &after[digits..];
      continue;
    }

    output.push('\\');
    rest = after;
  }

  output.push_str(rest);
  output
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  const URL: &str = "https://example.com/uploads/files/document.pdf";

  #[test]
  fn test_named_group() {
    let transforms = vec![RegexTransform::new(r".*/(?P<basename>[^/]+)$", r"\<basename>")];
    assert_eq!(
      apply_regex_transforms(json!(URL), &transforms),
      json!("document.pdf")
    );
  }

  #[test]
  fn test_chained_transforms() {
    let transforms = vec![
      RegexTransform::new(r".*/(?P<basename>[^/]+)$", r"\<basename>"),
      RegexTransform::new(r"(?P<name>.*?)\.(?P<ext>[^.]+)$", r"\<name>_processed.\<ext>"),
    ];
    assert_eq!(
      apply_regex_transforms(json!(URL), &transforms),
      json!("document_processed.pdf")
    );
  }

  #[test]
  fn test_numbered_groups() {
    let transforms = vec![RegexTransform::new(
      r"https://([^/]+)/([^/]+)/([^/]+)/(.+)",
      r"domain=\1, path1=\2, path2=\3, file=\4",
    )];
    assert_eq!(
      apply_regex_transforms(json!(URL), &transforms),
      json!("domain=example.com, path1=uploads, path2=files, file=document.pdf")
    );
  }

  #[test]
  fn test_escaped_references_stay_literal() {
    let transforms = vec![RegexTransform::new(
      r"https://([^/]+)/.*/(?P<file>[^/]+)$",
      r"Domain: \1, Literal: \\1, Named: \\<file>, File: \<file>",
    )];
    assert_eq!(
      apply_regex_transforms(json!(URL), &transforms),
      json!(r"Domain: example.com, Literal: \1, Named: \<file>, File: document.pdf")
    );
  }

  #[test]
  fn test_non_match_passes_value_through() {
    let transforms = vec![RegexTransform::new(r"^ftp://", "matched")];
    assert_eq!(apply_regex_transforms(json!(42), &transforms), json!(42));
  }

  #[test]
  fn test_non_string_input_is_coerced() {
    let transforms = vec![RegexTransform::new(r"^(\d)(\d)$", r"\2\1")];
    assert_eq!(apply_regex_transforms(json!(42), &transforms), json!("24"));
  }

  #[test]
  fn test_invalid_pattern_is_skipped() {
    let transforms = vec![
      RegexTransform::new(r"(unclosed", "x"),
      RegexTransform::new(r"^(.*)$", r"<\1>"),
    ];
    assert_eq!(apply_regex_transforms(json!("v"), &transforms), json!("<v>"));
  }

  #[test]
  fn test_no_transforms() {
    assert_eq!(apply_regex_transforms(json!({"a": 1}), &[]), json!({"a": 1}));
  }

  #[test]
  fn test_unknown_group_reference_is_kept() {
    let transforms = vec![RegexTransform::new(r"^(?P<head>\w+)-(\w+)$", r"\<tail>:\5:\<head>:\2")];
    assert_eq!(
      apply_regex_transforms(json!("left-right"), &transforms),
      json!(r"\<tail>:\5:left:right")
    );
  }

  #[test]
  fn test_optional_group_that_did_not_match_is_empty() {
    let transforms = vec![RegexTransform::new(r"^(a)?(b)$", r"[\1]\2")];
    assert_eq!(apply_regex_transforms(json!("b"), &transforms), json!("[]b"));
  }

  #[test]
  fn test_lone_backslash_is_kept() {
    let transforms = vec![RegexTransform::new(r"^(.*)$", r"C:\path\1")];
    assert_eq!(apply_regex_transforms(json!("x"), &transforms), json!(r"C:\pathx"));
  }
}
