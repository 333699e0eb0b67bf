//! Resolving a step's operation reference against the API documents.

use cobalt_auth::SecurityRequirement;
use cobalt_config::{OperationRef, Step};
use cobalt_schema::{
  ApiDocument, DocumentProvider, ExtractOptions, MediaTypePreference, OperationIo, SchemaResolver,
  extract_operation_io,
};
use cobalt_state::FailureReason;
use tracing::{debug, warn};

/// A step's target operation, located in its API document.
#[derive(Debug)]
pub struct ResolvedOperation<'a> {
  pub source: String,
  pub path: String,
  pub method: String,
  pub document: &'a ApiDocument,
  /// Flattened input/output shape, used to fill in request details.
  pub io: OperationIo,
  pub security: Vec<SecurityRequirement>,
  /// Preferred request body media type declared by the operation.
  pub request_media_type: Option<String>,
}

/// Locate the operation a step calls.
///
/// A source-qualified reference searches only that source; otherwise every
/// source is searched in name order and the first match wins.
pub fn resolve_operation<'a>(
  documents: &'a dyn DocumentProvider,
  step: &Step,
  media_types: &MediaTypePreference,
) -> Result<ResolvedOperation<'a>, FailureReason> {
  let reference = step.operation().map_err(|err| FailureReason::InvalidRequest {
    message: err.to_string(),
  })?;

  let sources = match reference.source() {
    Some(source) => vec![source.to_string()],
    None => documents.source_names(),
  };

  for source in sources {
    let Some(document) = documents.document(&source) else {
      warn!(source = %source, "unknown source description");
      continue;
    };

    let location = match &reference {
      OperationRef::Id { operation_id, .. } => document
        .find_operation(operation_id)
        .map(|location| (location.path, location.method)),
      OperationRef::Path { path, method, .. } => document
        .operation(path, method)
        .map(|_| (path.clone(), method.to_lowercase())),
    };
    let Some((path, method)) = location else {
      continue;
    };

    debug!(source = %source, path = %path, method = %method, "resolved operation");
    return Ok(located(document, source, path, method, media_types));
  }

  Err(FailureReason::OperationNotFound {
    operation: reference.to_string(),
  })
}

fn located<'a>(
  document: &'a ApiDocument,
  source: String,
  path: String,
  method: String,
  media_types: &MediaTypePreference,
) -> ResolvedOperation<'a> {
  let options = ExtractOptions {
    media_types: media_types.clone(),
    ..ExtractOptions::default()
  };
  let io = extract_operation_io(document, &path, &method, &options).unwrap_or_else(|| OperationIo {
    inputs: serde_json::json!({"type": "object", "properties": {}, "required": []}),
    outputs: serde_json::json!({}),
    security_requirements: serde_json::json!([]),
    parameter_locations: Default::default(),
  });

  let security = document
    .security_for(&path, &method)
    .into_iter()
    .filter_map(|requirement| match serde_json::from_value(requirement) {
      Ok(requirement) => Some(requirement),
      Err(err) => {
        warn!(error = %err, "ignoring malformed security requirement");
        None
      }
    })
    .collect();

  let request_media_type = request_media_type(document, &path, &method, media_types);

  ResolvedOperation {
    source,
    path,
    method,
    document,
    io,
    security,
    request_media_type,
  }
}

/// The preferred declared request body media type, falling back to the
/// first declared one.
fn request_media_type(
  document: &ApiDocument,
  path: &str,
  method: &str,
  media_types: &MediaTypePreference,
) -> Option<String> {
  let body = document.operation(path, method)?.get("requestBody")?;
  let content = SchemaResolver::new(document).dereference(body)?.get("content")?;

  media_types
    .select(content)
    .map(|(media_type, _)| media_type.to_string())
    .or_else(|| content.as_object()?.keys().next().cloned())
}
