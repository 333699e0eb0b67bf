//! Cobalt Schema
//!
//! Access to API documents and normalization of the JSON-schema fragments
//! they contain.
//!
//! # Resolution
//!
//! ```text
//! fragment ──► SchemaResolver ──► resolved tree
//!                │
//!                ├── $ref      inline target (cycle guard keeps a {"$ref"} marker)
//!                ├── allOf     resolve members, fold with merge_schemas
//!                ├── oneOf     resolve each branch, keep the array
//!                └── booleans  true ─► {}   false ─► {"not": {}}
//! ```
//!
//! Resolution never fails. A `$ref` that points nowhere is returned as-is
//! and logged.
//!
//! # Usage
//!
//! ```ignore
//! let document = ApiDocument::new(serde_json::from_str(&openapi_json)?);
//! let io = extract_operation_io(&document, "/pets/{petId}", "get", &ExtractOptions::default());
//! ```

mod depth;
mod document;
mod extract;
mod media;
mod merge;
mod resolve;

pub use depth::limit_depth;
pub use document::{ApiDocument, DocumentProvider, HTTP_METHODS, OperationLocation};
pub use extract::{ExtractOptions, OperationIo, extract_operation_io};
pub use media::MediaTypePreference;
pub use merge::merge_schemas;
pub use resolve::{SchemaResolver, resolve_schema};
