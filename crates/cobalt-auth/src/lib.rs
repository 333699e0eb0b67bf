//! Cobalt Auth
//!
//! Credentials are resolved outside the engine. The engine passes an
//! operation's security requirements to a [`CredentialProvider`] and merges
//! the returned [`RequestAuthValue`]s into the outgoing request.
//!
//! A requirement list is an OR of maps; each map is an AND of schemes:
//!
//! ```text
//! [ {oauth: [read]}, {apiKey: [], session: []} ]
//!     ^ either this      ^ or both of these
//! ```

mod provider;
mod requirement;

#[allow(deprecated)]
pub use provider::resolve_credentials;
pub use provider::{CredentialProvider, FetchOptions, NoCredentials, StaticCredentialProvider};
pub use requirement::{AuthLocation, RequestAuthValue, SecurityRequirement};
