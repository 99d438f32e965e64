//! # HTTP Access Layer
//!
//! Thin wrapper over `reqwest` shared by every provider. One [`HttpClient`] is
//! owned per provider instance and carries:
//!
//! - the provider's base URL and shared headers, read at send time so a cookie
//!   refreshed in the background is picked up by the very next request
//! - an optional `timestamp` query parameter some backends require
//! - a bounded redirect follower for 301/302 chains ([`redirect`])
//! - a pluggable response classifier turning backend-reported failures into
//!   [`ApiError::Backend`](crate::error::ApiError::Backend)
//! - strict JSON decoding that never yields a silent null
//!
//! ```text
//! provider op ──> HttpClient ──> RedirectPolicy ──> reqwest::Client ──> backend
//!                     │
//!                     └── classifier(RawResponse) -> Option<ApiError>
//! ```

mod client;
pub mod redirect;

pub use client::{BodyKind, DEFAULT_TIMEOUT, HttpClient, HttpClientBuilder, RawResponse, ResponseClassifier};
pub use redirect::{MAX_REDIRECTS, RedirectPolicy};
