//! # Forwarded URL
//!
//! `forwarded-url` rebuilds the URL a client actually used to reach a service
//! sitting behind one or more reverse proxies, using the `X-Forwarded-Proto`,
//! `X-Forwarded-Host` and `X-Forwarded-Port` headers. It also provides small
//! helpers for updating session attributes with explicit set-or-clear semantics.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod headers;
pub mod resolve;
pub mod session;
pub mod uri;

pub use resolve::{
    resolve_url, ExternalOrigin, ExternalOriginLayer, ExternalOriginService, ForwardedUrlResolver,
};
pub use session::{Session, SessionExt, SessionUpdate};
pub use uri::{AbsoluteRequest, MalformedInputError, RequestView};
