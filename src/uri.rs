//! Read-only views of an inbound request.
//!
//! A [`RequestView`] exposes the request URI as seen by the immediate peer
//! (which may itself be a proxy), along with header lookup. Server-side requests
//! usually carry an origin-form URI (`/path?query`); the resolver completes those
//! from the `Host` header.

use std::borrow::Cow;

use http::HeaderName;
use thiserror::Error;

use crate::headers::HeaderLookup;

/// The request URI could not be broken into scheme, host and port.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    /// The URI (or `Host` header) did not parse.
    #[error("invalid request uri: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// An absolute URI was required, but the URI has no scheme or no authority.
    #[error("request uri is not absolute: {0}")]
    NotAbsolute(http::Uri),

    /// Neither the request URI nor the `Host` header name a host.
    #[error("request has no host")]
    MissingHost,
}

/// A read-only view of an inbound HTTP request.
pub trait RequestView: HeaderLookup {
    /// The request URI as received on the connection.
    fn uri(&self) -> Result<Cow<'_, http::Uri>, MalformedInputError>;
}

impl<B> RequestView for http::Request<B> {
    fn uri(&self) -> Result<Cow<'_, http::Uri>, MalformedInputError> {
        Ok(Cow::Borrowed(http::Request::uri(self)))
    }
}

impl RequestView for http::request::Parts {
    fn uri(&self) -> Result<Cow<'_, http::Uri>, MalformedInputError> {
        Ok(Cow::Borrowed(&self.uri))
    }
}

impl<T: RequestView + ?Sized> RequestView for &T {
    fn uri(&self) -> Result<Cow<'_, http::Uri>, MalformedInputError> {
        (**self).uri()
    }
}

/// A raw absolute URI string together with the request headers.
///
/// The URI is validated on construction: it must parse, and it must carry both
/// a scheme and an authority.
#[derive(Debug, Clone)]
pub struct AbsoluteRequest<'h> {
    uri: http::Uri,
    headers: &'h http::HeaderMap,
}

impl<'h> AbsoluteRequest<'h> {
    /// Create a view from an absolute URI and its headers.
    pub fn new(uri: &str, headers: &'h http::HeaderMap) -> Result<Self, MalformedInputError> {
        let uri: http::Uri = uri.parse()?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(MalformedInputError::NotAbsolute(uri));
        }

        Ok(Self { uri, headers })
    }

    /// The parsed absolute URI.
    pub fn absolute_uri(&self) -> &http::Uri {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &http::HeaderMap {
        self.headers
    }
}

impl HeaderLookup for AbsoluteRequest<'_> {
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str> {
        self.headers().header_values(name)
    }
}

impl RequestView for AbsoluteRequest<'_> {
    fn uri(&self) -> Result<Cow<'_, http::Uri>, MalformedInputError> {
        Ok(Cow::Borrowed(&self.uri))
    }
}
