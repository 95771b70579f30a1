//! Resolve the external URL of a request relayed by reverse proxies.
//!
//! The external origin is built one piece at a time, each piece falling back to
//! what the connection itself reports:
//!
//! 1. The scheme comes from `X-Forwarded-Proto`, else the request URI.
//! 2. The host comes from `X-Forwarded-Host`, else the request URI (or `Host` header).
//!    Any `:port` suffix on the host is dropped.
//! 3. The port comes from `X-Forwarded-Port`. Without it, the connection port is
//!    used when the proxies did not move the request to another scheme or host,
//!    and the default port for the scheme otherwise.
//!
//! The port is omitted from the rendered URL when it is the default for the scheme.

use std::fmt;

use http::uri::{Authority, Scheme};

use crate::headers::parser::host_without_port;
use crate::headers::{ForwardingHints, HeaderLookup};
use crate::uri::{AbsoluteRequest, MalformedInputError, RequestView};

/// Resolve the external URL for `target_path`, given the absolute URI of the
/// request as seen on the connection and the request headers.
///
/// All forwarding headers are trusted. Use [`ForwardedUrlResolver`] to restrict
/// which headers are honored.
pub fn resolve_url(
    absolute_uri: &str,
    headers: &http::HeaderMap,
    target_path: &str,
) -> Result<String, MalformedInputError> {
    let request = AbsoluteRequest::new(absolute_uri, headers)?;
    ForwardedUrlResolver::default().resolve_url(&request, target_path)
}

fn default_port(scheme: &Scheme) -> u16 {
    if *scheme == Scheme::HTTPS {
        443
    } else {
        80
    }
}

fn lowercase_scheme(scheme: &Scheme) -> Result<Scheme, MalformedInputError> {
    Ok(Scheme::try_from(scheme.as_str().to_ascii_lowercase().as_str())?)
}

/// The origin a client used to reach this service: scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalOrigin {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl ExternalOrigin {
    /// Create a new origin. The scheme is lowercased, and any `:port` suffix is
    /// stripped from `host`.
    pub fn new(scheme: Scheme, host: &str, port: u16) -> Result<Self, MalformedInputError> {
        let host = host_without_port(host).ok_or(MalformedInputError::MissingHost)?;
        Ok(Self {
            scheme: lowercase_scheme(&scheme)?,
            host: host.to_owned(),
            port,
        })
    }

    /// The external scheme.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The external host name, without a port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The external port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the port is the default for the scheme, and so is left out of URLs.
    pub fn is_default_port(&self) -> bool {
        (self.scheme == Scheme::HTTPS && self.port == 443)
            || (self.scheme == Scheme::HTTP && self.port == 80)
    }

    /// The absolute URL of `target_path` on this origin.
    ///
    /// A leading `/` is added to `target_path` when it is missing.
    pub fn url_for(&self, target_path: &str) -> String {
        let mut url = self.to_string();
        if !target_path.starts_with('/') {
            url.push('/');
        }
        url.push_str(target_path);
        url
    }
}

impl fmt::Display for ExternalOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.is_default_port() {
            write!(f, ":{}", self.port)?;
        }
        Ok(())
    }
}

/// The scheme, host and port reported by the connection itself.
struct ConnectionOrigin {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
}

impl ConnectionOrigin {
    fn new<R>(request: &R, default_scheme: &Scheme) -> Result<Self, MalformedInputError>
    where
        R: RequestView + ?Sized,
    {
        let uri = request.uri()?;

        let scheme = lowercase_scheme(uri.scheme().unwrap_or(default_scheme))?;

        let authority = match uri.authority() {
            Some(authority) => authority.clone(),
            None => match request.header(&http::header::HOST).map(str::trim) {
                Some(host) if !host.is_empty() => Authority::try_from(host)?,
                _ => return Err(MalformedInputError::MissingHost),
            },
        };

        let host = host_without_port(authority.host()).ok_or(MalformedInputError::MissingHost)?;

        Ok(Self {
            scheme,
            host: host.to_owned(),
            port: authority.port_u16().filter(|port| *port != 0),
        })
    }
}

/// Resolves external URLs, honoring the configured forwarding headers.
///
/// Only trust forwarding headers set by a proxy you control: anything else lets
/// clients choose the URLs this service hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedUrlResolver {
    /// Whether to honor `X-Forwarded-Proto`.
    pub proto: bool,

    /// Whether to honor `X-Forwarded-Host`.
    pub host: bool,

    /// Whether to honor `X-Forwarded-Port`.
    pub port: bool,

    /// The scheme assumed for requests whose URI does not carry one.
    pub default_scheme: Scheme,
}

impl Default for ForwardedUrlResolver {
    fn default() -> Self {
        Self {
            proto: true,
            host: true,
            port: true,
            default_scheme: Scheme::HTTP,
        }
    }
}

impl ForwardedUrlResolver {
    /// Create a resolver which honors all forwarding headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver which ignores all forwarding headers.
    pub fn untrusted() -> Self {
        Self {
            proto: false,
            host: false,
            port: false,
            ..Self::default()
        }
    }

    /// Set the scheme assumed for requests whose URI does not carry one.
    pub fn with_default_scheme(mut self, scheme: Scheme) -> Self {
        self.default_scheme = scheme;
        self
    }

    /// The forwarding hints this resolver will honor for `headers`.
    pub fn hints<H>(&self, headers: &H) -> ForwardingHints
    where
        H: HeaderLookup + ?Sized,
    {
        if !(self.proto || self.host || self.port) {
            return ForwardingHints::default();
        }

        let mut hints = ForwardingHints::new(headers);
        if !self.proto {
            hints.proto = None;
        }
        if !self.host {
            hints.host = None;
        }
        if !self.port {
            hints.port = None;
        }
        hints
    }

    /// Resolve the external origin of a request.
    pub fn resolve_origin<R>(&self, request: &R) -> Result<ExternalOrigin, MalformedInputError>
    where
        R: RequestView + ?Sized,
    {
        let connection = ConnectionOrigin::new(request, &self.default_scheme)?;
        let hints = self.hints(request);

        let connection_port = if hints.rewrites_origin() {
            None
        } else {
            connection.port
        };

        let scheme = hints.proto.unwrap_or(connection.scheme);
        let host = hints.host.unwrap_or(connection.host);
        let port = hints
            .port
            .or(connection_port)
            .unwrap_or_else(|| default_port(&scheme));

        let origin = ExternalOrigin { scheme, host, port };
        tracing::trace!(%origin, "resolved external origin");
        Ok(origin)
    }

    /// Resolve the external URL for `target_path` on the origin of a request.
    pub fn resolve_url<R>(
        &self,
        request: &R,
        target_path: &str,
    ) -> Result<String, MalformedInputError>
    where
        R: RequestView + ?Sized,
    {
        Ok(self.resolve_origin(request)?.url_for(target_path))
    }
}

/// A layer which resolves the [`ExternalOrigin`] of each request and stores it
/// in the request extensions.
///
/// Requests whose origin cannot be resolved are passed on without the extension.
#[derive(Debug, Clone, Default)]
pub struct ExternalOriginLayer {
    resolver: ForwardedUrlResolver,
}

impl ExternalOriginLayer {
    /// Create a new `ExternalOriginLayer` with the given resolver.
    pub fn new(resolver: ForwardedUrlResolver) -> Self {
        Self { resolver }
    }
}

impl From<ForwardedUrlResolver> for ExternalOriginLayer {
    fn from(resolver: ForwardedUrlResolver) -> Self {
        Self::new(resolver)
    }
}

impl<S> tower::layer::Layer<S> for ExternalOriginLayer {
    type Service = ExternalOriginService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ExternalOriginService {
            resolver: self.resolver.clone(),
            service,
        }
    }
}

/// A service which resolves the [`ExternalOrigin`] of each request.
#[derive(Debug, Clone)]
pub struct ExternalOriginService<S> {
    resolver: ForwardedUrlResolver,
    service: S,
}

impl<S> ExternalOriginService<S> {
    /// Create a new `ExternalOriginService` with the given resolver
    pub fn new(resolver: ForwardedUrlResolver, service: S) -> Self {
        Self { resolver, service }
    }

    /// Create a new `ExternalOriginLayer` with the given resolver
    pub fn layer(resolver: ForwardedUrlResolver) -> ExternalOriginLayer {
        ExternalOriginLayer::new(resolver)
    }

    /// The resolver used by this service.
    pub fn resolver(&self) -> &ForwardedUrlResolver {
        &self.resolver
    }

    /// Unwrap the inner service
    pub fn into_inner(self) -> S {
        self.service
    }

    fn set_origin<B>(&self, req: &mut http::Request<B>) {
        match self.resolver.resolve_origin(&*req) {
            Ok(origin) => {
                req.extensions_mut().insert(origin);
            }
            Err(error) => {
                tracing::warn!(%error, uri = %req.uri(), "unable to resolve external origin");
            }
        }
    }
}

impl<S, B> tower::Service<http::Request<B>> for ExternalOriginService<S>
where
    S: tower::Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        self.set_origin(&mut req);

        self.service.call(req)
    }

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }
}
