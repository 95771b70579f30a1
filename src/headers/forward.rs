//! The de-facto standard `X-Forwarded-*` headers.
//!
//! Reverse proxies set these headers to tell the backend which scheme, host and
//! port the client originally used. Only the upstream-most value is read: when a
//! header carries a comma-separated list, the first entry is the one closest to
//! the client.

use http::uri::Scheme;
use http::HeaderName;

use super::parser::{host_without_port, port_number};

/// The `X-Forwarded-Host` header, a de-facto standard header for identifying the original host requested by the client in the `Host` HTTP request header.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// The `X-Forwarded-Proto` header, a de-facto standard header for identifying the protocol (HTTP or HTTPS) that a client used to connect to your proxy or load balancer.
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// The `X-Forwarded-Port` header, a de-facto standard header for identifying the port that a client used to connect to your proxy or load balancer.
pub const X_FORWARDED_PORT: HeaderName = HeaderName::from_static("x-forwarded-port");

/// Case-insensitive lookup of request header values.
///
/// Values that are not visible ASCII are skipped.
pub trait HeaderLookup {
    /// All values of the header `name`, in the order they were received.
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str>;

    /// The first value of the header `name`, if present.
    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.header_values(name).next()
    }
}

impl HeaderLookup for http::HeaderMap {
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str> {
        self.get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }
}

impl<B> HeaderLookup for http::Request<B> {
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str> {
        self.headers().header_values(name)
    }
}

impl HeaderLookup for http::request::Parts {
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str> {
        self.headers.header_values(name)
    }
}

impl<T: HeaderLookup + ?Sized> HeaderLookup for &T {
    fn header_values(&self, name: &HeaderName) -> impl Iterator<Item = &str> {
        (**self).header_values(name)
    }
}

/// The first non-empty entry across all lines of a header, each of which may
/// hold a comma-separated list.
fn first_entry<'h, H>(headers: &'h H, name: &HeaderName) -> Option<&'h str>
where
    H: HeaderLookup + ?Sized,
{
    headers
        .header_values(name)
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

/// Overrides for the external scheme, host and port, as reported by proxies.
///
/// Each field is `None` when the header is absent, empty, or does not hold a valid value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardingHints {
    /// The scheme from `X-Forwarded-Proto`, lowercased.
    pub proto: Option<Scheme>,

    /// The host from `X-Forwarded-Host`, without any port suffix.
    pub host: Option<String>,

    /// The port from `X-Forwarded-Port`.
    pub port: Option<u16>,
}

impl ForwardingHints {
    /// Read the forwarding headers from a request.
    pub fn new<H>(headers: &H) -> Self
    where
        H: HeaderLookup + ?Sized,
    {
        let proto = first_entry(headers, &X_FORWARDED_PROTO).and_then(|value| {
            let scheme = Scheme::try_from(value.to_ascii_lowercase().as_str());
            if scheme.is_err() {
                tracing::debug!(value, "ignoring invalid {X_FORWARDED_PROTO} header");
            }
            scheme.ok()
        });

        let host = first_entry(headers, &X_FORWARDED_HOST).and_then(|value| {
            let host = host_without_port(value);
            if host.is_none() {
                tracing::debug!(value, "ignoring invalid {X_FORWARDED_HOST} header");
            }
            host.map(str::to_owned)
        });

        let port = first_entry(headers, &X_FORWARDED_PORT).and_then(|value| {
            let port = port_number(value);
            if port.is_none() {
                tracing::debug!(value, "ignoring invalid {X_FORWARDED_PORT} header");
            }
            port
        });

        Self { proto, host, port }
    }

    /// Check if the hints move the request to a different origin
    /// (scheme or host), which makes the connection port meaningless.
    pub fn rewrites_origin(&self) -> bool {
        self.proto.is_some() || self.host.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarding_headers(pairs: &[(&str, &str)]) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        headers
    }

    #[test]
    fn no_headers() {
        let hints = ForwardingHints::new(&http::HeaderMap::new());
        assert_eq!(hints, ForwardingHints::default());
        assert!(!hints.rewrites_origin());
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let headers = forwarding_headers(&[
            ("X-Forwarded-Proto", "https"),
            ("X-FORWARDED-HOST", "public.example.com"),
            ("x-forwarded-port", "8443"),
        ]);

        let hints = ForwardingHints::new(&headers);
        assert_eq!(hints.proto, Some(Scheme::HTTPS));
        assert_eq!(hints.host.as_deref(), Some("public.example.com"));
        assert_eq!(hints.port, Some(8443));
        assert!(hints.rewrites_origin());
    }

    #[test]
    fn empty_values_are_absent() {
        let headers = forwarding_headers(&[
            ("x-forwarded-proto", ""),
            ("x-forwarded-host", "  "),
            ("x-forwarded-port", ""),
        ]);

        assert_eq!(ForwardingHints::new(&headers), ForwardingHints::default());
    }

    #[test]
    fn first_entry_of_list() {
        let headers = forwarding_headers(&[
            ("x-forwarded-proto", "https, http"),
            ("x-forwarded-host", "public.example.com, internal"),
            ("x-forwarded-port", " 443 ,8080"),
        ]);

        let hints = ForwardingHints::new(&headers);
        assert_eq!(hints.proto, Some(Scheme::HTTPS));
        assert_eq!(hints.host.as_deref(), Some("public.example.com"));
        assert_eq!(hints.port, Some(443));
    }

    #[test]
    fn uppercase_proto() {
        let headers = forwarding_headers(&[("x-forwarded-proto", "HTTPS")]);
        assert_eq!(ForwardingHints::new(&headers).proto, Some(Scheme::HTTPS));
    }

    #[test]
    fn embedded_host_port_is_discarded() {
        let headers = forwarding_headers(&[("x-forwarded-host", "public.example.com:9999")]);

        let hints = ForwardingHints::new(&headers);
        assert_eq!(hints.host.as_deref(), Some("public.example.com"));
        assert_eq!(hints.port, None);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let headers = forwarding_headers(&[
            ("x-forwarded-proto", "ht tp"),
            ("x-forwarded-host", ":9999"),
            ("x-forwarded-port", "eighty"),
        ]);

        assert_eq!(ForwardingHints::new(&headers), ForwardingHints::default());

        for host in ["[::1", "evil.com/p", "evil.com/p?q", "host name", "a:b:c"] {
            let headers = forwarding_headers(&[("x-forwarded-host", host)]);
            assert_eq!(ForwardingHints::new(&headers).host, None, "{host:?}");
        }
    }

    #[test]
    fn empty_first_line_uses_later_line() {
        let headers = forwarding_headers(&[
            ("x-forwarded-proto", ""),
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", " , public.example.com"),
        ]);

        let hints = ForwardingHints::new(&headers);
        assert_eq!(hints.proto, Some(Scheme::HTTPS));
        assert_eq!(hints.host.as_deref(), Some("public.example.com"));
    }

    #[test]
    fn header_values_in_order() {
        let headers = forwarding_headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-proto", "http"),
        ]);

        let values: Vec<_> = headers.header_values(&X_FORWARDED_PROTO).collect();
        assert_eq!(values, ["https", "http"]);
        assert_eq!(headers.header(&X_FORWARDED_PROTO), Some("https"));
    }
}
