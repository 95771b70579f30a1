//! Parsers for the host and port pieces of forwarding header values.
//!
//! Hosts follow the `host` rule of [RFC 3986](https://www.rfc-editor.org/rfc/rfc3986#section-3.2.2):
//! a bracketed IPv6 literal, or a reg-name (which also covers IPv4 addresses).
//! `IPvFuture` literals are not accepted.

use std::net::Ipv6Addr;

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit0, digit1, satisfy};
use nom::combinator::{map_res, opt, recognize};
use nom::multi::many1;
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::{Finish, IResult, InputLength};

const fn is_ip_literal(c: char) -> bool {
    c.is_ascii_hexdigit() || c == ':' || c == '.'
}

const fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

const fn is_sub_delim(c: char) -> bool {
    matches!(
        c,
        '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
    )
}

const fn is_reg_name(c: char) -> bool {
    is_unreserved(c) || is_sub_delim(c)
}

fn ip_literal(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('['),
        map_res(take_while1(is_ip_literal), |addr: &str| {
            addr.parse::<Ipv6Addr>()
        }),
        char(']'),
    ))(input)
}

fn pct_encoded(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('%'),
        satisfy(|c| c.is_ascii_hexdigit()),
        satisfy(|c| c.is_ascii_hexdigit()),
    )))(input)
}

fn reg_name(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((take_while1(is_reg_name), pct_encoded))))(input)
}

/// The host at the start of `input`, leaving any `:port` suffix unparsed.
pub(crate) fn host(input: &str) -> IResult<&str, &str> {
    alt((ip_literal, reg_name))(input)
}

/// A decimal port number.
pub(crate) fn port(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |digits: &str| digits.parse::<u16>())(input)
}

/// Extract the host from `host[:port]`, discarding the port.
///
/// Anything after the host other than a `:` and digits makes the value invalid.
pub(crate) fn host_without_port(input: &str) -> Option<&str> {
    terminated(host, opt(preceded(char(':'), digit0)))(input)
        .no_tail()
        .ok()
}

/// Parse a complete port value, rejecting trailing input and port zero.
pub(crate) fn port_number(input: &str) -> Option<u16> {
    port(input).no_tail().ok().filter(|port| *port != 0)
}

pub(crate) trait NoTail<O, E> {
    fn no_tail(self) -> Result<O, E>;
}

impl<I, O> NoTail<O, nom::error::Error<I>> for IResult<I, O>
where
    I: InputLength,
{
    fn no_tail(self) -> Result<O, nom::error::Error<I>> {
        match self.finish() {
            Ok((i, o)) if i.input_len() == 0 => Ok(o),
            Ok((i, _)) => Err(nom::error::Error::new(i, nom::error::ErrorKind::Eof)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_names() {
        assert_eq!(host_without_port("example.com"), Some("example.com"));
        assert_eq!(
            host_without_port("public.example.com:9999"),
            Some("public.example.com")
        );
        assert_eq!(host_without_port("example.com:"), Some("example.com"));
        assert_eq!(host_without_port("caf%C3%A9.example"), Some("caf%C3%A9.example"));
        assert_eq!(host_without_port(":9999"), None);
        assert_eq!(host_without_port(""), None);
    }

    #[test]
    fn host_rejects_trailing_garbage() {
        assert_eq!(host_without_port("a:b:c"), None);
        assert_eq!(host_without_port("evil.com/p"), None);
        assert_eq!(host_without_port("evil.com/p?q"), None);
        assert_eq!(host_without_port("two words"), None);
        assert_eq!(host_without_port("example.com:80x"), None);
        assert_eq!(host_without_port("bad%zzhost"), None);
    }

    #[test]
    fn host_ip_literals() {
        assert_eq!(host_without_port("[::1]"), Some("[::1]"));
        assert_eq!(
            host_without_port("[2001:db8:cafe::17]:4711"),
            Some("[2001:db8:cafe::17]")
        );
        assert_eq!(host_without_port("192.168.0.1:80"), Some("192.168.0.1"));
        assert_eq!(host_without_port("[::1"), None);
        assert_eq!(host_without_port("[not:an:address]"), None);
        assert_eq!(host_without_port("[::1]x"), None);
    }

    #[test]
    fn port_values() {
        assert_eq!(port_number("8443"), Some(8443));
        assert_eq!(port_number("443"), Some(443));
        assert_eq!(port_number("0"), None);
        assert_eq!(port_number("65536"), None);
        assert_eq!(port_number("80a"), None);
        assert_eq!(port_number("-1"), None);
        assert_eq!(port_number(""), None);
    }
}
