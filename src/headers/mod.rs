//! Reverse proxy forwarding headers.

pub mod forward;
pub(crate) mod parser;

pub use forward::{
    ForwardingHints, HeaderLookup, X_FORWARDED_HOST, X_FORWARDED_PORT, X_FORWARDED_PROTO,
};
