//! Protocol inference from port names
//!
//! A port named `<protocol>` or `<protocol>-<suffix>` speaks that protocol.
//! Anything else is proxied as opaque TCP.

use crate::model::{Protocol, TransportProtocol};

/// Name prefixes recognised as L7 protocols
///
/// Tokens that extend another token with `-` must come first: `grpc-web`
/// would otherwise match as `grpc` with suffix `web`.
const PROTOCOL_TOKENS: &[(&str, Protocol)] = &[
    ("grpc-web", Protocol::GrpcWeb),
    ("grpc", Protocol::Grpc),
    ("http2", Protocol::Http2),
    ("https", Protocol::Https),
    ("http", Protocol::Http),
    ("mongo", Protocol::Mongo),
    ("mysql", Protocol::MySql),
    ("redis", Protocol::Redis),
];

/// Infer the L7 protocol of a port from its name and transport protocol
///
/// Only TCP ports are inferred from their name: UDP ports are always UDP
/// and SCTP ports are opaque TCP. Matching is case-insensitive; `httptest`
/// does not match `http` because the token must be followed by `-` or the
/// end of the name.
pub fn convert_protocol(name: &str, transport: TransportProtocol) -> Protocol {
    match transport {
        TransportProtocol::Udp => return Protocol::Udp,
        TransportProtocol::Sctp => return Protocol::Tcp,
        TransportProtocol::Tcp => {}
    }

    PROTOCOL_TOKENS
        .iter()
        .find(|(token, _)| matches_token(name, token))
        .map(|(_, protocol)| *protocol)
        .unwrap_or(Protocol::Tcp)
}

fn matches_token(name: &str, token: &str) -> bool {
    let Some(head) = name.get(..token.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(token) {
        return false;
    }
    let rest = &name[token.len()..];
    rest.is_empty() || rest.starts_with('-')
}
