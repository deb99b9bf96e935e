//! Listening endpoint parsing.
//!
//! Endpoints are configured as a comma-separated list of tokens of the form
//! `[[ip]:]port[s]`:
//!
//! ```text
//! 80                    any address, port 80
//! 443s                  any address, port 443, TLS required
//! 10.11.12.13:80        explicit IPv4 literal
//! [10.11.12.13]:8443s   bracketed literal, TLS required
//! ```
//!
//! Only dotted-decimal IPv4 literals are accepted. Hostnames are rejected;
//! resolving them belongs to whoever opens the sockets.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::{Error, Result};

/// A parsed listening endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    pub addr: SocketAddrV4,
    /// Set by a trailing `s` on the token.
    pub tls: bool,
}

impl EndpointSpec {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Port as it appears on the wire (network byte order).
    pub fn port_network_order(&self) -> [u8; 2] {
        self.addr.port().to_be_bytes()
    }

    pub fn is_any_address(&self) -> bool {
        self.addr.ip().is_unspecified()
    }
}

/// Parses a dotted-decimal IPv4 literal such as `10.11.12.13`.
pub fn parse_ipv4_literal(text: &str) -> Result<Ipv4Addr> {
    text.parse::<Ipv4Addr>()
        .map_err(|_| Error::address(text, "not a dotted-decimal IPv4 literal"))
}

/// Parses one endpoint token.
///
/// Surrounding whitespace and a trailing list comma are ignored. A colon
/// must be preceded by an address: `":80"` fails while `"80"` binds the
/// any-address.
pub fn parse_endpoint_token(token: &str) -> Result<EndpointSpec> {
    let trimmed = token.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();

    let (body, tls) = match trimmed.strip_suffix('s') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let (ip, port_text) = match body.rsplit_once(':') {
        Some((host, port)) => {
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            if host.is_empty() {
                return Err(Error::address(token, "empty address before ':'"));
            }
            let ip = parse_ipv4_literal(host).map_err(|_| {
                Error::address(token, "address must be a dotted-decimal IPv4 literal")
            })?;
            (ip, port)
        }
        None => (Ipv4Addr::UNSPECIFIED, body),
    };

    let port = parse_port(port_text).ok_or_else(|| Error::address(token, "invalid port"))?;

    Ok(EndpointSpec {
        addr: SocketAddrV4::new(ip, port),
        tls,
    })
}

/// Parses a comma-separated endpoint list. Empty entries are skipped but at
/// least one endpoint is required.
pub fn parse_endpoint_list(list: &str) -> Result<Vec<EndpointSpec>> {
    let endpoints = list
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse_endpoint_token)
        .collect::<Result<Vec<_>>>()?;

    if endpoints.is_empty() {
        return Err(Error::address(list, "no endpoints listed"));
    }
    Ok(endpoints)
}

fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
