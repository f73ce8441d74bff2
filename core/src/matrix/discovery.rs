//! Homeserver discovery
//!
//! Turns a Matrix server name into the base URL of its federation API,
//! following `/.well-known/matrix/server` delegation.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// Port used when neither the server name nor its delegation names one
pub const DEFAULT_FEDERATION_PORT: u16 = 8448;

const MAX_SERVER_NAME_LEN: usize = 255;

/// A parsed Matrix server name: `host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerName {
    /// Hostname, IPv4 literal, or bracketed IPv6 literal
    pub host: String,
    pub port: Option<u16>,
}

impl ServerName {
    pub fn is_ip_literal(&self) -> bool {
        self.host.starts_with('[') || self.host.parse::<Ipv4Addr>().is_ok()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// Parse and validate a server name
///
/// Rejects anything that could smuggle a path, query or userinfo into the
/// URLs built from it.
pub fn parse_server_name(name: &str) -> Result<ServerName> {
    if name.is_empty() {
        return Err(ApiError::invalid_request("server name cannot be empty"));
    }

    if name.len() > MAX_SERVER_NAME_LEN {
        return Err(ApiError::invalid_request("server name too long"));
    }

    let (host, port) = if let Some(rest) = name.strip_prefix('[') {
        let (addr, after) = rest
            .split_once(']')
            .ok_or_else(|| ApiError::invalid_request("unterminated IPv6 literal in server name"))?;
        addr.parse::<Ipv6Addr>()
            .map_err(|_| ApiError::invalid_request("invalid IPv6 literal in server name"))?;

        let port = match after {
            "" => None,
            _ => Some(
                after
                    .strip_prefix(':')
                    .ok_or_else(|| ApiError::invalid_request("invalid server name"))?,
            ),
        };
        (format!("[{}]", addr), port)
    } else {
        let (host, port) = match name.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (name, None),
        };

        if host.is_empty() {
            return Err(ApiError::invalid_request("server name has an empty host"));
        }

        for c in host.chars() {
            if !c.is_ascii_alphanumeric() && c != '.' && c != '-' {
                return Err(ApiError::invalid_request(format!(
                    "server name contains invalid character: '{}'",
                    c
                )));
            }
        }
        (host.to_ascii_lowercase(), port)
    };

    let port = match port {
        Some(port) => Some(parse_port(port)?),
        None => None,
    };

    Ok(ServerName { host, port })
}

fn parse_port(port: &str) -> Result<u16> {
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::invalid_request("server name has an invalid port"));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ApiError::invalid_request("server name has an invalid port")),
        Ok(port) => Ok(port),
    }
}

/// Where a homeserver's federation API is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationEndpoint {
    /// e.g. `https://matrix.example.org:8448`
    pub base_url: String,
}

impl FederationEndpoint {
    fn for_name(name: &ServerName) -> Self {
        Self {
            base_url: format!(
                "https://{}:{}",
                name.host,
                name.port.unwrap_or(DEFAULT_FEDERATION_PORT)
            ),
        }
    }
}

#[derive(Deserialize)]
struct WellKnownServer {
    #[serde(rename = "m.server")]
    server: String,
}

/// Resolve the federation endpoint for a server name
///
/// IP literals and names with an explicit port are used as-is. Otherwise
/// the server's well-known delegation is consulted; any failure there falls
/// back to the server name on the default port.
pub async fn resolve_server(server_name: &str, http: &dyn HttpClient) -> Result<FederationEndpoint> {
    let name = parse_server_name(server_name)?;

    if name.is_ip_literal() || name.port.is_some() {
        return Ok(FederationEndpoint::for_name(&name));
    }

    let endpoint = match fetch_delegation(&name.host, http).await {
        Some(delegated) => {
            debug!(server_name = %name, delegated = %delegated, "using well-known delegation");
            FederationEndpoint::for_name(&delegated)
        }
        None => FederationEndpoint::for_name(&name),
    };

    Ok(endpoint)
}

/// Fetch `/.well-known/matrix/server`, returning the delegated server name if usable
async fn fetch_delegation(host: &str, http: &dyn HttpClient) -> Option<ServerName> {
    let url = format!("https://{}/.well-known/matrix/server", host);

    let response = match http.get(&url, &[("Accept", "application/json")]).await {
        Ok(response) => response,
        Err(e) => {
            debug!(host, error = %e, "well-known lookup failed");
            return None;
        }
    };

    if response.status != 200 {
        debug!(host, status = response.status, "no well-known delegation");
        return None;
    }

    let well_known: WellKnownServer = match response.json() {
        Ok(doc) => doc,
        Err(e) => {
            debug!(host, error = %e, "invalid well-known document");
            return None;
        }
    };

    parse_server_name(&well_known.server).ok()
}
