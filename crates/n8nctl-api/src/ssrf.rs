//! SSRF guard for webhook URLs.
//!
//! Webhook triggers dispatch to arbitrary user-supplied URLs, so the target
//! is resolved and validated before any connection: loopback, RFC-1918
//! private ranges, link-local (including the 169.254.169.254 cloud metadata
//! endpoint and its analogs), CGNAT, and their IPv6 counterparts are
//! refused. The caller re-resolves immediately before connect and pins the
//! socket addresses, so a DNS answer cannot change between check and use.

use std::net::{IpAddr, SocketAddr};

use url::Url;

use crate::error::{ApiError, Result};

/// Guard strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardMode {
    /// Block loopback, private, link-local, CGNAT, metadata, and special
    /// ranges (default).
    #[default]
    Strict,
    /// Block loopback, link-local, and metadata endpoints only.
    Moderate,
    /// No address filtering; scheme checks still apply.
    Off,
}

impl GuardMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Some(GuardMode::Strict),
            "moderate" => Some(GuardMode::Moderate),
            "off" => Some(GuardMode::Off),
            _ => None,
        }
    }
}

/// Pre-connect URL validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsrfGuard {
    pub mode: GuardMode,
}

impl SsrfGuard {
    pub fn new(mode: GuardMode) -> Self {
        Self { mode }
    }

    /// Validate the URL shape and resolve the host, checking every address.
    ///
    /// Returns the resolved socket addresses so the caller can pin them for
    /// the actual connection.
    pub async fn resolve_and_check(&self, url: &Url) -> Result<Vec<SocketAddr>> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::UrlBlocked {
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        let host = url.host_str().ok_or_else(|| ApiError::UrlBlocked {
            message: "URL has no host".into(),
        })?;
        let port = url.port_or_known_default().unwrap_or(443);

        // Literal IPs skip DNS but not the address check.
        if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
            self.check_ip(ip)?;
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        if self.mode != GuardMode::Off && is_blocked_hostname(host) {
            return Err(ApiError::UrlBlocked {
                message: format!("hostname '{host}' is a blocked internal name"),
            });
        }

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ApiError::Network {
                message: format!("cannot resolve '{host}': {e}"),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(ApiError::Network {
                message: format!("'{host}' resolved to no addresses"),
            });
        }
        for addr in &addrs {
            self.check_ip(addr.ip())?;
        }
        Ok(addrs)
    }

    fn check_ip(&self, ip: IpAddr) -> Result<()> {
        if self.mode == GuardMode::Off {
            return Ok(());
        }
        let violation = match self.mode {
            GuardMode::Strict => strict_violation(ip),
            GuardMode::Moderate => moderate_violation(ip),
            GuardMode::Off => None,
        };
        match violation {
            Some(reason) => Err(ApiError::UrlBlocked {
                message: format!("{ip} is {reason}"),
            }),
            None => Ok(()),
        }
    }
}

/// Names that always point inside the machine or the cloud fabric.
fn is_blocked_hostname(host: &str) -> bool {
    let lowered = host.to_ascii_lowercase();
    lowered == "localhost"
        || lowered.ends_with(".localhost")
        || lowered == "metadata.google.internal"
        || lowered == "metadata"
}

fn moderate_violation(ip: IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                Some("a loopback address")
            } else if v4.is_link_local() {
                Some("link-local (cloud metadata range)")
            } else {
                None
            }
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return moderate_violation(IpAddr::V4(mapped));
            }
            if v6.is_loopback() {
                Some("a loopback address")
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                Some("link-local")
            } else {
                None
            }
        }
    }
}

fn strict_violation(ip: IpAddr) -> Option<&'static str> {
    if let Some(reason) = moderate_violation(ip) {
        return Some(reason);
    }
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            if v4.is_private() {
                Some("an RFC-1918 private address")
            } else if v4.is_unspecified() || v4.is_broadcast() || v4.is_multicast() {
                Some("a special-purpose address")
            } else if octets[0] == 100 && (octets[1] & 0xc0) == 64 {
                Some("a CGNAT address")
            } else if octets[0] == 192 && octets[1] == 0 && octets[2] == 0 {
                Some("an IETF protocol assignment address")
            } else {
                None
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_unspecified() || v6.is_multicast() {
                Some("a special-purpose address")
            } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
                Some("a unique-local address")
            } else {
                None
            }
        }
    }
}
