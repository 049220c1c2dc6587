use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Network address of a replica: host plus listening port.
///
/// The derived ordering is lexicographic on host, then port, which is the
/// total order shard assignment consumes the view in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
}

impl Endpoint {
    /// Parses a `host:port` string. Whitespace is trimmed; a bare host is
    /// accepted with an empty port.
    pub fn parse(ip_port: &str) -> Self {
        let ip_port = ip_port.trim();
        match ip_port.rsplit_once(':') {
            Some((host, port)) => Self {
                host: host.to_string(),
                port: port.to_string(),
            },
            None => Self {
                host: ip_port.to_string(),
                port: String::new(),
            },
        }
    }

    /// Builds an endpoint from a connection's remote address.
    pub fn from_addr(addr: &SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port().to_string(),
        }
    }

    /// Host-only equality. Used to recognize a peer replica whose outbound
    /// port differs from its listening port.
    pub fn same_host(&self, other: &Endpoint) -> bool {
        self.host == other.host
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Form body carried by `PUT /view` and `DELETE /view`.
#[derive(Debug, Default, Deserialize)]
pub struct IpPortForm {
    #[serde(default)]
    pub ip_port: String,
}
