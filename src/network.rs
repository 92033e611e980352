// src/network.rs
// Display addresses for the startup banner

use local_ip_address::local_ip;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddresses {
    pub local: String,
    /// Only present when the server listens on every interface.
    pub network: Option<String>,
}

fn is_wildcard(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::")
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "::1" | "localhost")
}

impl ServerAddresses {
    pub fn new(host: &str, port: u16, tls: bool) -> Self {
        let protocol = if tls { "https" } else { "http" };

        let display_host = if is_wildcard(host) || is_loopback(host) {
            "localhost"
        } else {
            host
        };
        let local = format!("{}://{}:{}", protocol, display_host, port);

        let network = if is_wildcard(host) {
            local_ip().ok().map(|ip| {
                let formatted_ip = match ip {
                    IpAddr::V6(v6) => format!("[{}]", v6),
                    IpAddr::V4(v4) => v4.to_string(),
                };
                format!("{}://{}:{}", protocol, formatted_ip, port)
            })
        } else {
            None
        };

        ServerAddresses { local, network }
    }
}
