use xrcast_common::helpers::env_list;

use crate::{WebError, WebResult};

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Comma separated ICE server URLs overriding the default STUN server.
pub const ICE_SERVERS_ENV: &str = "XRCAST_ICE_SERVERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub ice_servers: Vec<String>,
}

impl PeerConfig {
    pub fn with_ice_servers(servers: Vec<String>) -> WebResult<Self> {
        if servers.is_empty() {
            return Err(WebError::Config("at least one ICE server is required".into()));
        }
        if let Some(bad) = servers.iter().find(|url| !is_ice_url(url)) {
            return Err(WebError::Config(format!(
                "unsupported ICE server URL {bad}; expected stun:, turn: or turns:"
            )));
        }
        Ok(Self {
            ice_servers: servers,
        })
    }

    /// Default config, with ICE servers taken from `XRCAST_ICE_SERVERS` when set.
    pub fn from_env() -> WebResult<Self> {
        match env_list(ICE_SERVERS_ENV) {
            Some(servers) => Self::with_ice_servers(servers),
            None => Ok(Self::default()),
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

fn is_ice_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    ["stun:", "turn:", "turns:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_public_stun() {
        assert_eq!(
            PeerConfig::default().ice_servers,
            vec!["stun:stun.l.google.com:19302"]
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(PeerConfig::with_ice_servers(vec![]).is_err());
        assert!(PeerConfig::with_ice_servers(vec!["https://example.com".into()]).is_err());
        let config = PeerConfig::with_ice_servers(vec![
            "stun:stun.example.org:3478".into(),
            "turns:turn.example.org:5349".into(),
        ])
        .unwrap();
        assert_eq!(config.ice_servers.len(), 2);
    }
}
