//! Configuration system.
//!
//! Loads client configuration from JSON strings/files (file IO left to app).

use serde::{Deserialize, Serialize};

use crate::state::PlayerAppearance;

/// Root configuration for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, e.g. `127.0.0.1:57005`. The port may be omitted.
    pub server_addr: String,
    /// Transport implementation to resolve at startup.
    #[serde(default = "default_transport")]
    pub transport: String,
    /// Client tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Player name shown to other players.
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Character setup sent with the join request.
    #[serde(default)]
    pub appearance: PlayerAppearance,
}

fn default_transport() -> String {
    "udp".to_string()
}

fn default_tick_hz() -> u32 {
    60
}

fn default_nickname() -> String {
    "Player".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:57005".to_string(),
            transport: default_transport(),
            tick_hz: default_tick_hz(),
            nickname: default_nickname(),
            appearance: PlayerAppearance::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = ClientConfig::from_json_str(r#"{"server_addr": "10.0.0.1:28960"}"#).unwrap();
        assert_eq!(cfg.server_addr, "10.0.0.1:28960");
        assert_eq!(cfg.transport, "udp");
        assert_eq!(cfg.nickname, "Player");
        assert_eq!(cfg.tick_hz, 60);
    }
}
