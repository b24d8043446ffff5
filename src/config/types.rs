//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{default_nick, default_port, default_realname, default_user};
use super::limits::LimitsConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where to connect.
    pub server: ServerConfig,
    /// Who to register as.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Handshake and framing limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Channels the binary joins once registration completes.
    #[serde(default)]
    pub autojoin: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Build a configuration in code with default identity and limits.
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                host: host.into(),
                port,
                password: None,
            },
            identity: IdentityConfig {
                nick: nick.into(),
                ..IdentityConfig::default()
            },
            limits: LimitsConfig::default(),
            autojoin: Vec::new(),
        }
    }

    /// `host:port` for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname or address (e.g., "irc.libera.chat").
    pub host: String,
    /// Port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection password sent with PASS before registering (optional).
    pub password: Option<String>,
}

/// Registration identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Requested nick (default: "TheBot"). The server may assign another.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Username sent with USER (default: "bot").
    #[serde(default = "default_user")]
    pub user: String,
    /// Real name sent with USER (default: "The Bot").
    #[serde(default = "default_realname")]
    pub realname: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            user: default_user(),
            realname: default_realname(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ========================================================================
    // Defaults
    // ========================================================================

    #[test]
    fn identity_default_values() {
        let identity = IdentityConfig::default();
        assert_eq!(identity.nick, "TheBot");
        assert_eq!(identity.user, "bot");
        assert_eq!(identity.realname, "The Bot");
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str("[server]\nhost = \"irc.example.net\"\n").unwrap();
        assert_eq!(config.server.port, 6667);
        assert!(config.server.password.is_none());
        assert_eq!(config.identity.nick, "TheBot");
        assert_eq!(config.limits.max_nick_attempts, 8);
        assert!(config.autojoin.is_empty());
        assert_eq!(config.address(), "irc.example.net:6667");
    }

    #[test]
    fn new_keeps_default_identity_fields() {
        let config = Config::new("localhost", 6697, "asif");
        assert_eq!(config.identity.nick, "asif");
        assert_eq!(config.identity.user, "bot");
        assert_eq!(config.server.port, 6697);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
autojoin = ["#asif", "#test"]

[server]
host = "irc.example.net"
port = 6697
password = "secret"

[identity]
nick = "asif"
realname = "A Bot"

[limits]
max_nick_attempts = 2
"##
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.password.as_deref(), Some("secret"));
        assert_eq!(config.identity.nick, "asif");
        assert_eq!(config.identity.user, "bot");
        assert_eq!(config.identity.realname, "A Bot");
        assert_eq!(config.limits.max_nick_attempts, 2);
        assert_eq!(config.autojoin, vec!["#asif", "#test"]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/asif.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn missing_server_section_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "autojoin = []").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
