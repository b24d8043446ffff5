//! Handshake and framing limits.

use serde::Deserialize;

use super::defaults::{default_max_line_len, default_max_nick_attempts};

/// Limits applied by the connection.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// How many nicks are tried when the server reports the nick as taken
    /// (default: 8). Each retry appends `_` to the previous candidate.
    #[serde(default = "default_max_nick_attempts")]
    pub max_nick_attempts: u32,
    /// Inbound framing limit in bytes (default: 16384). A longer line is a
    /// fatal protocol error.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nick_attempts: default_max_nick_attempts(),
            max_line_len: default_max_line_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_nick_attempts, 8);
        assert_eq!(limits.max_line_len, 16 * 1024);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let limits: LimitsConfig = toml::from_str("max_nick_attempts = 3").unwrap();
        assert_eq!(limits.max_nick_attempts, 3);
        assert_eq!(limits.max_line_len, 16 * 1024);
    }
}
