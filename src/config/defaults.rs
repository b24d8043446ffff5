//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_nick() -> String {
    "TheBot".to_string()
}

pub fn default_user() -> String {
    "bot".to_string()
}

pub fn default_realname() -> String {
    "The Bot".to_string()
}

// =============================================================================
// Limit Defaults
// =============================================================================

pub fn default_max_nick_attempts() -> u32 {
    8
}

pub fn default_max_line_len() -> usize {
    asif_proto::line::DEFAULT_MAX_LINE_LEN
}
