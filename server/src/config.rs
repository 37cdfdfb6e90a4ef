//! Server configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ACTIVITY_CAP: usize = 200;
pub const DEFAULT_CLIENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// TCP port the listener binds.
    pub port: u16,
    /// Maximum retained activity entries; oldest are evicted beyond this.
    pub activity_cap: usize,
    /// Capacity of each connection's outbound snapshot channel.
    pub client_buffer: usize,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 8000
    /// - `SYNCPAD_ACTIVITY_CAP`: default 200
    /// - `SYNCPAD_CLIENT_BUFFER`: default 256, clamped to at least 1
    ///
    /// Invalid values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: parse_port(std::env::var("PORT").ok().as_deref()),
            activity_cap: parse_count(
                std::env::var("SYNCPAD_ACTIVITY_CAP").ok().as_deref(),
                DEFAULT_ACTIVITY_CAP,
            ),
            client_buffer: parse_count(
                std::env::var("SYNCPAD_CLIENT_BUFFER").ok().as_deref(),
                DEFAULT_CLIENT_BUFFER,
            )
            .max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            activity_cap: DEFAULT_ACTIVITY_CAP,
            client_buffer: DEFAULT_CLIENT_BUFFER,
        }
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT)
}

fn parse_count(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
