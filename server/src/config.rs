//! Server configuration loaded from the environment.
//!
//! Every knob has a typed default; values that are missing or fail to parse
//! fall back to it, so a bare environment always yields a runnable server.

use wire::batch::DEFAULT_MAX_BATCH_SIZE;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port the HTTP and websocket listener binds.
    pub port: u16,
    /// Upper bound on entries in one batch update.
    pub max_batch_size: usize,
    /// Capacity of each connected client's outbound frame queue.
    pub client_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            max_batch_size: env_parse("MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE).max(1),
            client_queue_capacity: env_parse("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
