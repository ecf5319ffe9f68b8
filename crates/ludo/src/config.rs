//! Server configuration.

use std::time::Duration;

use ludo_room::CoordinatorConfig;

/// Everything the server reads at startup.
///
/// Defaults suit a single local instance; [`from_env`](Self::from_env)
/// overrides them for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Compare-and-swap attempts per join before reporting a transient
    /// failure.
    pub max_join_attempts: u32,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_join_attempts: 3,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `LUDO_BIND_ADDR`, `LUDO_MAX_JOIN_ATTEMPTS`
    /// and `LUDO_IDLE_TIMEOUT_SECS` when set. Unparseable values are
    /// logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("LUDO_BIND_ADDR")
            && !addr.is_empty()
        {
            config.bind_addr = addr;
        }
        if let Some(val) = lookup("LUDO_MAX_JOIN_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(n) => config.max_join_attempts = n,
                Err(e) => tracing::warn!(value = %val, error = %e, "ignoring LUDO_MAX_JOIN_ATTEMPTS"),
            }
        }
        if let Some(val) = lookup("LUDO_IDLE_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.idle_timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!(value = %val, error = %e, "ignoring LUDO_IDLE_TIMEOUT_SECS"),
            }
        }

        config
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn max_join_attempts(mut self, attempts: u32) -> Self {
        self.max_join_attempts = attempts;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// The slice of this config the room coordinator cares about.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig::default().with_max_join_attempts(self.max_join_attempts)
    }
}
