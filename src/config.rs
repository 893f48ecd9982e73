use std::time::Duration;

use serde::Deserialize;

/// What the registry does when a tool name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the second registration with `RegistryError::Duplicate`.
    #[default]
    Reject,
    /// Last write wins.
    Replace,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Check present arguments against their declared types and enums.
    pub check_types: bool,
    /// Upper bound on a single handler run, in milliseconds. `None` waits forever.
    pub handler_timeout_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            check_types: true,
            handler_timeout_ms: None,
        }
    }
}

impl DispatcherConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
