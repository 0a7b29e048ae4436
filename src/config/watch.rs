//! `[watch]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[watch]` section in stitch.toml - watch mode settings.
///
/// # Example
/// ```toml
/// [watch]
/// poll_interval_ms = 200   # How often the event loop checks for shutdown
/// debounce_ms = 100        # Quiet time before a burst of events is rebuilt
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "defaults::watch::poll_interval_ms")]
    #[educe(Default = defaults::watch::poll_interval_ms())]
    pub poll_interval_ms: u64,

    #[serde(default = "defaults::watch::debounce_ms")]
    #[educe(Default = defaults::watch::debounce_ms())]
    pub debounce_ms: u64,
}

impl WatchConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
