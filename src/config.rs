//! Configuration for the operator runtime.
//!
//! Loaded from an optional TOML file overlaid with `OPERATOR`-prefixed
//! environment variables (highest priority), e.g.
//! `OPERATOR__WATCH__RECONNECT_DELAY_MS=250`.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OperatorConfig {
    /// Watch reconnection policy knobs
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Watch reconnection policy.
///
/// Both defaults reproduce the historical behavior of the engine and are
/// deliberate, documented policy knobs rather than derived values.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WatchConfig {
    /// Fixed delay before re-opening a dropped watch stream (unit:
    /// milliseconds). There is no backoff, no jitter and no retry cap:
    /// reconnection is unconditionally infinite.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// When false (the default), a re-opened watch starts from the server's
    /// current state and events emitted strictly between disconnect and
    /// reconnect are silently missed. Reconciliation logic must therefore be
    /// level-triggered, or an external resync must cover the gap. Setting
    /// this to true passes the last observed `resourceVersion` as a query
    /// parameter on reconnect.
    #[serde(default)]
    pub resume_from_resource_version: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            resume_from_resource_version: false,
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    100
}

impl OperatorConfig {
    /// Load configuration with priority:
    /// 1. Default values (hardcoded)
    /// 2. Optional config file
    /// 3. Environment variables (highest priority)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("OPERATOR")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}
