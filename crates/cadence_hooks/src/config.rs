//! TOML-loadable hook configuration
//!
//! ```toml
//! [countdown]
//! interval_ms = 250
//!
//! [debounce]
//! delay_ms = 300
//! leading = true
//!
//! [hover]
//! delay_enter_ms = 100
//!
//! [mouse]
//! throttle_ms = 16
//! ```
//!
//! Every section and field is optional. Loading rejects a `[mouse]` section
//! that sets both `debounce_ms` and `throttle_ms`.

use crate::countdown::CountdownOptions;
use crate::debounce::DebounceOptions;
use crate::hover::HoverOptions;
use crate::mouse::MouseOptions;
use cadence_core::error::ConfigResult;
use serde::Deserialize;
use std::path::Path;

/// Options for every hook, grouped by section
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub countdown: CountdownOptions,
    pub debounce: DebounceOptions,
    pub hover: HoverOptions,
    pub mouse: MouseOptions,
}

impl HooksConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded hook configuration");
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        self.mouse.policy().map(|_| ())
    }
}
