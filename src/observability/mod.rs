//! Structured tracing for the plugin host.
//!
//! The library only emits `tracing` events and spans. Enable the
//! `subscriber` feature to install a formatting subscriber:
//!
//! ```toml
//! plugin-host = { version = "0.1", features = ["subscriber"] }
//! ```
//!
//! ```rust,ignore
//! use plugin_host::observability::{TracingConfig, TracingLevel, init_tracing};
//!
//! init_tracing(&TracingConfig::new().with_level(TracingLevel::Debug))?;
//! ```

use std::fmt;
use std::path::Path;

use tracing::{Level, Span, span};

/// Tracing configuration.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub enabled: bool,
    pub level: TracingLevel,
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: TracingLevel::default(),
            with_target: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracingLevel {
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracingLevel::Warn => write!(f, "warn"),
            TracingLevel::Info => write!(f, "info"),
            TracingLevel::Debug => write!(f, "debug"),
            TracingLevel::Trace => write!(f, "trace"),
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.level)
    }
}

/// Span wrapping one batch load of a plugin directory.
pub fn load_batch_span(dir: &Path) -> Span {
    span!(
        Level::INFO,
        "plugins.load",
        dir = %dir.display(),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber initialization failed: {0}")]
    Init(String),
}

/// Installs a global formatting subscriber. `RUST_LOG` overrides the
/// configured level. Does nothing when tracing is disabled.
#[cfg(feature = "subscriber")]
#[cfg_attr(docsrs, doc(cfg(feature = "subscriber")))]
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    use tracing_subscriber::EnvFilter;

    if !config.enabled {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config() {
        let config = TracingConfig::new().with_level(TracingLevel::Debug);
        assert!(config.enabled);
        assert_eq!(config.default_directive(), "plugin_host=debug");
        assert!(!TracingConfig::disabled().enabled);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(TracingLevel::default().to_string(), "info");
        assert_eq!(TracingLevel::Warn.to_string(), "warn");
    }

    #[cfg(feature = "subscriber")]
    #[test]
    fn test_init_disabled_is_noop() {
        assert!(init_tracing(&TracingConfig::disabled()).is_ok());
    }
}
