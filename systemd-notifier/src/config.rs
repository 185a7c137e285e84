//! Application configuration loaded from a TOML file.
//!
//! ```toml
//! hostname = "web-1"
//! notifier_timeout_secs = 30
//! listener = "dbus"
//! units = ["nginx", { name = "backup.service", category = "oneshot" }]
//!
//! [logging]
//! filter = "systemd_notifier=debug"
//!
//! [[notifiers]]
//! type = "slack"
//! webhook_url = "https://hooks.slack.com/services/..."
//! channel = "#ops"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use unit_state::UnitCategory;

use crate::listener::ListenerBackend;
use crate::notification::ChannelConfig;
use crate::{Error, Result};

/// Default poll interval of the systemctl listener.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// A unit to monitor, either a bare name or a table with overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitConfig {
    Name(String),
    Detailed {
        name: String,
        /// Overrides the category detected from the service `Type`.
        #[serde(default)]
        category: Option<UnitCategory>,
    },
}

impl UnitConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { name, .. } => name,
        }
    }

    pub fn category(&self) -> Option<UnitCategory> {
        match self {
            Self::Name(_) => None,
            Self::Detailed { category, .. } => *category,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// `tracing` filter directive. `RUST_LOG` takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
    /// Directory for daily rotated log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host name reported in notifications. Defaults to the machine host name.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Units to monitor.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    /// Notification channels.
    #[serde(default)]
    pub notifiers: Vec<ChannelConfig>,
    /// Upper bound for a single notifier invocation. Unbounded when unset.
    #[serde(default)]
    pub notifier_timeout_secs: Option<u64>,
    /// Source of unit state changes.
    #[serde(default)]
    pub listener: ListenerBackend,
    /// How often the systemctl listener polls unit properties.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub logging: LoggingOptions,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            units: Vec::new(),
            notifiers: Vec::new(),
            notifier_timeout_secs: None,
            listener: ListenerBackend::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            logging: LoggingOptions::default(),
        }
    }
}

impl AppConfig {
    /// Read, parse and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), units = config.units.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.units.is_empty() {
            return Err(Error::config("no units configured"));
        }
        if let Some(unit) = self.units.iter().find(|u| u.name().trim().is_empty()) {
            return Err(Error::config(format!("invalid unit name {:?}", unit.name())));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be greater than zero"));
        }
        if self.notifier_timeout_secs == Some(0) {
            return Err(Error::config("notifier_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Configured host name, falling back to the machine host name.
    pub fn resolve_hostname(&self) -> String {
        self.hostname
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub fn notifier_timeout(&self) -> Option<Duration> {
        self.notifier_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = AppConfig::from_toml_str(r#"units = ["nginx"]"#).unwrap();
        assert_eq!(config.units, vec![UnitConfig::Name("nginx".to_string())]);
        assert!(config.notifiers.is_empty());
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.notifier_timeout(), None);
        assert_eq!(config.listener, ListenerBackend::Dbus);
    }

    #[test]
    fn test_detailed_units() {
        let config = AppConfig::from_toml_str(
            r#"
            units = [
                "nginx.service",
                { name = "backup", category = "oneshot" },
                { name = "worker" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.units[0].name(), "nginx.service");
        assert_eq!(config.units[0].category(), None);
        assert_eq!(config.units[1].name(), "backup");
        assert_eq!(config.units[1].category(), Some(UnitCategory::OneShot));
        assert_eq!(config.units[2].category(), None);
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml_str(
            r##"
            hostname = "web-1"
            notifier_timeout_secs = 15
            listener = "systemctl"
            poll_interval_ms = 250
            units = ["nginx"]

            [logging]
            filter = "systemd_notifier=debug"

            [[notifiers]]
            type = "slack"
            webhook_url = "https://hooks.slack.com/services/T/B/X"
            channel = "#ops"

            [[notifiers]]
            type = "webhook"
            url = "https://example.com/hook"
            "##,
        )
        .unwrap();

        assert_eq!(config.resolve_hostname(), "web-1");
        assert_eq!(config.notifier_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.listener, ListenerBackend::Systemctl);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.notifiers.len(), 2);
        assert_eq!(config.notifiers[0].channel_type(), "slack");
        assert_eq!(config.notifiers[1].channel_type(), "webhook");
        assert_eq!(
            config.logging.filter.as_deref(),
            Some("systemd_notifier=debug")
        );
    }

    #[test]
    fn test_rejects_empty_units() {
        assert!(matches!(
            AppConfig::from_toml_str("units = []"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str(r#"units = ["  "]"#),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let result = AppConfig::from_toml_str(
            r#"
            units = ["nginx"]
            poll_interval_ms = 0
            "#,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_unknown_listener() {
        let result = AppConfig::from_toml_str(
            r#"
            units = ["nginx"]
            listener = "inotify"
            "#,
        );
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            AppConfig::from_toml_str("units = ["),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_hostname_fallback() {
        let config = AppConfig {
            hostname: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!config.resolve_hostname().trim().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");
        std::fs::write(&path, "units = [\"sshd\"]\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.units[0].name(), "sshd");

        let missing = AppConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(Error::Configuration(_))));
    }
}
