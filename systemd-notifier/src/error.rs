//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown or unloaded systemd unit '{0}'")]
    UnknownUnit(String),

    #[error("systemd error: {0}")]
    Systemd(String),

    #[error("Notifier {notifier} failed: {message}")]
    Notifier { notifier: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn systemd(msg: impl Into<String>) -> Self {
        Self::Systemd(msg.into())
    }

    pub fn notifier(notifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notifier {
            notifier: notifier.into(),
            message: message.into(),
        }
    }
}
