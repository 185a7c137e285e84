use std::{sync::OnceLock, time::Duration};

use reqwest::Client;
use tracing::debug;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the HTTP client used by a notifier channel.
pub fn build_client(timeout_secs: u64) -> Client {
    install_rustls_provider();
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("systemd-notifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}
