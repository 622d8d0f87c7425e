use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use madlibs_words::WordCatalog;
use tracing::info;

/// Responder configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single callback delivery.
    pub callback_timeout: Duration,
    /// Catalog override; the bundled word list is used when unset.
    pub words_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source. Every setting has a default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: u16 = match lookup("RESPONDER_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("RESPONDER_PORT must be a port number, got '{raw}'"))?,
            None => 7071,
        };
        let timeout_secs: u64 = match lookup("CALLBACK_TIMEOUT_SECS") {
            Some(raw) => raw.parse().with_context(|| {
                format!("CALLBACK_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'")
            })?,
            None => 30,
        };
        if timeout_secs == 0 {
            anyhow::bail!("CALLBACK_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            host: lookup("RESPONDER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            callback_timeout: Duration::from_secs(timeout_secs),
            words_file: lookup("WORDS_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load the word catalog. Any failure here must stop startup.
    pub fn load_catalog(&self) -> Result<WordCatalog> {
        match &self.words_file {
            Some(path) => {
                info!(path = %path.display(), "Loading word catalog");
                WordCatalog::from_path(path)
                    .with_context(|| format!("Failed to load word catalog {}", path.display()))
            }
            None => WordCatalog::bundled().context("Bundled word catalog is malformed"),
        }
    }

    pub fn log_summary(&self) {
        info!(
            addr = %self.bind_addr(),
            callback_timeout_secs = self.callback_timeout.as_secs(),
            words_file = ?self.words_file,
            "Config loaded"
        );
    }
}
