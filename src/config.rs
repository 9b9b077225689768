use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::relay::PublishOptions;

pub const DEFAULT_RELAY: &str = "wss://relay.damus.io";
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Settings read from the optional JSON config file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_relay")]
    pub relay: String,
    /// Identity file; `None` means `~/.nostrkeys`.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: default_relay(),
            key_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            ack_timeout_secs: default_ack_timeout_secs(),
        }
    }
}

fn default_relay() -> String {
    DEFAULT_RELAY.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_ack_timeout_secs() -> u64 {
    10
}

impl Config {
    /// A missing file yields the defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(Error::Config(format!("{}: {}", path.display(), err))),
        };
        let mut cfg: Config =
            serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        cfg.relay = cfg.relay.trim().to_string();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        validate_relay_url(&self.relay)?;
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("ack_timeout_secs", self.ack_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(Error::Config(format!(
                    "{} must be between 1 and {} seconds, got {}",
                    name, MAX_TIMEOUT_SECS, secs
                )));
            }
        }
        Ok(())
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ack_timeout: Duration::from_secs(self.ack_timeout_secs),
        }
    }
}

pub fn validate_relay_url(url: &str) -> Result<()> {
    let u = url.trim();
    let rest = u
        .strip_prefix("wss://")
        .or_else(|| u.strip_prefix("ws://"))
        .ok_or_else(|| Error::Config(format!("relay url must start with ws:// or wss://: {}", url)))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(Error::Config(format!("relay url has no host: {}", url)));
    }
    Ok(())
}
