//! Client configuration
//!
//! Loaded from TOML; every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! space_id = "local"
//! tx_id = 1
//! timeout_ms = 15000
//! event_capacity = 64
//! ```

use crate::error::{Error, Result};
use holons_core::{SpaceId, TxId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default timeout for one dance, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Settings for one client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Space every dance targets
    pub space_id: String,
    /// Transaction the session belongs to
    pub tx_id: u64,
    /// Bound on a single remote call
    pub timeout_ms: u64,
    /// Events buffered per subscriber before it lags
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            space_id: "local".to_string(),
            tx_id: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to render config: {e}")))
    }

    /// Reject settings no session can run with
    pub fn validate(&self) -> Result<()> {
        if self.space_id.is_empty() {
            return Err(Error::Config("space_id must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout_ms must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Space as an id
    pub fn space(&self) -> SpaceId {
        SpaceId(self.space_id.clone())
    }

    /// Transaction as an id
    pub fn tx(&self) -> TxId {
        TxId(self.tx_id)
    }

    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
