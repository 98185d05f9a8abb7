use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

pub const DEFAULT_SOURCE_URL: &str = "https://talaadthai.com/prices/fruit";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub bind: String,
    pub source_url: String,
    pub timeout_secs: u64,
}

impl Settings {
    /// Defaults overlaid with `ORANGE_*` environment variables.
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("db_path", "data/oranges.sqlite")?
            .set_default("bind", "0.0.0.0:8000")?
            .set_default("source_url", DEFAULT_SOURCE_URL)?
            .set_default("timeout_secs", 10)?
            .add_source(config::Environment::with_prefix("ORANGE"))
            .build()
            .context("Failed to read ORANGE_* settings")?
            .try_deserialize()
            .context("Invalid ORANGE_* settings")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
