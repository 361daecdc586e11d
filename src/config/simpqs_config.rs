// src/config/simpqs_config.rs

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime configuration, loaded from simpqs.toml and SIMPQS_* environment
/// variables on top of defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpqsConfig {
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,

    /// Scratch directory for relation streams; None defers to TMPDIR.
    pub tmp_dir: Option<String>,

    /// Seed for the polynomial coefficient sampler. Fixed by default so a
    /// factorisation is reproducible.
    pub seed: u64,

    /// Remove relation streams after a successful run.
    pub cleanup: bool,
}

impl Default for SimpqsConfig {
    fn default() -> Self {
        SimpqsConfig {
            log_level: "info".to_string(),
            tmp_dir: None,
            seed: 2994439072,
            cleanup: true,
        }
    }
}

impl SimpqsConfig {
    /// Load configuration with precedence: config file, env vars, defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("seed", 2994439072i64)?
            .set_default("cleanup", true)?;

        if Path::new("simpqs.toml").exists() {
            builder = builder.add_source(File::with_name("simpqs.toml"));
        }

        builder = builder.add_source(
            Environment::with_prefix("SIMPQS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
