use emporium_catalog::PricingConfig;
use serde::Deserialize;
use std::env;
use std::num::NonZeroU64;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    /// Zero is rejected at load time.
    #[serde(default = "default_interval")]
    pub interval_seconds: NonZeroU64,
    #[serde(default)]
    pub run_once: bool,
}

fn default_interval() -> NonZeroU64 { NonZeroU64::new(300).unwrap_or(NonZeroU64::MIN) }

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            run_once: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `EMPORIUM_DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("EMPORIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
