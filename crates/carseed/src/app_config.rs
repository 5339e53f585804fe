//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Every knob has a default, so `carseed` with no file and no env vars still
//! points at `http://localhost:3000/cars/bulk` and starts shipping cars.

use anyhow::{Context, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::backends::SinkConfig;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🎲 How fast (and how reproducibly) the car lot fills up.
    #[serde(default)]
    pub source_config: SourceConfig,
    /// 📡 Where the batches go.
    #[serde(default)]
    pub sink_config: SinkConfig,
    /// 🪣 When the buffer flushes, and how hard shutdown tries to empty it.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// 🎲 Record source knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// ⏱️ One car every this-many milliseconds. 30ms ≈ 2,000 cars a minute.
    #[serde(default = "default_generation_interval_ms")]
    pub generation_interval_ms: u64,
    /// 🎯 Fixed seed for reproducible lots. None = OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_generation_interval_ms() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            generation_interval_ms: default_generation_interval_ms(),
            seed: None,
        }
    }
}

/// 🪣 Dispatcher knobs: size trigger, time trigger, and the shutdown drain budget.
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// 📦 Flush as soon as this many cars are waiting. Also the max batch length.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// ⏱️ Flush at least this often, full batch or not.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// 🔁 Unsuccessful flush attempts shutdown will tolerate before giving up on the drain.
    #[serde(default = "default_max_drain_attempts")]
    pub max_drain_attempts: u32,
    /// 💤 Pause between unsuccessful drain attempts.
    #[serde(default = "default_drain_backoff_ms")]
    pub drain_backoff_ms: u64,
    /// ⏳ How long the drain waits for a flush that is already in flight to settle.
    /// Should outlast the sink's own timeouts, so a slow but healthy receiver gets to finish.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    /// 📊 Log a statistics line each time delivered crosses a multiple of this.
    #[serde(default = "default_stats_log_every")]
    pub stats_log_every: u64,
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_interval_ms() -> u64 {
    1000
}

fn default_max_drain_attempts() -> u32 {
    10
}

fn default_drain_backoff_ms() -> u64 {
    100
}

fn default_settle_timeout_ms() -> u64 {
    60_000
}

fn default_stats_log_every() -> u64 {
    100
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
            max_drain_attempts: default_max_drain_attempts(),
            drain_backoff_ms: default_drain_backoff_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            stats_log_every: default_stats_log_every(),
        }
    }
}

impl AppConfig {
    /// 🔒 Reject the values that would make tokio panic or the dispatcher spin.
    ///
    /// `tokio::time::interval` panics on a zero period, and a zero batch size
    /// would detach empty batches forever.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.dispatch.batch_size > 0,
            "💀 dispatch.batch_size must be at least 1. A batch of zero cars is just a very expensive HTTP ping."
        );
        ensure!(
            self.dispatch.batch_interval_ms > 0,
            "💀 dispatch.batch_interval_ms must be greater than 0. The timer refuses to tick infinitely fast."
        );
        ensure!(
            self.dispatch.stats_log_every > 0,
            "💀 dispatch.stats_log_every must be greater than 0."
        );
        ensure!(
            self.source_config.generation_interval_ms > 0,
            "💀 source_config.generation_interval_ms must be greater than 0. Even a car factory needs a lunch break."
        );
        self.sink_config.validate()
    }
}

/// 🚀 Load the config from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`CARSEED_*`, nested with `__`, e.g.
/// `CARSEED_DISPATCH__BATCH_SIZE`) with an optional TOML file. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable or fails [`AppConfig::validate`].
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ Env vars first, like a good sourdough starter.
    let config = Figment::new().merge(Env::prefixed("CARSEED_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CARSEED_*). \
             The file exists in our hearts, but apparently not in valid TOML.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CARSEED_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .validate()
        .context("💀 Configuration parsed, but the values don't survive contact with reality")?;
    Ok(app_config)
}
