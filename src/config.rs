use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use snafu::{OptionExt as _, ResultExt};

use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu, InvalidLookbackSnafu};
use crate::platform::{Platform, PlatformKind, DEFAULT_CHUNK_SIZE};
use crate::time::{Lookback, Timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// metrics pipeline, then follower reconciliation
    #[default]
    All,
    Metrics,
    Followers,
}

impl RunMode {
    pub fn metrics(self) -> bool {
        matches!(self, RunMode::All | RunMode::Metrics)
    }

    pub fn followers(self) -> bool {
        matches!(self, RunMode::All | RunMode::Followers)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub platform: PlatformKind,
    #[serde(default)]
    pub run: RunMode,

    #[serde(default = "default_chunk_size", deserialize_with = "number")]
    pub chunk_size: usize,
    #[serde(default = "default_pool_size", deserialize_with = "number")]
    pub pool_size: usize,
    #[serde(default = "default_lookback_months", deserialize_with = "number")]
    pub lookback_months: u32,
    #[serde(default, deserialize_with = "crate::time::deserialize_duration")]
    pub metrics_cooldown: Option<Duration>,
    #[serde(default, deserialize_with = "crate::time::deserialize_duration")]
    pub follower_cooldown: Option<Duration>,

    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(flatten)]
    pub twitch: TwitchCredentials,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TwitchCredentials {
    #[serde(rename = "twitch_client_id")]
    pub client_id: Option<String>,
    #[serde(rename = "twitch_client_secret")]
    pub client_secret: Option<String>,
}

/// Flattened fields make every variable arrive as text, numbers included.
fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    text.trim().parse().map_err(serde::de::Error::custom)
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_pool_size() -> usize {
    4
}

fn default_lookback_months() -> u32 {
    2
}

/// Load the configuration and reject a lookback that reaches past the calendar.
pub fn load() -> Result<Config, ApplicationError> {
    let config = envy::from_env::<Config>().context(ConfigLoadSnafu)?;
    config.lookback(Utc::now())?;

    Ok(config)
}

impl Config {
    /// The platform strategy with any tuning from the environment applied.
    pub fn platform(&self) -> Platform {
        let mut platform = Platform::for_kind(self.platform);
        platform.chunk_size = self.chunk_size.max(1);

        if let Some(cooldown) = self.metrics_cooldown {
            platform.metrics_cooldown = cooldown;
        }
        if let Some(cooldown) = self.follower_cooldown {
            platform.follower_cooldown = cooldown;
        }

        platform
    }

    pub fn lookback(&self, now: Timestamp) -> Result<Lookback, ApplicationError> {
        Lookback::starting(now, self.lookback_months).context(InvalidLookbackSnafu {
            months: self.lookback_months,
        })
    }
}
