use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::logger::LogFormat;
use crate::services::estimator::ForestParams;
use crate::services::predictor::TrainConfig;
use crate::services::synth::SynthConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` selects the in-process cache.
    pub redis_url: Option<String>,
    pub model_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub train_samples: usize,
    pub train_seed: u64,
    pub forest_trees: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            redis_url: Some("redis://localhost:6379".to_string()),
            model_path: PathBuf::from("model.bin"),
            cache_ttl_secs: 300,
            train_samples: 1000,
            train_seed: 42,
            forest_trees: 100,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let redis_url = match lookup("REDIS_URL") {
            Some(url) if url.trim().is_empty() || url == "memory" => None,
            Some(url) => Some(url),
            None => defaults.redis_url,
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            redis_url,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            cache_ttl_secs: parse_or(&lookup, "CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            train_samples: parse_or(&lookup, "TRAIN_SAMPLES", defaults.train_samples)?,
            train_seed: parse_or(&lookup, "TRAIN_SEED", defaults.train_seed)?,
            forest_trees: parse_or(&lookup, "FOREST_TREES", defaults.forest_trees)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            synth: SynthConfig {
                samples: self.train_samples,
                seed: self.train_seed,
                ..SynthConfig::default()
            },
            forest: ForestParams {
                n_trees: self.forest_trees,
                seed: self.train_seed,
                ..ForestParams::default()
            },
            ..TrainConfig::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {} value: {:?}", key, raw)),
        None => Ok(default),
    }
}
