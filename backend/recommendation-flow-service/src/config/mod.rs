use crate::controllers::PipelineSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub data: DataConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// JSON catalog snapshot served by the in-memory stores
    pub catalog_path: String,
    /// When set, engagement signals come from Redis instead of the snapshot
    pub redis_url: Option<String>,
    pub linear_model_weights_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub generator_timeout_ms: u64,
    pub collector_timeout_ms: u64,
    pub random_candidate_multiplier: usize,
    pub random_filter_amount: f64,
    pub foxtrot_candidate_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            service: ServiceConfig {
                http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,
                service_name: lookup("SERVICE_NAME")
                    .unwrap_or_else(|| "recommendation-flow-service".to_string()),
                default_limit: parse_or(&lookup, "DEFAULT_LIMIT", 10)?,
                max_limit: parse_or(&lookup, "MAX_LIMIT", 100)?,
            },
            data: DataConfig {
                catalog_path: lookup("CATALOG_PATH")
                    .unwrap_or_else(|| "./data/catalog.json".to_string()),
                redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
                linear_model_weights_path: lookup("LINEAR_MODEL_WEIGHTS_PATH")
                    .filter(|path| !path.trim().is_empty()),
            },
            pipeline: PipelineConfig {
                generator_timeout_ms: parse_or(&lookup, "GENERATOR_TIMEOUT_MS", 500)?,
                collector_timeout_ms: parse_or(&lookup, "COLLECTOR_TIMEOUT_MS", 500)?,
                random_candidate_multiplier: parse_or(&lookup, "RANDOM_CANDIDATE_MULTIPLIER", 100)?,
                random_filter_amount: parse_or(&lookup, "RANDOM_FILTER_AMOUNT", 0.1)?,
                foxtrot_candidate_limit: parse_or(&lookup, "FOXTROT_CANDIDATE_LIMIT", 100)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.service.default_limit == 0 || self.service.max_limit == 0 {
            anyhow::bail!("DEFAULT_LIMIT and MAX_LIMIT must be positive");
        }
        if self.service.default_limit > self.service.max_limit {
            anyhow::bail!(
                "DEFAULT_LIMIT ({}) exceeds MAX_LIMIT ({})",
                self.service.default_limit,
                self.service.max_limit
            );
        }
        let amount = self.pipeline.random_filter_amount;
        if !(amount > 0.0 && amount <= 1.0) {
            anyhow::bail!("RANDOM_FILTER_AMOUNT must be in (0, 1], got {}", amount);
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            generator_timeout: Duration::from_millis(self.pipeline.generator_timeout_ms),
            collector_timeout: Duration::from_millis(self.pipeline.collector_timeout_ms),
            random_candidate_multiplier: self.pipeline.random_candidate_multiplier,
            random_filter_amount: self.pipeline.random_filter_amount,
            foxtrot_candidate_limit: self.pipeline.foxtrot_candidate_limit,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.service.http_port, 8080);
        assert_eq!(config.service.default_limit, 10);
        assert_eq!(config.data.catalog_path, "./data/catalog.json");
        assert!(config.data.redis_url.is_none());
        assert_eq!(config.pipeline_settings(), PipelineSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("HTTP_PORT", "9090"),
            ("REDIS_URL", "redis://cache:6379"),
            ("GENERATOR_TIMEOUT_MS", "250"),
            ("RANDOM_FILTER_AMOUNT", "0.2"),
        ])
        .unwrap();

        assert_eq!(config.service.http_port, 9090);
        assert_eq!(config.data.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(
            config.pipeline_settings().generator_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(config.pipeline.random_filter_amount, 0.2);
    }

    #[test]
    fn test_invalid_number_names_the_key() {
        let err = config(&[("HTTP_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("HTTP_PORT"));
    }

    #[test]
    fn test_rejects_out_of_range_filter_amount() {
        assert!(config(&[("RANDOM_FILTER_AMOUNT", "1.5")]).is_err());
        assert!(config(&[("DEFAULT_LIMIT", "200")]).is_err());
    }
}
