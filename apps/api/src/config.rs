use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::layout::RasterConfig;

/// Application configuration loaded from environment variables.
/// Every variable has a default; out-of-range values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory receiving persisted report artifacts.
    pub report_output_dir: PathBuf,
    /// Rasterization oversampling factor (2 – 4).
    pub raster_scale: u32,
    /// Upper bound on the wait for a widget to finish painting.
    pub raster_settle_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            report_output_dir: std::env::var("REPORT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./reports")),
            raster_scale: parse_env("RASTER_SCALE", 3u32)
                .context("RASTER_SCALE must be an integer")?,
            raster_settle_timeout_ms: parse_env("RASTER_SETTLE_TIMEOUT_MS", 200u64)
                .context("RASTER_SETTLE_TIMEOUT_MS must be an integer")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (2..=4).contains(&self.raster_scale),
            "RASTER_SCALE must lie in 2..=4, got {}",
            self.raster_scale
        );
        ensure!(
            (1..=5000).contains(&self.raster_settle_timeout_ms),
            "RASTER_SETTLE_TIMEOUT_MS must lie in 1..=5000, got {}",
            self.raster_settle_timeout_ms
        );
        Ok(())
    }

    pub fn raster_config(&self) -> RasterConfig {
        RasterConfig {
            scale: self.raster_scale,
            settle_timeout: Duration::from_millis(self.raster_settle_timeout_ms),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for '{key}': {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(scale: u32, timeout_ms: u64) -> Config {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            report_output_dir: PathBuf::from("./reports"),
            raster_scale: scale,
            raster_settle_timeout_ms: timeout_ms,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config(3, 200).validate().is_ok());
    }

    #[test]
    fn test_scale_out_of_range_rejected() {
        assert!(config(1, 200).validate().is_err());
        assert!(config(5, 200).validate().is_err());
    }

    #[test]
    fn test_timeout_out_of_range_rejected() {
        assert!(config(2, 0).validate().is_err());
        assert!(config(2, 5001).validate().is_err());
    }

    #[test]
    fn test_raster_config_conversion() {
        let raster = config(4, 150).raster_config();
        assert_eq!(raster.scale, 4);
        assert_eq!(raster.settle_timeout, Duration::from_millis(150));
    }
}
