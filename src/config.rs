use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback";
pub const DEFAULT_APP_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 300;
pub const DEFAULT_PROGRESS_STEP: u8 = 5;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub backend_url: String,
    pub client_id: Option<String>,
    pub redirect_uri: String,
    pub app_url: String,
    pub ticker: TickerConfig,
}

/// Cadence of the cosmetic progress bar shown while an analysis runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerConfig {
    pub interval: Duration,
    pub step: u8,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            step: DEFAULT_PROGRESS_STEP,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            client_id: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            ticker: TickerConfig::default(),
        }
    }
}

impl Config {
    /// Build a config from any key lookup. Unset or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let interval_ms = match get("VIBE_TICK_INTERVAL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("VIBE_TICK_INTERVAL_MS is not a number: {raw}"))?,
            None => DEFAULT_TICK_INTERVAL_MS,
        };

        let step = match get("VIBE_PROGRESS_STEP") {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .with_context(|| format!("VIBE_PROGRESS_STEP is not a number: {raw}"))?,
            None => DEFAULT_PROGRESS_STEP,
        };
        if step == 0 || step > 100 {
            anyhow::bail!("VIBE_PROGRESS_STEP must be between 1 and 100, got {step}");
        }

        Ok(Config {
            api_base: get("SPOTIFY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            backend_url: get("VIBE_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            client_id: get("SPOTIFY_CLIENT_ID"),
            redirect_uri: get("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            app_url: get("VIBE_APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            ticker: TickerConfig {
                interval: Duration::from_millis(interval_ms),
                step,
            },
        })
    }
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    Config::from_lookup(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.client_id, None);
        assert_eq!(config.ticker, TickerConfig::default());
        assert_eq!(config.ticker.interval, Duration::from_millis(300));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("VIBE_BACKEND_URL", "http://backend:9000"),
            ("SPOTIFY_CLIENT_ID", "abc123"),
            ("VIBE_TICK_INTERVAL_MS", "50"),
            ("VIBE_PROGRESS_STEP", "10"),
        ]))
        .unwrap();

        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.client_id.as_deref(), Some("abc123"));
        assert_eq!(config.ticker.interval, Duration::from_millis(50));
        assert_eq!(config.ticker.step, 10);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[("SPOTIFY_CLIENT_ID", "  ")])).unwrap();
        assert_eq!(config.client_id, None);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("VIBE_TICK_INTERVAL_MS", "fast")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("VIBE_PROGRESS_STEP", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("VIBE_PROGRESS_STEP", "101")])).is_err());
    }
}
