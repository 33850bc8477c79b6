//! Runtime configuration loaded from `GROUNDWATCH_*` environment variables.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default CGWB (Central Ground Water Board) base URL.
pub const DEFAULT_CGWB_BASE_URL: &str = "https://cgwb.gov.in";

/// Default India-WRIS base URL.
pub const DEFAULT_WRIS_BASE_URL: &str = "https://indiawris.gov.in";

/// Default IMD (India Meteorological Department) base URL.
pub const DEFAULT_IMD_BASE_URL: &str = "https://mausam.imd.gov.in";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_NWIC_REQUEST_DELAY_MS: u64 = 250;

/// Per-domain NWIC resource ID overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOverrides {
    pub gw_level_ts: Option<String>,
    pub rainfall: Option<String>,
    pub water_quality: Option<String>,
}

/// NWIC (National Water Informatics Centre) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NwicConfig {
    /// Resource query endpoint. NWIC is a no-op when unset.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub resources: ResourceOverrides,
    /// Pause between sequential resource queries.
    pub request_delay: Duration,
}

impl Default for NwicConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            resources: ResourceOverrides::default(),
            request_delay: Duration::from_millis(DEFAULT_NWIC_REQUEST_DELAY_MS),
        }
    }
}

/// Government endpoint base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernmentConfig {
    pub cgwb_base_url: String,
    pub wris_base_url: String,
    pub imd_base_url: String,
}

impl Default for GovernmentConfig {
    fn default() -> Self {
        Self {
            cgwb_base_url: DEFAULT_CGWB_BASE_URL.to_string(),
            wris_base_url: DEFAULT_WRIS_BASE_URL.to_string(),
            imd_base_url: DEFAULT_IMD_BASE_URL.to_string(),
        }
    }
}

impl GovernmentConfig {
    /// Point every government endpoint at one host (for testing).
    pub fn single_host(base_url: &str) -> Self {
        Self {
            cgwb_base_url: base_url.to_string(),
            wris_base_url: base_url.to_string(),
            imd_base_url: base_url.to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Serve real provider data instead of the synthetic roster.
    pub use_real_data: bool,
    pub nwic: NwicConfig,
    pub government: GovernmentConfig,
    /// Timeout applied to every outbound request.
    pub request_timeout: Duration,
    /// How long a fetched station list is served from cache.
    pub cache_duration: Duration,
    /// Seed for the synthetic data generator; entropy when unset.
    pub mock_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            use_real_data: false,
            nwic: NwicConfig::default(),
            government: GovernmentConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_duration: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            mock_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = GovernmentConfig::default();

        let port = parse_number(&lookup, "GROUNDWATCH_PORT")?.unwrap_or(DEFAULT_PORT);
        let use_real_data = parse_bool(&lookup, "GROUNDWATCH_USE_REAL_DATA")?.unwrap_or(false);

        let nwic = NwicConfig {
            base_url: text("GROUNDWATCH_NWIC_BASE_URL"),
            api_key: text("GROUNDWATCH_NWIC_API_KEY"),
            resources: ResourceOverrides {
                gw_level_ts: text("GROUNDWATCH_NWIC_GW_LEVEL_RESOURCE_ID"),
                rainfall: text("GROUNDWATCH_NWIC_RAINFALL_RESOURCE_ID"),
                water_quality: text("GROUNDWATCH_NWIC_WATER_QUALITY_RESOURCE_ID"),
            },
            request_delay: Duration::from_millis(
                parse_number(&lookup, "GROUNDWATCH_NWIC_REQUEST_DELAY_MS")?
                    .unwrap_or(DEFAULT_NWIC_REQUEST_DELAY_MS),
            ),
        };

        let government = GovernmentConfig {
            cgwb_base_url: text("GROUNDWATCH_CGWB_BASE_URL").unwrap_or(defaults.cgwb_base_url),
            wris_base_url: text("GROUNDWATCH_WRIS_BASE_URL").unwrap_or(defaults.wris_base_url),
            imd_base_url: text("GROUNDWATCH_IMD_BASE_URL").unwrap_or(defaults.imd_base_url),
        };

        let request_timeout = Duration::from_secs(
            parse_number(&lookup, "GROUNDWATCH_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let cache_duration = Duration::from_secs(
            parse_number(&lookup, "GROUNDWATCH_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );
        let mock_seed = parse_number(&lookup, "GROUNDWATCH_MOCK_SEED")?;

        Ok(Self {
            port,
            use_real_data,
            nwic,
            government,
            request_timeout,
            cache_duration,
            mock_seed,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
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
    fn test_defaults_when_environment_empty() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.cache_duration, Duration::from_secs(300));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.nwic.base_url.is_none());
        assert!(!config.use_real_data);
    }

    #[test]
    fn test_reads_all_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROUNDWATCH_PORT", "8080"),
            ("GROUNDWATCH_USE_REAL_DATA", "yes"),
            ("GROUNDWATCH_NWIC_BASE_URL", "https://nwic.example/query"),
            ("GROUNDWATCH_NWIC_API_KEY", "secret"),
            ("GROUNDWATCH_NWIC_RAINFALL_RESOURCE_ID", "rain-1"),
            ("GROUNDWATCH_NWIC_REQUEST_DELAY_MS", "0"),
            ("GROUNDWATCH_CGWB_BASE_URL", "http://localhost:9000"),
            ("GROUNDWATCH_CACHE_TTL_SECS", "60"),
            ("GROUNDWATCH_MOCK_SEED", "42"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.use_real_data);
        assert_eq!(
            config.nwic.base_url.as_deref(),
            Some("https://nwic.example/query")
        );
        assert_eq!(config.nwic.api_key.as_deref(), Some("secret"));
        assert_eq!(config.nwic.resources.rainfall.as_deref(), Some("rain-1"));
        assert!(config.nwic.resources.gw_level_ts.is_none());
        assert_eq!(config.nwic.request_delay, Duration::ZERO);
        assert_eq!(config.government.cgwb_base_url, "http://localhost:9000");
        assert_eq!(config.government.imd_base_url, DEFAULT_IMD_BASE_URL);
        assert_eq!(config.cache_duration, Duration::from_secs(60));
        assert_eq!(config.mock_seed, Some(42));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROUNDWATCH_NWIC_BASE_URL", "   "),
            ("GROUNDWATCH_USE_REAL_DATA", ""),
        ]))
        .unwrap();

        assert!(config.nwic.base_url.is_none());
        assert!(!config.use_real_data);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("GROUNDWATCH_PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "GROUNDWATCH_PORT",
                value: "eighty".to_string()
            }
        );

        let err =
            Config::from_lookup(lookup_from(&[("GROUNDWATCH_USE_REAL_DATA", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GROUNDWATCH_USE_REAL_DATA", .. }));
    }
}
