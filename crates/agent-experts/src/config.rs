//! Settings loaded from the environment.

use std::collections::BTreeSet;
use std::env;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::time::Duration;

/// Default OpenWeatherMap endpoint.
pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
/// Default Nominatim endpoint.
pub const DEFAULT_NOMINATIM_BASE_URL: &str =
    "https://nominatim.openstreetmap.org";
/// Default Wikipedia endpoint.
pub const DEFAULT_WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";
/// Default CoinGecko endpoint.
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// A setting that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    /// The environment variable.
    pub key: &'static str,
    /// The raw value.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

/// Where the tools reach their upstream APIs.
#[derive(Clone)]
pub struct Upstreams {
    /// OpenWeatherMap API key, the weather tool refuses to run without it.
    pub openweather_api_key: Option<String>,
    /// OpenWeatherMap base URL.
    pub openweather_base_url: String,
    /// Nominatim base URL.
    pub nominatim_base_url: String,
    /// Wikipedia base URL.
    pub wikipedia_base_url: String,
    /// CoinGecko base URL.
    pub coingecko_base_url: String,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            openweather_base_url: DEFAULT_OPENWEATHER_BASE_URL.to_owned(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.to_owned(),
            wikipedia_base_url: DEFAULT_WIKIPEDIA_BASE_URL.to_owned(),
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_owned(),
        }
    }
}

impl Debug for Upstreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstreams")
            .field(
                "openweather_api_key",
                &self.openweather_api_key.as_ref().map(|_| "<deducted>"),
            )
            .field("openweather_base_url", &self.openweather_base_url)
            .field("nominatim_base_url", &self.nominatim_base_url)
            .field("wikipedia_base_url", &self.wikipedia_base_url)
            .field("coingecko_base_url", &self.coingecko_base_url)
            .finish()
    }
}

/// Application settings.
#[derive(Clone)]
pub struct Settings {
    /// Name reported by the API.
    pub app_name: String,
    /// Version reported by `/health`.
    pub app_version: String,
    /// Deployment environment, e.g. `development` or `production`.
    pub environment: String,
    /// Address to listen on.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// CORS origins, `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Accepted API keys.
    pub api_keys: BTreeSet<String>,
    /// Whether requests must carry one of [`api_keys`](Self::api_keys).
    pub require_api_key: bool,
    /// Requests allowed per client within
    /// [`rate_limit_window`](Self::rate_limit_window).
    pub rate_limit_requests: usize,
    /// Length of the rate limiting window.
    pub rate_limit_window: Duration,
    /// Longest accepted agent query, in characters.
    pub max_query_length: usize,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,
    /// API key of the hosted model, agents are disabled without it.
    pub google_api_key: Option<String>,
    /// Model name override.
    pub gemini_model: Option<String>,
    /// Model endpoint override.
    pub gemini_base_url: Option<String>,
    /// Upstream APIs used by the tools.
    pub upstreams: Upstreams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "AI Agent Experts API".to_owned(),
            app_version: "1.0.0".to_owned(),
            environment: "development".to_owned(),
            host: "0.0.0.0".to_owned(),
            port: 8000,
            allowed_origins: vec!["*".to_owned()],
            api_keys: parse_list("demo-key-123,test-key-456")
                .into_iter()
                .collect(),
            require_api_key: false,
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(3600),
            max_query_length: 1000,
            log_level: "INFO".to_owned(),
            google_api_key: None,
            gemini_model: None,
            gemini_base_url: None,
            upstreams: Upstreams::default(),
        }
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("api_keys", &format_args!("<{} keys>", self.api_keys.len()))
            .field("require_api_key", &self.require_api_key)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("max_query_length", &self.max_query_length)
            .field("log_level", &self.log_level)
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "<deducted>"),
            )
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("upstreams", &self.upstreams)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Load `.env` (e.g. with `dotenvy`) before calling this if needed.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, unset or blank variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Self::default();

        if let Some(v) = get("APP_NAME") {
            settings.app_name = v;
        }
        if let Some(v) = get("APP_VERSION") {
            settings.app_version = v;
        }
        if let Some(v) = get("ENVIRONMENT") {
            settings.environment = v;
        }
        if let Some(v) = get("HOST") {
            settings.host = v;
        }
        if let Some(v) = get("PORT") {
            settings.port = parse_number("PORT", v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            settings.allowed_origins = if v == "*" {
                vec![v]
            } else {
                parse_list(&v)
            };
        }
        if let Some(v) = get("API_KEYS") {
            settings.api_keys = parse_list(&v).into_iter().collect();
        }
        if let Some(v) = get("REQUIRE_API_KEY") {
            settings.require_api_key = parse_bool("REQUIRE_API_KEY", v)?;
        }
        if let Some(v) = get("RATE_LIMIT_REQUESTS") {
            settings.rate_limit_requests =
                parse_number("RATE_LIMIT_REQUESTS", v)?;
        }
        if let Some(v) = get("RATE_LIMIT_WINDOW") {
            let secs: u64 = parse_number("RATE_LIMIT_WINDOW", v)?;
            settings.rate_limit_window = Duration::from_secs(secs);
        }
        if let Some(v) = get("MAX_QUERY_LENGTH") {
            settings.max_query_length = parse_number("MAX_QUERY_LENGTH", v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            settings.log_level = v;
        }
        settings.google_api_key = get("GOOGLE_API_KEY");
        settings.gemini_model = get("GEMINI_MODEL");
        settings.gemini_base_url = get("GEMINI_BASE_URL");

        let upstreams = &mut settings.upstreams;
        upstreams.openweather_api_key = get("OPENWEATHER_API_KEY");
        if let Some(v) = get("OPENWEATHER_BASE_URL") {
            upstreams.openweather_base_url = v;
        }
        if let Some(v) = get("NOMINATIM_BASE_URL") {
            upstreams.nominatim_base_url = v;
        }
        if let Some(v) = get("WIKIPEDIA_BASE_URL") {
            upstreams.wikipedia_base_url = v;
        }
        if let Some(v) = get("COINGECKO_BASE_URL") {
            upstreams.coingecko_base_url = v;
        }

        Ok(settings)
    }

    /// Whether this is a production deployment.
    #[inline]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Whether CORS accepts any origin.
    #[inline]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_number<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|err: T::Err| ConfigError {
        key,
        reason: err.to_string(),
        value,
    })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            key,
            value,
            reason: "expected a boolean".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.app_name, "AI Agent Experts API");
        assert_eq!(settings.port, 8000);
        assert!(settings.allows_any_origin());
        assert!(!settings.require_api_key);
        assert!(settings.api_keys.contains("demo-key-123"));
        assert!(settings.api_keys.contains("test-key-456"));
        assert_eq!(settings.rate_limit_requests, 100);
        assert_eq!(settings.rate_limit_window, Duration::from_secs(3600));
        assert_eq!(settings.max_query_length, 1000);
        assert!(settings.google_api_key.is_none());
        assert_eq!(
            settings.upstreams.coingecko_base_url,
            DEFAULT_COINGECKO_BASE_URL
        );
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("PORT", "9000"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("API_KEYS", "k1, ,k2"),
            ("REQUIRE_API_KEY", "True"),
            ("RATE_LIMIT_WINDOW", "60"),
            ("ENVIRONMENT", "Production"),
            ("GOOGLE_API_KEY", "secret"),
            ("OPENWEATHER_BASE_URL", "http://localhost:1234"),
        ])
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(
            settings.allowed_origins,
            ["https://a.example", "https://b.example"]
        );
        assert!(!settings.allows_any_origin());
        assert_eq!(settings.api_keys.len(), 2);
        assert!(settings.require_api_key);
        assert_eq!(settings.rate_limit_window, Duration::from_secs(60));
        assert!(settings.is_production());
        assert_eq!(
            settings.upstreams.openweather_base_url,
            "http://localhost:1234"
        );
        assert!(!format!("{settings:?}").contains("secret"));
    }

    #[test]
    fn test_invalid_values() {
        let err = settings_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.key, "PORT");

        let err = settings_from(&[("REQUIRE_API_KEY", "maybe")]).unwrap_err();
        assert_eq!(err.key, "REQUIRE_API_KEY");
        assert_eq!(err.value, "maybe");
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let settings =
            settings_from(&[("PORT", "  "), ("GOOGLE_API_KEY", "")]).unwrap();
        assert_eq!(settings.port, 8000);
        assert!(settings.google_api_key.is_none());
    }
}
