//! Pipeline configuration.
//!
//! Built once at process start and threaded through constructors. Nothing
//! below the binary reads the environment.

use secrecy::{ExposeSecret, SecretBox};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scoring::DEFAULT_LOW_CONFIDENCE_THRESHOLD;

/// Default rendering service endpoint (Firecrawl-compatible scrape API).
pub const DEFAULT_RENDER_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Browser-like user agent for direct fetches.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// An API key that never appears in logs or debug output.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Fetch strategy settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub direct_timeout: Duration,
    pub render_timeout: Duration,
    /// Delay the rendering service waits for scripts before capturing
    pub render_wait: Duration,
    pub markup_timeout: Duration,
    pub render_api_url: String,
    /// Rendering is skipped when no key is configured
    pub render_api_key: Option<SecretString>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            direct_timeout: Duration::from_secs(12),
            render_timeout: Duration::from_secs(60),
            render_wait: Duration::from_millis(3000),
            markup_timeout: Duration::from_secs(20),
            render_api_url: DEFAULT_RENDER_API_URL.to_string(),
            render_api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Cap on new image rows inserted per invocation
    pub max_images_per_run: usize,
    pub low_confidence_threshold: f64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_images_per_run: 50,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Batch runner settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Politeness delay between external-site requests
    pub pacing: Duration,
    /// Hard wall-clock budget for one invocation
    pub invocation_budget: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            pacing: Duration::from_millis(1500),
            invocation_budget: Duration::from_secs(150),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub persistence: PersistenceConfig,
    pub batch: BatchConfig,
    pub database_url: Option<String>,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let render_api_key = get("RENDER_API_KEY")
            .or_else(|| get("FIRECRAWL_API_KEY"))
            .map(SecretString::new);

        let fetch = FetchConfig {
            direct_timeout: secs(&get, "DIRECT_FETCH_TIMEOUT_SECS", defaults.fetch.direct_timeout)?,
            render_timeout: secs(&get, "RENDER_TIMEOUT_SECS", defaults.fetch.render_timeout)?,
            render_wait: millis(&get, "RENDER_WAIT_MS", defaults.fetch.render_wait)?,
            markup_timeout: secs(&get, "MARKUP_FETCH_TIMEOUT_SECS", defaults.fetch.markup_timeout)?,
            render_api_url: get("RENDER_API_URL").unwrap_or(defaults.fetch.render_api_url),
            render_api_key,
            user_agent: defaults.fetch.user_agent,
        };

        let persistence = PersistenceConfig {
            max_images_per_run: parsed(
                &get,
                "MAX_IMAGES_PER_RUN",
                defaults.persistence.max_images_per_run,
            )?,
            ..defaults.persistence
        };

        let batch = BatchConfig {
            batch_size: parsed(&get, "BATCH_SIZE", defaults.batch.batch_size)?,
            pacing: millis(&get, "BATCH_PACING_MS", defaults.batch.pacing)?,
            invocation_budget: secs(&get, "INVOCATION_BUDGET_SECS", defaults.batch.invocation_budget)?,
        };

        Ok(Self {
            fetch,
            persistence,
            batch,
            database_url: get("DATABASE_URL"),
        })
    }

    /// The database URL, required by the binary.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing { name: "DATABASE_URL" })
    }
}

fn parsed<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parsed(get, name, default.as_secs()).map(Duration::from_secs)
}

fn millis<G>(get: &G, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parsed(get, name, default.as_millis() as u64).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.fetch.direct_timeout, Duration::from_secs(12));
        assert_eq!(config.persistence.max_images_per_run, 50);
        assert!(config.fetch.render_api_key.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_overrides_parse() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("RENDER_TIMEOUT_SECS", "90"),
            ("BATCH_PACING_MS", "250"),
            ("MAX_IMAGES_PER_RUN", "10"),
            ("DATABASE_URL", "postgres://localhost/listings"),
        ]))
        .unwrap();

        assert_eq!(config.fetch.render_timeout, Duration::from_secs(90));
        assert_eq!(config.batch.pacing, Duration::from_millis(250));
        assert_eq!(config.persistence.max_images_per_run, 10);
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/listings");
    }

    #[test]
    fn test_render_key_falls_back_to_firecrawl() {
        let config =
            PipelineConfig::from_lookup(lookup(&[("FIRECRAWL_API_KEY", "fc-123")])).unwrap();
        let key = config.fetch.render_api_key.unwrap();
        assert_eq!(key.expose(), "fc-123");
        assert_eq!(format!("{:?}", key), "[REDACTED]");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("BATCH_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "BATCH_SIZE", .. }));
    }

    #[test]
    fn test_missing_database_url() {
        let config = PipelineConfig::default();
        assert!(matches!(
            config.require_database_url(),
            Err(ConfigError::Missing { .. })
        ));
    }
}
