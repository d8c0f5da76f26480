//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Retry/backoff policy, one per provider
///
/// Delays follow `base * multiplier^attempt` capped at `max`, plus jitter
/// drawn uniformly from `[jitter_min_frac, jitter_max_frac]` of the delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before the first retry, milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Exponential growth factor
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Lower bound of the jitter fraction
    #[serde(default = "default_jitter_min")]
    pub jitter_min_frac: f64,
    /// Upper bound of the jitter fraction
    #[serde(default = "default_jitter_max")]
    pub jitter_max_frac: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter_min() -> f64 {
    0.1
}
fn default_jitter_max() -> f64 {
    0.3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_min_frac: default_jitter_min(),
            jitter_max_frac: default_jitter_max(),
        }
    }
}

impl RetryPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// One configured provider, immutable after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider name (registry key)
    pub name: String,
    /// Lower priority is tried first
    #[serde(default)]
    pub priority: u32,
    /// Disabled providers never enter the fallback chain
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Reference to a credential (environment variable or secret key),
    /// never the secret itself
    #[serde(default)]
    pub credentials_ref: Option<String>,
    /// Service endpoint for HTTP adapters
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Provider-specific settings, passed through opaquely
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
    /// Retry policy for this provider's calls
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_enabled() -> bool {
    true
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            enabled: true,
            credentials_ref: None,
            endpoint: None,
            settings: HashMap::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// A provider without a credential reference cannot authenticate and is
    /// filtered out of the active list
    pub fn has_credentials(&self) -> bool {
        self.credentials_ref.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

/// Per-user sliding-window rate limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Admitted requests per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length, seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    30
}
fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// STT result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Entry lifetime, seconds; clamped to [`CacheSettings::MAX_TTL`]
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheSettings {
    /// Hard upper bound on cache entry lifetime (7 days)
    pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Configured TTL, clamped to the maximum
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs).min(Self::MAX_TTL)
    }
}

/// Everything the engine needs for one agent
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VoiceSettings {
    /// Configured providers, any order; the engine sorts by priority
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    /// Deadline for a single provider attempt, milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_attempt_timeout_ms() -> u64 {
    30_000
}

impl VoiceSettings {
    /// Load from a TOML file with `VOICE_` environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("VOICE").separator("__"))
            .build()?
            .try_deserialize::<Self>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject duplicate provider names and nonsense retry/jitter bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for p in &self.providers {
            if !seen.insert(p.name.as_str()) {
                return Err(ConfigError::DuplicateProvider(p.name.clone()));
            }
            if p.retry.max_attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}': max_attempts must be at least 1",
                    p.name
                )));
            }
            if p.retry.jitter_min_frac > p.retry.jitter_max_frac {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}': jitter_min_frac exceeds jitter_max_frac",
                    p.name
                )));
            }
        }
        if self.rate_limit.enabled && self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests must be at least 1 when enabled".into(),
            ));
        }
        Ok(())
    }

    /// Enabled, credentialed providers sorted ascending by priority.
    /// This is the only list the coordinator ever iterates.
    pub fn active_providers(&self) -> Vec<&ProviderDescriptor> {
        let mut active: Vec<_> = self
            .providers
            .iter()
            .filter(|p| {
                if !p.enabled {
                    tracing::debug!(provider = %p.name, "skipping disabled provider");
                    return false;
                }
                if !p.has_credentials() {
                    tracing::warn!(
                        provider = %p.name,
                        "provider has no credential reference, excluding from fallback chain"
                    );
                    return false;
                }
                true
            })
            .collect();
        active.sort_by_key(|p| p.priority);
        active
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, priority: u32, enabled: bool) -> ProviderDescriptor {
        let mut d = ProviderDescriptor::new(name, priority);
        d.enabled = enabled;
        d.credentials_ref = Some(format!("{}_API_KEY", name.to_uppercase()));
        d
    }

    #[test]
    fn test_active_providers_sorted_and_filtered() {
        let settings = VoiceSettings {
            providers: vec![
                descriptor("google", 3, true),
                descriptor("yandex", 1, true),
                descriptor("openai", 2, true),
                descriptor("azure", 0, false),
            ],
            ..Default::default()
        };
        let names: Vec<_> = settings
            .active_providers()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["yandex", "openai", "google"]);
    }

    #[test]
    fn test_missing_credentials_excluded() {
        let mut no_creds = ProviderDescriptor::new("broke", 0);
        no_creds.credentials_ref = None;
        let settings = VoiceSettings {
            providers: vec![no_creds, descriptor("openai", 1, true)],
            ..Default::default()
        };
        let active = settings.active_providers();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "openai");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let settings = VoiceSettings {
            providers: vec![descriptor("openai", 0, true), descriptor("openai", 1, true)],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::DuplicateProvider(_))
        ));
    }

    #[test]
    fn test_cache_ttl_clamped() {
        let cache = CacheSettings {
            enabled: true,
            ttl_secs: 365 * 24 * 3600,
        };
        assert_eq!(cache.ttl(), CacheSettings::MAX_TTL);
    }

    #[test]
    fn test_from_toml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
attempt_timeout_ms = 5000

[[providers]]
name = "openai"
priority = 1
credentials_ref = "OPENAI_API_KEY"

[rate_limit]
max_requests = 10
window_secs = 30

[cache]
enabled = true
ttl_secs = 120
"#
        )
        .unwrap();

        let settings = VoiceSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.providers.len(), 1);
        assert_eq!(settings.rate_limit.max_requests, 10);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(120));
        assert_eq!(settings.attempt_timeout(), Duration::from_millis(5000));
    }
}
