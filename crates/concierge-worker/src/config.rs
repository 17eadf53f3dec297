//! Worker configuration loading from file and environment variables.
//!
//! Configuration comes from an optional TOML file with environment-variable
//! overrides on top. Provider credentials are environment-only; the
//! `.env.local` file is loaded explicitly by `main` before this module runs,
//! so values from it are visible here like any other environment variable.

use concierge_agent::providers::ProviderCredentials;
use concierge_agent::LiveKitConfig;
use concierge_types::{SessionConfig, DEFAULT_PORT};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Control / liveness listener settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Liveness responder settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Room service connection settings.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Pipeline provider selection.
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider API keys.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the control listener.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on. `PORT` from the environment wins when set.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Liveness responder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Whether the fixed liveness page is served.
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
}

/// API keys for the pipeline providers.
#[derive(Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub groq_api_key: String,
    #[serde(default)]
    pub elevenlabs_api_key: String,
}

impl fmt::Debug for ProvidersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidersConfig")
            .field("groq_api_key", &"[REDACTED]")
            .field("elevenlabs_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "concierge_worker=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_health_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Provider credentials, passed by value into the session assembly.
    pub fn provider_credentials(&self) -> ProviderCredentials {
        ProviderCredentials {
            groq_api_key: self.providers.groq_api_key.clone(),
            elevenlabs_api_key: self.providers.elevenlabs_api_key.clone(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PORT` overrides `worker.port`
/// - `CONCIERGE_HOST` overrides `worker.host`
/// - `CONCIERGE_HEALTH` overrides `health.enabled` ("true"/"1" to enable)
/// - `LIVEKIT_URL` / `LIVEKIT_API_KEY` / `LIVEKIT_API_SECRET` override the
///   `livekit` section
/// - `GROQ_API_KEY` / `ELEVENLABS_API_KEY` override the `providers` section
/// - `CONCIERGE_LOG_LEVEL` overrides `logging.level`
/// - `CONCIERGE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies environment overrides through a lookup closure so tests can
/// exercise overrides without mutating process-wide state.
fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(port) = get("PORT") {
        if let Ok(parsed) = port.parse() {
            config.worker.port = parsed;
        }
    }
    if let Some(host) = get("CONCIERGE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.worker.host = parsed;
        }
    }
    if let Some(enabled) = get("CONCIERGE_HEALTH") {
        config.health.enabled = enabled == "true" || enabled == "1";
    }
    if let Some(url) = get("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = get("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = get("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Some(key) = get("GROQ_API_KEY") {
        config.providers.groq_api_key = key;
    }
    if let Some(key) = get("ELEVENLABS_API_KEY") {
        config.providers.elevenlabs_api_key = key;
    }
    if let Some(level) = get("CONCIERGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = get("CONCIERGE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_bind_port_8080() {
        let config = Config::default();
        assert_eq!(config.worker.port, 8080);
        assert_eq!(config.worker.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(config.health.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn port_env_override_wins() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("PORT", "9090")]));
        assert_eq!(config.worker.port, 9090);
    }

    #[test]
    fn unparseable_port_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("PORT", "not-a-port")]));
        assert_eq!(config.worker.port, 8080);
    }

    #[test]
    fn credential_overrides_reach_the_credentials() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("GROQ_API_KEY", "gsk_test"),
                ("ELEVENLABS_API_KEY", "xi_test"),
                ("LIVEKIT_URL", "wss://lk.example.com"),
                ("LIVEKIT_API_KEY", "lk_key"),
                ("LIVEKIT_API_SECRET", "lk_secret"),
            ]),
        );

        let creds = config.provider_credentials();
        assert_eq!(creds.groq_api_key, "gsk_test");
        assert_eq!(creds.elevenlabs_api_key, "xi_test");
        assert_eq!(config.livekit.url, "wss://lk.example.com");
        assert_eq!(config.livekit.api_secret, "lk_secret");
    }

    #[test]
    fn health_can_be_disabled_from_env() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("CONCIERGE_HEALTH", "0")]));
        assert!(!config.health.enabled);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/definitely/not/here/concierge.toml")).unwrap();
        assert_eq!(config.worker.port, 8080);
    }

    #[test]
    fn toml_file_sections_are_honored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[worker]
port = 3000

[health]
enabled = false

[session.llm]
model = "llama-3.1-8b-instant"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.worker.port, 3000);
        assert!(!config.health.enabled);
        assert_eq!(config.session.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep defaults.
        assert_eq!(config.session.tts.model, "eleven_turbo_v2_5");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [[[").unwrap();
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn providers_debug_is_redacted() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("GROQ_API_KEY", "gsk_secret_value")]));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("gsk_secret_value"));
    }
}
