//! Configuration module for the Glovebox Gateway
//!
//! Configuration is loaded from the environment (optionally seeded by a .env
//! file via `dotenvy` in main) or from a YAML file with environment values as
//! the fallback. Priority: YAML > ENV vars > defaults.
//!
//! # Example
//! ```rust,no_run
//! use glovebox_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment values as fallback
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::agents::{NotepadConfig, SearchConfig, TodolistConfig};
use crate::core::relay::{DEFAULT_REALTIME_MODEL, RealtimeVoice, RelaySettings};

mod yaml;

pub use yaml::YamlConfig;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Everything needed to run the gateway: listen address, the realtime model
/// service credentials, the side-system endpoints the tool agents call, and
/// security settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Directory served as the web client
    pub static_dir: PathBuf,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Realtime model service
    /// WebSocket endpoint of the model service (wss://...)
    pub realtime_endpoint: String,
    /// API key for the model service
    pub realtime_api_key: Option<String>,
    /// Model/deployment name
    pub realtime_model: String,
    /// Voice the assistant speaks with
    pub realtime_voice: String,
    /// Optional sampling temperature enforced on sessions
    pub realtime_temperature: Option<f32>,

    // Knowledge-base search backend
    pub search_endpoint: Option<String>,
    pub search_api_key: Option<String>,

    // Note backend endpoints
    pub notepad_base_url: Option<String>,
    pub notepad_append_url: Option<String>,
    pub notepad_replace_url: Option<String>,
    pub notepad_lookup_url: Option<String>,

    // Task backend endpoint
    pub todolist_create_task_url: Option<String>,

    // Browser speech SDK token issuance
    pub speech_signing_secret: Option<String>,
    pub speech_region: Option<String>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all).
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address. Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting. Default: 10
    pub rate_limit_burst_size: u32,
}

/// Zeroize secret fields when the config is dropped so credentials do not
/// linger in memory.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.realtime_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.search_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.speech_signing_secret {
            secret.zeroize();
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env_var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {raw}")))?,
            None => 8765,
        };
        let realtime_temperature = match env_var("REALTIME_TEMPERATURE") {
            Some(raw) => Some(raw.parse::<f32>().map_err(|_| {
                ConfigError::Invalid(format!("REALTIME_TEMPERATURE is not a number: {raw}"))
            })?),
            None => None,
        };
        let rate_limit_requests_per_second = match env_var("RATE_LIMIT_REQUESTS_PER_SECOND") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "RATE_LIMIT_REQUESTS_PER_SECOND is not a number: {raw}"
                ))
            })?,
            None => 60,
        };
        let rate_limit_burst_size = match env_var("RATE_LIMIT_BURST_SIZE") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ConfigError::Invalid(format!("RATE_LIMIT_BURST_SIZE is not a number: {raw}"))
            })?,
            None => 10,
        };

        let tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                ));
            }
        };

        let config = Self {
            host: env_var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            static_dir: PathBuf::from(env_var("STATIC_DIR").unwrap_or_else(|| "static".to_string())),
            tls,
            realtime_endpoint: env_var("REALTIME_API_ENDPOINT")
                .unwrap_or_else(|| "wss://api.openai.com/v1/realtime".to_string()),
            realtime_api_key: env_var("REALTIME_API_KEY"),
            realtime_model: env_var("REALTIME_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            realtime_voice: env_var("REALTIME_VOICE_CHOICE").unwrap_or_else(|| "alloy".to_string()),
            realtime_temperature,
            search_endpoint: env_var("SEARCH_API_ENDPOINT"),
            search_api_key: env_var("SEARCH_API_KEY"),
            notepad_base_url: env_var("NOTEPAD_BASE_URL"),
            notepad_append_url: env_var("NOTEPAD_APPEND_FILE_CONTENT_API_URL"),
            notepad_replace_url: env_var("NOTEPAD_REPLACE_FILE_CONTENT_API_URL"),
            notepad_lookup_url: env_var("NOTEPAD_GET_FILE_NAME_API_URL"),
            todolist_create_task_url: env_var("TODOLIST_CREATE_TASK_API_URL"),
            speech_signing_secret: env_var("SPEECH_SIGNING_SECRET"),
            speech_region: env_var("SPEECH_REGION"),
            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second,
            rate_limit_burst_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, with environment values as the
    /// fallback for anything the file does not set.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let overlay: YamlConfig = serde_yaml::from_str(&contents)?;

        let mut config = Self::from_env()?;

        if let Some(server) = overlay.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(dir) = server.static_dir {
                config.static_dir = PathBuf::from(dir);
            }
            if let Some(tls) = server.tls {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => {
                        return Err(ConfigError::Invalid(
                            "tls.cert_path and tls.key_path must be set together".to_string(),
                        ));
                    }
                }
            }
        }
        if let Some(realtime) = overlay.realtime {
            if let Some(endpoint) = realtime.endpoint {
                config.realtime_endpoint = endpoint;
            }
            if let Some(api_key) = realtime.api_key {
                config.realtime_api_key = Some(api_key);
            }
            if let Some(model) = realtime.model {
                config.realtime_model = model;
            }
            if let Some(voice) = realtime.voice {
                config.realtime_voice = voice;
            }
            if let Some(temperature) = realtime.temperature {
                config.realtime_temperature = Some(temperature);
            }
        }
        if let Some(search) = overlay.search {
            if let Some(endpoint) = search.endpoint {
                config.search_endpoint = Some(endpoint);
            }
            if let Some(api_key) = search.api_key {
                config.search_api_key = Some(api_key);
            }
        }
        if let Some(notepad) = overlay.notepad {
            if let Some(url) = notepad.base_url {
                config.notepad_base_url = Some(url);
            }
            if let Some(url) = notepad.append_url {
                config.notepad_append_url = Some(url);
            }
            if let Some(url) = notepad.replace_url {
                config.notepad_replace_url = Some(url);
            }
            if let Some(url) = notepad.lookup_url {
                config.notepad_lookup_url = Some(url);
            }
        }
        if let Some(todolist) = overlay.todolist {
            if let Some(url) = todolist.create_task_url {
                config.todolist_create_task_url = Some(url);
            }
        }
        if let Some(speech) = overlay.speech {
            if let Some(secret) = speech.signing_secret {
                config.speech_signing_secret = Some(secret);
            }
            if let Some(region) = speech.region {
                config.speech_region = Some(region);
            }
        }
        if let Some(security) = overlay.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }
        let endpoint = Url::parse(&self.realtime_endpoint).map_err(|e| {
            ConfigError::Invalid(format!(
                "realtime endpoint is not a valid URL ({}): {e}",
                self.realtime_endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(ConfigError::Invalid(format!(
                "realtime endpoint must use ws:// or wss://, got {}",
                endpoint.scheme()
            )));
        }
        if self.rate_limit_requests_per_second == 0 || self.rate_limit_burst_size == 0 {
            return Err(ConfigError::Invalid(
                "rate limit values must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The listen address as host:port.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Relay settings shared by every session, with the fixed instructions.
    pub fn relay_settings(&self, instructions: &str) -> RelaySettings {
        RelaySettings {
            endpoint: self.realtime_endpoint.clone(),
            api_key: self.realtime_api_key.clone().unwrap_or_default(),
            model: self.realtime_model.clone(),
            voice: RealtimeVoice::from_str_or_default(&self.realtime_voice),
            instructions: instructions.to_string(),
            temperature: self.realtime_temperature,
        }
    }

    /// Note backend endpoints, if fully configured.
    pub fn notepad(&self) -> Option<NotepadConfig> {
        Some(NotepadConfig {
            base_url: self.notepad_base_url.clone()?,
            append_url: self.notepad_append_url.clone()?,
            replace_url: self.notepad_replace_url.clone()?,
            lookup_url: self.notepad_lookup_url.clone()?,
        })
    }

    /// Task backend endpoint, if configured.
    pub fn todolist(&self) -> Option<TodolistConfig> {
        Some(TodolistConfig {
            create_task_url: self.todolist_create_task_url.clone()?,
        })
    }

    /// Knowledge-base backend, if configured.
    pub fn search(&self) -> Option<SearchConfig> {
        Some(SearchConfig {
            endpoint: self.search_endpoint.clone()?,
            api_key: self.search_api_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "STATIC_DIR",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "REALTIME_API_ENDPOINT",
        "REALTIME_API_KEY",
        "REALTIME_DEPLOYMENT",
        "REALTIME_VOICE_CHOICE",
        "REALTIME_TEMPERATURE",
        "SEARCH_API_ENDPOINT",
        "SEARCH_API_KEY",
        "NOTEPAD_BASE_URL",
        "NOTEPAD_APPEND_FILE_CONTENT_API_URL",
        "NOTEPAD_REPLACE_FILE_CONTENT_API_URL",
        "NOTEPAD_GET_FILE_NAME_API_URL",
        "TODOLIST_CREATE_TASK_API_URL",
        "SPEECH_SIGNING_SECRET",
        "SPEECH_REGION",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        "RATE_LIMIT_BURST_SIZE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8765);
        assert_eq!(config.realtime_model, "gpt-4o-realtime-preview");
        assert_eq!(config.realtime_voice, "alloy");
        assert!(config.notepad().is_none());
        assert!(config.search().is_none());
        assert!(!config.is_tls_enabled());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("PORT", "9000");
            std::env::set_var("REALTIME_VOICE_CHOICE", "verse");
            std::env::set_var("REALTIME_API_KEY", "sk-test");
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.realtime_voice, "verse");
        assert_eq!(config.realtime_api_key.as_deref(), Some("sk-test"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_endpoint_rejected() {
        clear_env();
        unsafe { std::env::set_var("REALTIME_API_ENDPOINT", "https://api.openai.com/v1") };
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_yaml_overlays_env() {
        clear_env();
        unsafe { std::env::set_var("PORT", "9000") };

        let yaml = r#"
server:
  host: "0.0.0.0"
realtime:
  model: "gpt-4o-mini-realtime-preview"
  voice: "sage"
notepad:
  base_url: "https://notes.example.com"
  append_url: "https://hooks.example.com/append"
  replace_url: "https://hooks.example.com/replace"
  lookup_url: "https://hooks.example.com/lookup"
"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), yaml).unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        // env value survives where the file is silent
        assert_eq!(config.port, 9000);
        assert_eq!(config.realtime_model, "gpt-4o-mini-realtime-preview");
        assert_eq!(config.realtime_voice, "sage");
        let notepad = config.notepad().unwrap();
        assert_eq!(notepad.base_url, "https://notes.example.com");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_partial_notepad_config_is_none() {
        clear_env();
        unsafe { std::env::set_var("NOTEPAD_BASE_URL", "https://notes.example.com") };
        let config = ServerConfig::from_env().unwrap();
        assert!(config.notepad().is_none());
        clear_env();
    }
}
