use serde::Deserialize;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything absent
/// falls back to the value loaded from the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8765
///
/// realtime:
///   endpoint: "wss://api.openai.com/v1/realtime"
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview"
///   voice: "alloy"
///
/// search:
///   endpoint: "https://search.example.com/lab-index"
///   api_key: "search-key"
///
/// notepad:
///   base_url: "https://notes.example.com/lab"
///   append_url: "https://hooks.example.com/append-file-content"
///   replace_url: "https://hooks.example.com/replace-file-content"
///   lookup_url: "https://hooks.example.com/get-file-name"
///
/// todolist:
///   create_task_url: "https://hooks.example.com/create-task"
///
/// speech:
///   signing_secret: "jwt-signing-secret"
///   region: "westeurope"
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub search: Option<SearchYaml>,
    pub notepad: Option<NotepadYaml>,
    pub todolist: Option<TodolistYaml>,
    pub speech: Option<SpeechYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Model service configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
}

/// Knowledge-base backend from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SearchYaml {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Note backend endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NotepadYaml {
    pub base_url: Option<String>,
    pub append_url: Option<String>,
    pub replace_url: Option<String>,
    pub lookup_url: Option<String>,
}

/// Task backend endpoint from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TodolistYaml {
    pub create_task_url: Option<String>,
}

/// Speech token issuance from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SpeechYaml {
    pub signing_secret: Option<String>,
    pub region: Option<String>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}
