//! Server configuration loading from file and environment variables.

use closeloop_analysis::AnalysisConfig;
use closeloop_telephony::TwilioConfig;
use closeloop_voice::VoiceAgentConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Public origin of this deployment (e.g. `https://app.example.com`).
    /// The telephony provider delivers webhooks here, so it must be a
    /// publicly reachable URL.
    #[serde(default)]
    pub public_origin: String,

    /// Twilio credentials.
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Voice-agent platform credentials.
    #[serde(default)]
    pub voice_agent: VoiceAgentConfig,

    /// Language-model credentials for live analysis.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "closeloop_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "closeloop.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
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
/// - `CLOSELOOP_HOST` / `CLOSELOOP_PORT` override `server.host` / `server.port`
/// - `CLOSELOOP_DB_PATH` overrides `database.path`
/// - `CLOSELOOP_LOG_LEVEL` / `CLOSELOOP_LOG_JSON` override the logging section
/// - `CLOSELOOP_PUBLIC_ORIGIN` overrides `public_origin`
/// - `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN` / `TWILIO_PHONE_NUMBER`
///   override the Twilio credentials (the provider's conventional names)
/// - `ELEVENLABS_API_KEY` / `ELEVENLABS_AGENT_ID` override the voice-agent
///   credentials
/// - `ANTHROPIC_API_KEY` overrides the analysis credential
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

    // Environment variable overrides
    if let Ok(host) = std::env::var("CLOSELOOP_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("CLOSELOOP_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("CLOSELOOP_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("CLOSELOOP_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("CLOSELOOP_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(origin) = std::env::var("CLOSELOOP_PUBLIC_ORIGIN") {
        config.public_origin = origin;
    }
    if let Ok(sid) = std::env::var("TWILIO_ACCOUNT_SID") {
        config.twilio.account_sid = sid;
    }
    if let Ok(token) = std::env::var("TWILIO_AUTH_TOKEN") {
        config.twilio.auth_token = token;
    }
    if let Ok(number) = std::env::var("TWILIO_PHONE_NUMBER") {
        config.twilio.from_number = number;
    }
    if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
        config.voice_agent.api_key = key;
    }
    if let Ok(agent) = std::env::var("ELEVENLABS_AGENT_ID") {
        config.voice_agent.agent_id = agent;
    }
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        config.analysis.api_key = key;
    }

    Ok(config)
}
