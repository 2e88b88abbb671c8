use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Coordinator endpoint every transport connects to
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Views on which a transport may exist
    #[serde(default = "default_allowed_views")]
    pub allowed_views: Vec<String>,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub transport: TransportKind,
}

/// What happens to messages and connections that are lost.
///
/// `Disabled` is the only policy: nothing is retried, buffered or reconnected.
/// Losses are logged so callers can layer their own policy on top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    #[default]
    Disabled,
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicy::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Websocket,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_allowed_views() -> Vec<String> {
    vec!["/lobby".to_string(), "/game".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("session.ws_url", default_ws_url())?
            .set_default("session.allowed_views", default_allowed_views())?
            .set_default("session.retry_policy", "disabled")?
            .set_default("session.transport", "websocket")?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // LOBBY_SESSION__WS_URL, LOBBY_SESSION__ALLOWED_VIEWS=/lobby,/game, LOBBY_LOGGING__FORMAT, ...
            .add_source(
                Environment::with_prefix("LOBBY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("session.allowed_views"),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            allowed_views: default_allowed_views(),
            retry_policy: RetryPolicy::default(),
            transport: TransportKind::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_values() {
        let session = SessionConfig::default();
        assert_eq!(session.ws_url, "ws://localhost:8080/ws");
        assert_eq!(session.allowed_views, vec!["/lobby", "/game"]);
        assert_eq!(session.retry_policy, RetryPolicy::Disabled);
        assert_eq!(session.transport, TransportKind::Websocket);

        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[session]\nws_url = \"wss://coordinator.example/ws\"\ntransport = \"memory\"\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.session.ws_url, "wss://coordinator.example/ws");
        assert_eq!(settings.session.transport, TransportKind::Memory);
        assert_eq!(settings.session.allowed_views, vec!["/lobby", "/game"]);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_unknown_retry_policy_rejected() {
        let result: Result<Settings, _> = Config::builder()
            .add_source(File::from_str(
                "[session]\nretry_policy = \"exponential\"\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize();

        assert!(result.is_err());
    }

    #[test]
    fn test_json_log_format() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[logging]\nformat = \"json\"\nlevel = \"debug\"\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "debug");
    }
}
