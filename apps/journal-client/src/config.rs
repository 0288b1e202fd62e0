//! Client Configuration
//!
//! Configuration for the journal client, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// REST request settings.
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Base URL of the journal REST API.
    pub base_url: String,
    /// Abort timeout applied uniformly to every REST call.
    pub timeout: Duration,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// Paginated list view settings.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    /// Quiet interval after the last keystroke before a search commits.
    pub search_debounce: Duration,
    /// Default page size for list views.
    pub page_size: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            page_size: 10,
        }
    }
}

/// Live notification channel settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// WebSocket URL of the notification channel.
    pub url: String,
    /// Connection attempts before the channel stays disconnected.
    pub max_connect_attempts: u32,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Timeout for the join acknowledgement after connecting.
    pub join_timeout: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000/ws".to_string(),
            max_connect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            join_timeout: Duration::from_secs(10),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// REST request settings.
    pub request: RequestSettings,
    /// Paginated list view settings.
    pub query: QuerySettings,
    /// Notification channel settings.
    pub channel: ChannelSettings,
    /// Path of the persisted session file (`None` = in-memory only).
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `JOURNAL_API_URL` is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("JOURNAL_API_URL")
            .unwrap_or_else(|_| RequestSettings::default().base_url);
        if base_url.is_empty() {
            return Err(ConfigError::EmptyValue("JOURNAL_API_URL".to_string()));
        }

        // Default the socket endpoint to the API host unless overridden.
        let ws_url = std::env::var("JOURNAL_WS_URL").unwrap_or_else(|_| derive_ws_url(&base_url));

        let request = RequestSettings {
            base_url,
            timeout: parse_env_duration_secs(
                "JOURNAL_REQUEST_TIMEOUT_SECS",
                RequestSettings::default().timeout,
            ),
        };

        let query = QuerySettings {
            search_debounce: parse_env_duration_millis(
                "JOURNAL_SEARCH_DEBOUNCE_MS",
                QuerySettings::default().search_debounce,
            ),
            page_size: parse_env_u32("JOURNAL_PAGE_SIZE", QuerySettings::default().page_size),
        };

        let channel = ChannelSettings {
            url: ws_url,
            max_connect_attempts: parse_env_u32(
                "JOURNAL_WS_MAX_ATTEMPTS",
                ChannelSettings::default().max_connect_attempts,
            ),
            reconnect_delay: parse_env_duration_millis(
                "JOURNAL_WS_RECONNECT_DELAY_MS",
                ChannelSettings::default().reconnect_delay,
            ),
            join_timeout: parse_env_duration_secs(
                "JOURNAL_WS_JOIN_TIMEOUT_SECS",
                ChannelSettings::default().join_timeout,
            ),
        };

        let session_file = std::env::var("JOURNAL_SESSION_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            request,
            query,
            channel,
            session_file,
        })
    }
}

/// Derive a WebSocket URL from the REST base URL.
fn derive_ws_url(base_url: &str) -> String {
    let ws_base = base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!("{}/ws", ws_base.trim_end_matches('/'))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
