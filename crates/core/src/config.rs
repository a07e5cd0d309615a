use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ExchangeId;

/// Per-request timeout when neither the config file nor the CLI sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Pairs reported on when the caller does not ask for any.
pub const DEFAULT_SYMBOLS: [&str; 2] = ["BTCUSDT", "ETHUSDT"];

/// Binance rejects a `recvWindow` above one minute.
const MAX_RECV_WINDOW_MS: u64 = 60_000;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// HTTP settings
// ---------------------------------------------------------------------------

/// Settings shared by every HTTP call a driver makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange config
// ---------------------------------------------------------------------------

/// Connection settings for one exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub exchange: ExchangeId,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Overrides the driver's production endpoint (testnet, local mocks).
    pub base_url: Option<String>,
    /// Extra `recvWindow` sent with signed requests.
    pub recv_window_ms: Option<u64>,
}

impl ExchangeConfig {
    pub fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            api_key: None,
            api_secret: None,
            base_url: None,
            recv_window_ms: None,
        }
    }

    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.api_key = Some(api_key.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Both key and secret are present and non-empty.
    pub fn has_complete_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.api_key) && present(&self.api_secret)
    }
}

impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("exchange", &self.exchange)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// App config
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAppConfig {
    #[serde(default)]
    symbols: Option<Vec<String>>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    exchanges: BTreeMap<String, RawExchangeConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExchangeConfig {
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: Option<String>,
    recv_window_ms: Option<u64>,
}

/// Top-level configuration, usually loaded from a TOML file and then
/// overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Raw trading pairs; normalized later by the core.
    pub symbols: Vec<String>,
    pub timeout_secs: u64,
    pub exchanges: Vec<ExchangeConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            exchanges: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            exchanges = config.exchanges.len(),
            "Loaded config file"
        );
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawAppConfig = toml::from_str(contents)?;
        let defaults = Self::default();

        let mut exchanges = Vec::with_capacity(raw.exchanges.len());
        for (name, section) in raw.exchanges {
            let exchange: ExchangeId = name.parse().map_err(ConfigError::Invalid)?;
            exchanges.push(ExchangeConfig {
                exchange,
                api_key: section.api_key,
                api_secret: section.api_secret,
                base_url: section.base_url,
                recv_window_ms: section.recv_window_ms,
            });
        }

        let config = Self {
            symbols: raw.symbols.unwrap_or(defaults.symbols),
            timeout_secs: raw.timeout_secs.unwrap_or(defaults.timeout_secs),
            exchanges,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".to_string()));
        }
        for exchange in &self.exchanges {
            if let Some(window) = exchange.recv_window_ms {
                if window == 0 || window > MAX_RECV_WINDOW_MS {
                    return Err(ConfigError::Invalid(format!(
                        "{}: recv_window_ms must be between 1 and {}",
                        exchange.exchange, MAX_RECV_WINDOW_MS
                    )));
                }
            }
            if let Some(url) = &exchange.base_url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(format!(
                        "{}: base_url must start with http:// or https://",
                        exchange.exchange
                    )));
                }
            }
        }
        Ok(())
    }

    /// Settings entry for `exchange`, created empty if the file had none.
    pub fn exchange_mut(&mut self, exchange: ExchangeId) -> &mut ExchangeConfig {
        let index = match self.exchanges.iter().position(|e| e.exchange == exchange) {
            Some(index) => index,
            None => {
                self.exchanges.push(ExchangeConfig::new(exchange));
                self.exchanges.len() - 1
            }
        };
        &mut self.exchanges[index]
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
