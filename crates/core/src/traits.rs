use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Everything an exchange driver can fail with.
///
/// Drivers translate transport and parse failures into one of these; raw
/// client errors never escape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// Credentials or settings are incomplete or malformed. Raised before any
    /// network call.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The exchange rejected the key or signature, or a signed endpoint was
    /// called without a secret.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// The exchange answered with a structured error payload.
    #[error("Exchange error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Upstream { code: Option<i64>, message: String },
    /// Network, timeout, or an unreadable response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DriverError {
    pub fn upstream(code: Option<i64>, message: impl Into<String>) -> Self {
        DriverError::Upstream {
            code,
            message: message.into(),
        }
    }

    /// Short machine-friendly label for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Configuration(_) => "configuration",
            DriverError::Authentication(_) => "authentication",
            DriverError::Upstream { .. } => "upstream",
            DriverError::Transport(_) => "transport",
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange Driver Trait
// ---------------------------------------------------------------------------

/// Exchange-specific balance and ticker access behind a uniform contract.
///
/// Add an exchange by implementing this trait; the orchestrator and runner
/// only ever see `dyn ExchangeDriver`.
#[async_trait]
pub trait ExchangeDriver: Send + Sync {
    /// Stable exchange name, used as the key in multi-exchange results.
    fn name(&self) -> &str;

    /// Free balances of the account, zero balances excluded.
    async fn get_balance(&self) -> Result<BalanceMap, DriverError>;

    /// Last price of every trading pair the exchange lists.
    async fn get_rates(&self) -> Result<RateMap, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_keeps_message_verbatim() {
        let err = DriverError::upstream(Some(-1121), "Invalid symbol.");
        assert_eq!(err.to_string(), "Exchange error -1121: Invalid symbol.");

        let err = DriverError::upstream(None, "Service unavailable");
        assert_eq!(err.to_string(), "Exchange error: Service unavailable");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(DriverError::Transport("timeout".into()).kind(), "transport");
        assert_eq!(DriverError::Authentication("bad key".into()).kind(), "authentication");
    }
}
