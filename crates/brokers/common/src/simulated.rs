use async_trait::async_trait;
use cryptoconnect_core::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// A canned failure the simulated driver returns instead of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedFailure {
    Authentication(String),
    Upstream { code: Option<i64>, message: String },
    Transport(String),
}

impl SimulatedFailure {
    fn to_error(&self) -> DriverError {
        match self {
            SimulatedFailure::Authentication(msg) => DriverError::Authentication(msg.clone()),
            SimulatedFailure::Upstream { code, message } => {
                DriverError::upstream(*code, message.clone())
            }
            SimulatedFailure::Transport(msg) => DriverError::Transport(msg.clone()),
        }
    }
}

/// Configuration for the simulated driver.
#[derive(Debug, Clone)]
pub struct SimulatedDriverConfig {
    /// Name reported by [`ExchangeDriver::name`].
    pub name: String,
    /// Raw balances; zero entries are filtered out like a real driver would.
    pub balances: BalanceMap,
    pub rates: RateMap,
    /// Delay applied to both calls.
    pub latency: Option<Duration>,
    pub balance_failure: Option<SimulatedFailure>,
    pub rates_failure: Option<SimulatedFailure>,
}

impl Default for SimulatedDriverConfig {
    fn default() -> Self {
        Self {
            name: "simulated".to_string(),
            balances: BalanceMap::new(),
            rates: RateMap::new(),
            latency: None,
            balance_failure: None,
            rates_failure: None,
        }
    }
}

/// An in-memory exchange driver.
///
/// Serves fixed balances and rates, optionally after a delay or with a
/// canned failure. With [`SimulatedDriver::with_rendezvous`] each call waits
/// until the other call is also in flight, so a caller that awaits them one
/// after the other never finishes.
pub struct SimulatedDriver {
    config: SimulatedDriverConfig,
    rendezvous: Option<Arc<Barrier>>,
}

impl SimulatedDriver {
    pub fn new(config: SimulatedDriverConfig) -> Self {
        Self {
            config,
            rendezvous: None,
        }
    }

    /// Require `get_balance` and `get_rates` to be pending at the same time.
    pub fn with_rendezvous(mut self) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(2)));
        self
    }

    async fn before_call(&self) {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ExchangeDriver for SimulatedDriver {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get_balance(&self) -> Result<BalanceMap, DriverError> {
        self.before_call().await;
        if let Some(failure) = &self.config.balance_failure {
            return Err(failure.to_error());
        }
        Ok(self
            .config
            .balances
            .iter()
            .filter(|(_, free)| **free > Decimal::ZERO)
            .map(|(asset, free)| (asset.clone(), *free))
            .collect())
    }

    async fn get_rates(&self) -> Result<RateMap, DriverError> {
        self.before_call().await;
        if let Some(failure) = &self.config.rates_failure {
            return Err(failure.to_error());
        }
        Ok(self.config.rates.clone())
    }
}
