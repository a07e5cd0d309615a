use crate::orchestrator::fetch_report;
use cryptoconnect_brokers_crypto::BinanceDriver;
use cryptoconnect_core::*;
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Per-exchange outcome of a run, keyed by exchange name.
pub type ExchangeOutcomes = BTreeMap<String, Result<Report, DriverError>>;

/// Build the driver for one configured exchange.
pub fn build_driver(
    config: &ExchangeConfig,
    http: HttpSettings,
) -> Result<Box<dyn ExchangeDriver>, DriverError> {
    match config.exchange {
        ExchangeId::Binance => Ok(Box::new(BinanceDriver::from_config(config, http)?)),
    }
}

/// Fetch a report from every driver at once.
///
/// One failing exchange never affects the others; each outcome lands under
/// its driver's name. Driver names are expected to be unique.
pub async fn run_drivers(
    drivers: Vec<Box<dyn ExchangeDriver>>,
    requested: &RequestedSymbols,
) -> ExchangeOutcomes {
    let runs = drivers.iter().map(|driver| async move {
        let outcome = fetch_report(driver.as_ref(), requested).await;
        if let Err(e) = &outcome {
            warn!(exchange = driver.name(), kind = e.kind(), error = %e, "Exchange fetch failed");
        }
        (driver.name().to_string(), outcome)
    });

    join_all(runs).await.into_iter().collect()
}

/// Run every configured exchange that has a full set of credentials.
///
/// Exchanges missing a key or secret are skipped and absent from the result.
/// Credentials that are present but malformed yield a configuration error
/// for that exchange without any network call.
pub async fn run_all(
    configs: &[ExchangeConfig],
    requested: &RequestedSymbols,
    http: HttpSettings,
) -> ExchangeOutcomes {
    let mut outcomes = ExchangeOutcomes::new();
    let mut drivers: Vec<Box<dyn ExchangeDriver>> = Vec::new();
    let mut seen = BTreeSet::new();

    for config in configs {
        if !config.has_complete_credentials() {
            debug!(exchange = %config.exchange, "Skipping exchange without complete credentials");
            continue;
        }
        if !seen.insert(config.exchange) {
            warn!(
                exchange = %config.exchange,
                "Exchange configured twice, keeping the first complete entry"
            );
            continue;
        }
        match build_driver(config, http) {
            Ok(driver) => drivers.push(driver),
            Err(e) => {
                warn!(exchange = %config.exchange, error = %e, "Exchange not usable");
                outcomes.insert(config.exchange.to_string(), Err(e));
            }
        }
    }

    info!(exchanges = drivers.len(), symbols = requested.len(), "Fetching from exchanges");

    outcomes.extend(run_drivers(drivers, requested).await);
    outcomes
}
