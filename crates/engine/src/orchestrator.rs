use cryptoconnect_core::*;
use tracing::{debug, info};

/// Fetch balances and rates from one exchange and build its report.
///
/// Both calls are in flight at the same time. The first failure is returned
/// as-is and the other call is dropped.
pub async fn fetch_report(
    driver: &dyn ExchangeDriver,
    requested: &RequestedSymbols,
) -> Result<Report, DriverError> {
    debug!(
        exchange = driver.name(),
        symbols = requested.len(),
        "Fetching balances and rates"
    );

    let (balances, rates) = tokio::try_join!(driver.get_balance(), driver.get_rates())?;
    let report = build_report(balances, &rates, requested);

    info!(
        exchange = driver.name(),
        balances = report.balances().len(),
        matched = report.matched_rates().len(),
        unmatched = report.unmatched_symbols().len(),
        "Report built"
    );

    Ok(report)
}

/// Split the requested symbols into those the exchange quotes and those it
/// does not.
///
/// Every requested symbol ends up in exactly one of the two sides. Unmatched
/// symbols keep their request order.
pub fn build_report(balances: BalanceMap, rates: &RateMap, requested: &RequestedSymbols) -> Report {
    let mut remaining: Vec<String> = requested.as_slice().to_vec();
    let mut matched = RateMap::new();

    for (symbol, price) in rates {
        if remaining.is_empty() {
            break;
        }
        if let Some(index) = remaining.iter().position(|s| s == symbol) {
            remaining.remove(index);
            matched.insert(symbol.clone(), *price);
        }
    }

    Report::new(balances, matched, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptoconnect_brokers_common::{SimulatedDriver, SimulatedDriverConfig, SimulatedFailure};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn rates() -> RateMap {
        let mut rates = RateMap::new();
        rates.insert("BTCUSDT".to_string(), dec!(65000.5));
        rates.insert("ETHUSDT".to_string(), dec!(3400.2));
        rates.insert("SOLUSDT".to_string(), dec!(150.0));
        rates
    }

    fn balances() -> BalanceMap {
        let mut balances = BalanceMap::new();
        balances.insert("BTC".to_string(), dec!(0.5));
        balances.insert("USDT".to_string(), dec!(1520.25));
        balances
    }

    #[test]
    fn test_report_from_normalized_request() {
        let requested = RequestedSymbols::normalize(["btc/usdt", "ETH-USDT", "DOGEUSDT"]);
        let report = build_report(balances(), &rates(), &requested);

        assert_eq!(report.matched_rates().len(), 2);
        assert_eq!(report.matched_rates()["BTCUSDT"], dec!(65000.5));
        assert_eq!(report.matched_rates()["ETHUSDT"], dec!(3400.2));
        assert!(!report.matched_rates().contains_key("SOLUSDT"));
        assert_eq!(report.unmatched_symbols(), ["DOGEUSDT".to_string()]);
        assert_eq!(report.balances(), &balances());
    }

    #[test]
    fn test_every_symbol_lands_on_one_side() {
        let cases: [&[&str]; 5] = [
            &[],
            &["BTCUSDT"],
            &["XRPUSDT", "DOGEUSDT"],
            &["SOLUSDT", "NOPE", "BTCUSDT", "ETHUSDT"],
            &["ETHUSDT", "ETHUSDT", "ADAUSDT"],
        ];

        for case in cases {
            let requested = RequestedSymbols::normalize(case.iter().copied());
            let report = build_report(BalanceMap::new(), &rates(), &requested);

            assert_eq!(
                report.matched_rates().len() + report.unmatched_symbols().len(),
                requested.len(),
                "case {:?}",
                case
            );
            for symbol in requested.iter() {
                let matched = report.matched_rates().contains_key(symbol);
                let unmatched = report.unmatched_symbols().contains(symbol);
                assert!(matched != unmatched, "{} in case {:?}", symbol, case);
                assert_eq!(matched, rates().contains_key(symbol));
            }
        }
    }

    #[test]
    fn test_unmatched_keep_request_order() {
        let requested = RequestedSymbols::normalize(["ZZZUSDT", "BTCUSDT", "AAAUSDT", "MMMUSDT"]);
        let report = build_report(BalanceMap::new(), &rates(), &requested);
        assert_eq!(report.unmatched_symbols(), ["ZZZUSDT", "AAAUSDT", "MMMUSDT"]);
    }

    #[test]
    fn test_empty_request_matches_nothing() {
        let report = build_report(balances(), &rates(), &RequestedSymbols::default());
        assert!(report.matched_rates().is_empty());
        assert!(report.unmatched_symbols().is_empty());
        assert_eq!(report.balances().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_runs_both_calls_concurrently() {
        let driver = SimulatedDriver::new(SimulatedDriverConfig {
            balances: balances(),
            rates: rates(),
            ..Default::default()
        })
        .with_rendezvous();
        let requested = RequestedSymbols::normalize(["BTCUSDT"]);

        // Sequential awaits would block forever on the rendezvous.
        let report = tokio::time::timeout(Duration::from_secs(1), fetch_report(&driver, &requested))
            .await
            .expect("balance and rates should be requested together")
            .unwrap();
        assert_eq!(report.matched_rates()["BTCUSDT"], dec!(65000.5));
    }

    #[tokio::test]
    async fn test_balance_failure_propagates_unchanged() {
        let driver = SimulatedDriver::new(SimulatedDriverConfig {
            rates: rates(),
            balance_failure: Some(SimulatedFailure::Authentication(
                "Invalid API-key, IP, or permissions for action.".to_string(),
            )),
            ..Default::default()
        });

        let err = fetch_report(&driver, &RequestedSymbols::normalize(["BTCUSDT"]))
            .await
            .unwrap_err();
        let expected = "Invalid API-key, IP, or permissions for action.";
        assert_eq!(err, DriverError::Authentication(expected.to_string()));
    }

    #[tokio::test]
    async fn test_rates_failure_propagates_unchanged() {
        let driver = SimulatedDriver::new(SimulatedDriverConfig {
            balances: balances(),
            rates_failure: Some(SimulatedFailure::Upstream {
                code: Some(-1003),
                message: "Too many requests.".to_string(),
            }),
            ..Default::default()
        });

        let err = fetch_report(&driver, &RequestedSymbols::normalize(["BTCUSDT"]))
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::upstream(Some(-1003), "Too many requests."));
    }

    #[tokio::test]
    async fn test_both_calls_failing_yields_one_error() {
        let driver = SimulatedDriver::new(SimulatedDriverConfig {
            latency: Some(Duration::from_millis(20)),
            balance_failure: Some(SimulatedFailure::Transport("connection reset".to_string())),
            rates_failure: Some(SimulatedFailure::Transport("connection reset".to_string())),
            ..Default::default()
        });

        let err = fetch_report(&driver, &RequestedSymbols::default()).await.unwrap_err();
        assert!(matches!(err, DriverError::Transport(_)));
    }
}
