//! Binance payload shapes and their normalization.

use cryptoconnect_core::{BalanceMap, DriverError, RateMap};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// Error codes Binance uses for a bad key, a bad signature, or a key that
/// lacks permission for the endpoint.
const AUTH_ERROR_CODES: [i64; 4] = [-1022, -2008, -2014, -2015];

/// GET /api/v3/account (only the part we read).
#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    free: Decimal,
}

/// One element of GET /api/v3/ticker/price.
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

/// Raise the error carried in a response body, if there is one.
///
/// Binance reports errors as `{"code": -2014, "msg": "..."}`, sometimes under
/// a 200 status, so this runs before the body is read as a success payload.
/// Bodies without a `msg` field (including ticker arrays) pass through.
pub fn check_error_payload(body: &Value) -> Result<(), DriverError> {
    let Some(msg) = body.get("msg") else {
        return Ok(());
    };

    let message = match msg {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let code = body.get("code").and_then(Value::as_i64);

    Err(classify_api_error(code, message))
}

fn classify_api_error(code: Option<i64>, message: String) -> DriverError {
    match code {
        Some(code) if AUTH_ERROR_CODES.contains(&code) => DriverError::Authentication(message),
        _ => DriverError::Upstream { code, message },
    }
}

/// Free balances above zero, keyed by asset.
pub fn balances_from_account(body: Value) -> Result<BalanceMap, DriverError> {
    let account: AccountResponse = serde_json::from_value(body)
        .map_err(|e| DriverError::Transport(format!("Unexpected account payload: {}", e)))?;

    Ok(account
        .balances
        .into_iter()
        .filter(|b| b.free > Decimal::ZERO)
        .map(|b| (b.asset, b.free))
        .collect())
}

/// Last price per symbol. Pairs quoted at zero (halted or delisted) are
/// left out.
pub fn rates_from_tickers(body: Value) -> Result<RateMap, DriverError> {
    let tickers: Vec<TickerPrice> = serde_json::from_value(body)
        .map_err(|e| DriverError::Transport(format!("Unexpected ticker payload: {}", e)))?;

    let total = tickers.len();
    let rates: RateMap = tickers
        .into_iter()
        .filter(|t| t.price > Decimal::ZERO)
        .map(|t| (t.symbol, t.price))
        .collect();

    if rates.len() < total {
        tracing::debug!(
            skipped = total - rates.len(),
            "Dropped tickers without a positive price"
        );
    }

    Ok(rates)
}
