use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::traits::DriverError;

// ---------------------------------------------------------------------------
// Exchanges
// ---------------------------------------------------------------------------

/// Exchanges with a driver implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeId {
    Binance,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 1] = [ExchangeId::Binance];

    /// Stable lowercase name, used as the result key and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(ExchangeId::Binance),
            other => Err(format!("unsupported exchange: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API credentials owned by a single driver instance.
///
/// The secret is wrapped in `SecretString`: it never shows up in `Debug`
/// output and is zeroed on drop. The secret is optional because public
/// endpoints only need the key (or nothing at all).
pub struct Credentials {
    api_key: String,
    api_secret: Option<SecretString>,
}

impl Credentials {
    /// Validate and wrap a key/secret pair.
    ///
    /// Both values travel in HTTP headers or feed the HMAC, so they must be
    /// non-empty visible ASCII. Anything else is a configuration error.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: Option<String>,
    ) -> Result<Self, DriverError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DriverError::Configuration("API key is empty".to_string()));
        }
        if !is_header_safe(&api_key) {
            return Err(DriverError::Configuration(
                "API key contains characters not allowed in an HTTP header".to_string(),
            ));
        }

        let api_secret = match api_secret {
            Some(secret) if secret.is_empty() => None,
            Some(secret) => {
                if !is_header_safe(&secret) {
                    return Err(DriverError::Configuration(
                        "API secret contains non-printable or non-ASCII characters".to_string(),
                    ));
                }
                Some(SecretString::from(secret))
            }
            None => None,
        };

        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// The API key (public, safe to send as a header).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The secret, if one was supplied. Only for signing.
    pub fn secret(&self) -> Option<&SecretString> {
        self.api_secret.as_ref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field(
                "api_secret",
                &self.api_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn is_header_safe(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_graphic())
}

// ---------------------------------------------------------------------------
// Balances & Rates
// ---------------------------------------------------------------------------

/// Asset symbol (e.g. "BTC") → free balance. Never contains zero balances.
pub type BalanceMap = BTreeMap<String, Decimal>;

/// Trading pair (e.g. "BTCUSDT") → last price.
pub type RateMap = BTreeMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Requested symbols
// ---------------------------------------------------------------------------

/// Reduce a trading-pair string to its canonical form: ASCII alphanumerics
/// only, uppercased. `"btc/usdt"` and `"BTC-USDT"` both become `"BTCUSDT"`.
pub fn normalize_symbol(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Ordered, normalized, duplicate-free list of trading pairs to report on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestedSymbols(Vec<String>);

impl RequestedSymbols {
    /// Normalize raw caller input.
    ///
    /// Inputs that normalize to nothing are dropped, and a symbol requested
    /// twice (e.g. "btc-usdt" and "BTCUSDT") is kept at its first position.
    pub fn normalize<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = Vec::new();
        for item in raw {
            let symbol = normalize_symbol(item.as_ref());
            if symbol.is_empty() || symbols.contains(&symbol) {
                continue;
            }
            symbols.push(symbol);
        }
        Self(symbols)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of one exchange fetch, filtered to the requested symbols.
///
/// Every requested symbol is in exactly one of `matched_rates` or
/// `unmatched_symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    balances: BalanceMap,
    matched_rates: RateMap,
    unmatched_symbols: Vec<String>,
    fetched_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        balances: BalanceMap,
        matched_rates: RateMap,
        unmatched_symbols: Vec<String>,
    ) -> Self {
        Self {
            balances,
            matched_rates,
            unmatched_symbols,
            fetched_at: Utc::now(),
        }
    }

    pub fn balances(&self) -> &BalanceMap {
        &self.balances
    }

    pub fn matched_rates(&self) -> &RateMap {
        &self.matched_rates
    }

    /// Requested symbols with no rate, in request order.
    pub fn unmatched_symbols(&self) -> &[String] {
        &self.unmatched_symbols
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
