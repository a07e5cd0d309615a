//! Binance spot driver.
//!
//! Balances come from the signed `GET /api/v3/account`, rates from the public
//! `GET /api/v3/ticker/price`. Signed requests carry `timestamp` (and
//! `recvWindow` when configured) plus `signature` in the query string; the
//! API key only ever travels in the `X-MBX-APIKEY` header.

mod responses;

pub use responses::{balances_from_account, check_error_payload, rates_from_tickers};

use async_trait::async_trait;
use chrono::Utc;
use cryptoconnect_brokers_common::http::{self, HttpResponse};
use cryptoconnect_brokers_common::signing;
use cryptoconnect_core::*;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

/// Production REST root.
pub const BASE_URL: &str = "https://api.binance.com/api/v3/";

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const ACCOUNT_ENDPOINT: &str = "account";
const TICKER_PRICE_ENDPOINT: &str = "ticker/price";

/// Binance spot driver.
pub struct BinanceDriver {
    credentials: Option<Credentials>,
    base_url: String,
    recv_window_ms: Option<u64>,
    http: HttpSettings,
}

impl BinanceDriver {
    /// Driver for an account; needs a secret for `get_balance`.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            base_url: BASE_URL.to_string(),
            recv_window_ms: None,
            http: HttpSettings::default(),
        }
    }

    /// Driver without credentials. Only `get_rates` works.
    pub fn public() -> Self {
        Self {
            credentials: None,
            base_url: BASE_URL.to_string(),
            recv_window_ms: None,
            http: HttpSettings::default(),
        }
    }

    /// Build from an exchange config entry. Credentials are validated here,
    /// before any network call.
    pub fn from_config(config: &ExchangeConfig, http: HttpSettings) -> Result<Self, DriverError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DriverError::Configuration("Binance API key not set".to_string()))?;
        let credentials = Credentials::new(api_key, config.api_secret.clone())?;

        let mut driver = Self::new(credentials).with_http_settings(http);
        if let Some(url) = &config.base_url {
            driver = driver.with_base_url(url);
        }
        if let Some(window) = config.recv_window_ms {
            driver = driver.with_recv_window(window);
        }
        Ok(driver)
    }

    /// Point the driver at another REST root (testnet, local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = Some(recv_window_ms);
        self
    }

    pub fn with_http_settings(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Signed GET. Refuses to build the request without a secret.
    async fn send_signed(&self, endpoint: &str) -> Result<Value, DriverError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            DriverError::Authentication("Binance credentials not set".to_string())
        })?;
        let secret = credentials.secret().ok_or_else(|| {
            DriverError::Authentication(
                "Binance API secret not set; signed endpoints need it".to_string(),
            )
        })?;

        let mut params = vec![("timestamp", Utc::now().timestamp_millis().to_string())];
        if let Some(window) = self.recv_window_ms {
            params.push(("recvWindow", window.to_string()));
        }
        let query = signing::signed_query(params, secret);

        debug!(exchange = "binance", endpoint, "Sending signed request");

        let url = format!("{}?{}", self.url(endpoint), query);
        let headers = [(API_KEY_HEADER, credentials.api_key())];
        let response = http::get(&url, &headers, &self.http).await?;
        interpret(response)
    }

    /// Unsigned GET: no key header, no timestamp, no signature.
    async fn send_public(&self, endpoint: &str) -> Result<Value, DriverError> {
        debug!(exchange = "binance", endpoint, "Sending public request");

        let response = http::get(&self.url(endpoint), &[], &self.http).await?;
        interpret(response)
    }
}

/// Turn a raw response into a success body or a classified error.
///
/// The body is read as JSON whatever the status, and an error payload wins
/// over everything else. Without one, a non-2xx status is still a failure.
/// A bare 401 is a rejected key. Binance answers 403 for WAF violations.
fn interpret(response: HttpResponse) -> Result<Value, DriverError> {
    let unauthorized = response.status == StatusCode::UNAUTHORIZED;

    let body = match response.json() {
        Ok(body) => body,
        Err(_) if unauthorized => {
            return Err(DriverError::Authentication(format!(
                "HTTP {} from Binance",
                response.status
            )))
        }
        Err(e) => return Err(e),
    };

    check_error_payload(&body)?;

    if unauthorized {
        return Err(DriverError::Authentication(format!(
            "HTTP {} from Binance",
            response.status
        )));
    }
    if !response.status.is_success() {
        return Err(DriverError::Transport(format!(
            "HTTP {} from Binance: {}",
            response.status,
            response.snippet()
        )));
    }

    Ok(body)
}

#[async_trait]
impl ExchangeDriver for BinanceDriver {
    fn name(&self) -> &str {
        ExchangeId::Binance.as_str()
    }

    async fn get_balance(&self) -> Result<BalanceMap, DriverError> {
        let body = self.send_signed(ACCOUNT_ENDPOINT).await?;
        let balances = balances_from_account(body)?;
        debug!(exchange = "binance", assets = balances.len(), "Fetched balances");
        Ok(balances)
    }

    async fn get_rates(&self) -> Result<RateMap, DriverError> {
        let body = self.send_public(TICKER_PRICE_ENDPOINT).await?;
        let rates = rates_from_tickers(body)?;
        debug!(exchange = "binance", pairs = rates.len(), "Fetched rates");
        Ok(rates)
    }
}
