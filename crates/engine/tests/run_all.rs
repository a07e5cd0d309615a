//! Full fetch through `run_all` against a local Binance-shaped server.

use cryptoconnect_core::{DriverError, ExchangeConfig, ExchangeId, HttpSettings, RequestedSymbols};
use cryptoconnect_engine::run_all;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const ACCOUNT_BODY: &str = r#"{"balances":[
    {"asset":"BTC","free":"0.50000000","locked":"0.00000000"},
    {"asset":"BNB","free":"0.00000000","locked":"0.00000000"},
    {"asset":"USDT","free":"1520.25000000","locked":"0.00000000"}
]}"#;

const TICKER_BODY: &str = r#"[
    {"symbol":"BTCUSDT","price":"65000.50000000"},
    {"symbol":"ETHUSDT","price":"3400.20000000"},
    {"symbol":"SOLUSDT","price":"150.00000000"}
]"#;

/// Answer account and ticker requests until the task is aborted.
async fn serve(account: (u16, &'static str)) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }

                let head = String::from_utf8_lossy(&head);
                let (status, body) = if head.starts_with("GET /api/v3/account?") {
                    account
                } else if head.starts_with("GET /api/v3/ticker/price ") {
                    (200, TICKER_BODY)
                } else {
                    (404, r#"{"code":-1,"msg":"not found"}"#)
                };

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/api/v3", addr), handle)
}

fn binance_config(base_url: String) -> ExchangeConfig {
    let mut config =
        ExchangeConfig::new(ExchangeId::Binance).with_credentials("test-key", "test-secret");
    config.base_url = Some(base_url);
    config
}

fn http() -> HttpSettings {
    HttpSettings {
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn binance_report_end_to_end() {
    let (base_url, server) = serve((200, ACCOUNT_BODY)).await;
    let requested = RequestedSymbols::normalize(["btc/usdt", "ETH-USDT", "DOGEUSDT"]);

    let outcomes = run_all(&[binance_config(base_url)], &requested, http()).await;
    server.abort();

    assert_eq!(outcomes.len(), 1);
    let report = outcomes["binance"].as_ref().unwrap();

    assert_eq!(report.balances().len(), 2);
    assert_eq!(report.balances()["BTC"], dec!(0.5));
    assert_eq!(report.balances()["USDT"], dec!(1520.25));

    assert_eq!(report.matched_rates().len(), 2);
    assert_eq!(report.matched_rates()["BTCUSDT"], dec!(65000.5));
    assert_eq!(report.matched_rates()["ETHUSDT"], dec!(3400.2));
    assert_eq!(report.unmatched_symbols(), ["DOGEUSDT"]);
}

#[tokio::test]
async fn rejected_key_lands_in_the_exchange_slot() {
    let (base_url, server) = serve((
        401,
        r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#,
    ))
    .await;

    let outcomes = run_all(
        &[binance_config(base_url)],
        &RequestedSymbols::normalize(["BTCUSDT"]),
        http(),
    )
    .await;
    server.abort();

    assert_eq!(
        outcomes["binance"].as_ref().unwrap_err(),
        &DriverError::Authentication("Invalid API-key, IP, or permissions for action.".to_string())
    );
}
