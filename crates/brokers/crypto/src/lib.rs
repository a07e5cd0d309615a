//! Crypto exchange drivers.
//!
//! Direct REST integration with exchanges, one module per exchange.
//! Currently: Binance spot.

pub mod binance;

pub use binance::BinanceDriver;
