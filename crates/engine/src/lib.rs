pub mod orchestrator;
pub mod runner;

pub use orchestrator::{build_report, fetch_report};
pub use runner::{build_driver, run_all, run_drivers, ExchangeOutcomes};
