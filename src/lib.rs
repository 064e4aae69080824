pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod item;
pub mod ledger;
pub mod service;
pub mod store;
pub mod swap;
pub mod telemetry;
pub mod types;
pub mod utils;

pub use error::{MarketError, MarketResult};
pub use service::MarketService;
