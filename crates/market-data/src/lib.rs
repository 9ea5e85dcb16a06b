//! Stockbot Market Data Crate
//!
//! Provider-agnostic quote, history and FX fetching.
//!
//! # Overview
//!
//! Data comes from three providers, tried in priority order:
//! - Finnhub (API key required)
//! - Alpha Vantage (API key required)
//! - Yahoo Finance (keyless fallback, always present)
//!
//! The [`ProviderChain`] walks the chain per request and takes the first
//! usable answer. Per-symbol failures inside a snapshot degrade to
//! [`SymbolSnapshot::unavailable`] rows instead of failing the request.

pub mod chain;
pub mod errors;
pub mod models;
pub mod provider;

pub use chain::ProviderChain;
pub use errors::MarketDataError;
pub use models::{Candle, SymbolSnapshot};
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::MarketDataProvider;
