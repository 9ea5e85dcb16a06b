//! Error types for market data operations.

use thiserror::Error;

/// Errors that can occur while talking to a market data provider.
///
/// Most variants are per-provider failures; the chain reacts by moving on to
/// the next provider. [`AllProvidersFailed`](Self::AllProvidersFailed) is the
/// terminal case after the whole chain has been exhausted.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but has no quotes in the requested period.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider rate limited the request.
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError { provider: String, message: String },

    /// The provider does not implement this operation.
    #[error("{provider} does not support {operation}")]
    NotSupported { provider: String, operation: String },

    /// Every provider in the chain was tried and all failed.
    #[error("All providers failed")]
    AllProvidersFailed,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
