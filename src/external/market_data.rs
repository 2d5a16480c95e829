use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalPricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Identification and descriptive fields for one listing.
///
/// Every field is optional because providers omit them freely; a profile
/// without a `symbol` is treated as an empty identification payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TickerProfile {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange_name: Option<String>,
}

impl TickerProfile {
    pub fn is_empty(&self) -> bool {
        self.symbol.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Best available display name for the listing.
    pub fn display_name(&self) -> Option<&str> {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("symbol not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_profile(&self, symbol: &str) -> Result<TickerProfile, ProviderError>;

    async fn fetch_recent_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, ProviderError>;
}
