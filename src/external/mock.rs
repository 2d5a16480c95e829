//! In-memory provider for tests. Records every call so tests can assert
//! which symbols were probed.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::external::market_data::{ExternalPricePoint, MarketDataProvider, ProviderError, TickerProfile};

#[derive(Default)]
pub struct MockProvider {
    profiles: HashMap<String, TickerProfile>,
    no_history: HashSet<String>,
    profile_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `symbol` with a full profile.
    pub fn with_listing(mut self, symbol: &str, name: &str, sector: &str, industry: &str) -> Self {
        self.profiles.insert(
            symbol.to_string(),
            TickerProfile {
                symbol: Some(symbol.to_string()),
                long_name: Some(name.to_string()),
                sector: Some(sector.to_string()),
                industry: Some(industry.to_string()),
                ..Default::default()
            },
        );
        self
    }

    /// Accept `symbol` but return no descriptive fields.
    pub fn with_bare_listing(mut self, symbol: &str) -> Self {
        self.profiles.insert(
            symbol.to_string(),
            TickerProfile {
                symbol: Some(symbol.to_string()),
                ..Default::default()
            },
        );
        self
    }

    /// Identify `symbol` but report an empty price history.
    pub fn without_history(mut self, symbol: &str) -> Self {
        self.no_history.insert(symbol.to_string());
        self
    }

    /// Every profile lookup sleeps for `delay` after being recorded.
    pub fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().iter().filter(|s| s.as_str() == symbol).count()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_profile(&self, symbol: &str) -> Result<TickerProfile, ProviderError> {
        self.calls.lock().push(symbol.to_string());
        if let Some(delay) = self.profile_delay {
            tokio::time::sleep(delay).await;
        }
        self.profiles.get(symbol).cloned().ok_or(ProviderError::NotFound)
    }

    async fn fetch_recent_history(
        &self,
        symbol: &str,
        _days: u32,
    ) -> Result<Vec<ExternalPricePoint>, ProviderError> {
        if !self.profiles.contains_key(symbol) {
            return Err(ProviderError::NotFound);
        }
        if self.no_history.contains(symbol) {
            return Ok(Vec::new());
        }
        Ok(vec![ExternalPricePoint {
            date: Utc::now().date_naive(),
            close: 100.0,
        }])
    }
}
