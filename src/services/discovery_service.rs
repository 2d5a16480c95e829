use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::errors::AppError;
use crate::external::market_data::{MarketDataProvider, TickerProfile};
use crate::models::{CycleSummary, Exchange, StockRecord, UNKNOWN_FIELD};
use crate::services::rate_limiter::RateLimiter;
use crate::store::stock_cache::{LastUpdate, StockCache};

/// Probes the market-data provider for seed symbols that are not yet in the
/// stock cache and records the ones that turn out to be live listings.
pub struct StockDiscovery {
    provider: Arc<dyn MarketDataProvider>,
    cache: RwLock<StockCache>,
    last_update: LastUpdate,
    limiter: RateLimiter,
    config: DiscoveryConfig,
    exchanges: Vec<Exchange>,
    // one cycle at a time; a manual trigger waits for a scheduled run
    cycle_lock: Mutex<()>,
}

impl StockDiscovery {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: StockCache,
        last_update: LastUpdate,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            provider,
            cache: RwLock::new(cache),
            last_update,
            limiter: RateLimiter::new(config.probe_delay),
            config,
            exchanges: Exchange::ALL.to_vec(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// True only when the provider returns both an identification payload
    /// and a non-empty recent price history. Provider errors count as false.
    pub async fn validate(&self, symbol: &str) -> bool {
        self.probe(symbol).await.is_some()
    }

    async fn probe(&self, symbol: &str) -> Option<TickerProfile> {
        self.limiter.acquire().await;

        let profile = match self.provider.fetch_profile(symbol).await {
            Ok(profile) if !profile.is_empty() => profile,
            Ok(_) => {
                debug!("Symbol {} validation failed: empty profile", symbol);
                return None;
            }
            Err(e) => {
                debug!("Symbol {} validation failed: {}", symbol, e);
                return None;
            }
        };

        match self
            .provider
            .fetch_recent_history(symbol, self.config.history_days)
            .await
        {
            Ok(history) if !history.is_empty() => {
                if let Some(last) = history.last() {
                    debug!("Symbol {} validated (last close {} on {})", symbol, last.close, last.date);
                }
                Some(profile)
            }
            Ok(_) => {
                debug!("Symbol {} validation failed: no recent history", symbol);
                None
            }
            Err(e) => {
                debug!("Symbol {} validation failed: {}", symbol, e);
                None
            }
        }
    }

    /// Probe each seed symbol not already cached, in seed order, and insert
    /// the ones that validate. Returns the newly discovered records.
    pub async fn discover(&self, seed_symbols: &[&str], exchange: Exchange) -> Vec<StockRecord> {
        let mut discovered = Vec::new();

        for base in seed_symbols {
            let symbol = exchange.qualify(base);

            let known = self.cache.read().contains(&symbol);
            if known {
                continue;
            }

            let Some(profile) = self.probe(&symbol).await else {
                continue;
            };

            let record = record_from_profile(&symbol, base, exchange, &profile);
            info!(
                "Discovered {} stock: {} ({})",
                exchange,
                symbol,
                profile.exchange_name.as_deref().unwrap_or("unknown venue")
            );

            self.cache.write().put(symbol, record.clone());
            discovered.push(record);
        }

        discovered
    }

    /// Run discovery across every configured exchange, then persist the
    /// cache followed by the last-update marker.
    ///
    /// The two files are written one after the other; a crash between them
    /// leaves a saved cache with a stale marker.
    pub async fn run_cycle(&self) -> Result<CycleSummary, AppError> {
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle_locked().await
    }

    /// Like [`run_cycle`](Self::run_cycle) but skips the work while the last
    /// completed cycle is younger than the configured refresh interval. A
    /// missing marker means this is the first run, which always proceeds.
    /// The marker is checked under the cycle lock, so a run queued behind
    /// another one sees its result.
    pub async fn run_if_due(&self) -> Result<CycleSummary, AppError> {
        let _guard = self.cycle_lock.lock().await;

        if let Some(last) = self.last_update() {
            let age = Utc::now() - last;
            if age < self.config.min_refresh_interval {
                info!("Too soon since last update ({} minutes ago)", age.num_minutes());
                return Ok(CycleSummary::skipped("Too soon since last update"));
            }
        } else {
            info!("First run - discovering initial stocks");
        }

        self.run_cycle_locked().await
    }

    async fn run_cycle_locked(&self) -> Result<CycleSummary, AppError> {
        info!(
            "Checking for new stocks across {} exchanges (probe delay {:?})",
            self.exchanges.len(),
            self.limiter.min_delay()
        );

        let mut new_stocks = Vec::new();
        for exchange in &self.exchanges {
            let found = self.discover(exchange.seed_symbols(), *exchange).await;
            debug!("{} new {} stocks this cycle", found.len(), exchange);
            new_stocks.extend(found);
        }

        let saved = self.cache.read().save();
        saved?;
        self.last_update.write(Utc::now())?;

        log_catalogue_additions(&new_stocks);

        Ok(CycleSummary::completed(new_stocks.len()))
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update.read()
    }

    pub fn stocks(&self) -> Vec<StockRecord> {
        self.cache.read().records()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    #[cfg(test)]
    fn with_exchanges(mut self, exchanges: Vec<Exchange>) -> Self {
        self.exchanges = exchanges;
        self
    }
}

fn record_from_profile(
    symbol: &str,
    base: &str,
    exchange: Exchange,
    profile: &TickerProfile,
) -> StockRecord {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(UNKNOWN_FIELD)
            .to_string()
    };

    StockRecord {
        symbol: symbol.to_string(),
        company_name: profile.display_name().unwrap_or(base).to_string(),
        sector: field(&profile.sector),
        industry: field(&profile.industry),
        exchange,
        discovered_at: Utc::now(),
    }
}

/// The static ticker catalogue is maintained by hand; newly discovered
/// listings are only reported here.
fn log_catalogue_additions(records: &[StockRecord]) {
    if records.is_empty() {
        return;
    }
    info!("Would add {} new stocks to the ticker catalogue", records.len());
    for record in records {
        info!("New stock: {} - {}", record.symbol, record.company_name);
    }
    if records.iter().any(|r| r.sector == UNKNOWN_FIELD) {
        warn!("Some new stocks have no sector information");
    }
}
