use crate::external::market_data::{ExternalPricePoint, MarketDataProvider, ProviderError, TickerProfile};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance provider. No API key required; NSE listings use the `.NS`
/// suffix and BSE listings `.BO`.
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; StockDiscovery/0.1)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<YahooResult, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", range)])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        check_status(resp.status())?;

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        first_result(body)
    }

    /// Sector and industry live in a separate module of the quote summary
    /// endpoint, which Yahoo sometimes refuses without a session cookie.
    async fn fetch_asset_profile(&self, symbol: &str) -> Result<YahooAssetProfile, ProviderError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("modules", "assetProfile")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        check_status(resp.status())?;

        let body: YahooSummaryResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        body.quote_summary
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .and_then(|r| r.asset_profile)
            .ok_or_else(|| ProviderError::BadResponse("missing assetProfile".into()))
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    exchange_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooSummary,
}

#[derive(Debug, Deserialize)]
struct YahooSummary {
    result: Option<Vec<YahooSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResult {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<YahooAssetProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooAssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

fn check_status(status: reqwest::StatusCode) -> Result<(), ProviderError> {
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        404 => Err(ProviderError::NotFound),
        429 => Err(ProviderError::RateLimited),
        _ => Err(ProviderError::BadResponse(format!("HTTP {}", status))),
    }
}

fn first_result(body: YahooChartResponse) -> Result<YahooResult, ProviderError> {
    if let Some(error) = body.chart.error {
        if error.code.as_deref() == Some("Not Found") || error.description.contains("No data found") {
            return Err(ProviderError::NotFound);
        }
        return Err(ProviderError::BadResponse(error.description));
    }

    body.chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or(ProviderError::NotFound)
}

fn profile_from_meta(meta: YahooMeta) -> TickerProfile {
    TickerProfile {
        symbol: meta.symbol,
        long_name: meta.long_name,
        short_name: meta.short_name,
        exchange_name: meta.exchange_name,
        sector: None,
        industry: None,
    }
}

fn history_from_result(result: &YahooResult) -> Vec<ExternalPricePoint> {
    let Some(quote) = result.indicators.quote.first() else {
        return Vec::new();
    };

    let mut points: Vec<ExternalPricePoint> = result
        .timestamp
        .iter()
        .zip(quote.close.iter())
        .filter_map(|(ts, close)| {
            // null closes mark holidays and halted sessions
            let close = (*close)?;
            let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(ExternalPricePoint { date, close })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

fn range_for_days(days: u32) -> &'static str {
    if days <= 5 {
        "5d"
    } else if days <= 30 {
        "1mo"
    } else if days <= 90 {
        "3mo"
    } else {
        "1y"
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_profile(&self, symbol: &str) -> Result<TickerProfile, ProviderError> {
        let result = self.fetch_chart(symbol, "1d").await?;
        let mut profile = profile_from_meta(result.meta);

        if profile.is_empty() {
            return Ok(profile);
        }

        match self.fetch_asset_profile(symbol).await {
            Ok(asset) => {
                profile.sector = asset.sector;
                profile.industry = asset.industry;
            }
            Err(e) => debug!("No asset profile for {}: {}", symbol, e),
        }

        Ok(profile)
    }

    async fn fetch_recent_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, ProviderError> {
        let result = self.fetch_chart(symbol, range_for_days(days)).await?;
        Ok(history_from_result(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "symbol": "RELIANCE.NS",
                    "longName": "Reliance Industries Limited",
                    "shortName": "RELIANCE INDUSTRIES",
                    "exchangeName": "NSI"
                },
                "timestamp": [1718856000, 1718683200, 1718769600],
                "indicators": {
                    "quote": [{ "close": [2950.5, 2921.0, null] }]
                }
            }],
            "error": null
        }
    }"#;

    const NOT_FOUND_BODY: &str = r#"{
        "chart": {
            "result": null,
            "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
        }
    }"#;

    #[test]
    fn test_chart_meta_becomes_profile() {
        let body: YahooChartResponse = serde_json::from_str(CHART_BODY).unwrap();
        let result = first_result(body).unwrap();
        let profile = profile_from_meta(result.meta);

        assert_eq!(profile.symbol.as_deref(), Some("RELIANCE.NS"));
        assert_eq!(profile.display_name(), Some("Reliance Industries Limited"));
        assert_eq!(profile.exchange_name.as_deref(), Some("NSI"));
        assert!(profile.sector.is_none());
    }

    #[test]
    fn test_history_skips_null_closes_and_sorts() {
        let body: YahooChartResponse = serde_json::from_str(CHART_BODY).unwrap();
        let result = first_result(body).unwrap();
        let history = history_from_result(&result);

        assert_eq!(history.len(), 2);
        assert!(history[0].date < history[1].date);
        assert_eq!(history[0].close, 2921.0);
    }

    #[test]
    fn test_chart_error_maps_to_not_found() {
        let body: YahooChartResponse = serde_json::from_str(NOT_FOUND_BODY).unwrap();
        assert!(matches!(first_result(body), Err(ProviderError::NotFound)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(reqwest::StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(reqwest::StatusCode::NOT_FOUND),
            Err(ProviderError::NotFound)
        ));
        assert!(matches!(
            check_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            Err(ProviderError::RateLimited)
        ));
        assert!(matches!(
            check_status(reqwest::StatusCode::UNAUTHORIZED),
            Err(ProviderError::BadResponse(_))
        ));
    }

    #[test]
    fn test_range_for_days() {
        assert_eq!(range_for_days(5), "5d");
        assert_eq!(range_for_days(20), "1mo");
        assert_eq!(range_for_days(365), "1y");
    }

    #[test]
    fn test_asset_profile_parses() {
        let body = r#"{"quoteSummary":{"result":[{"assetProfile":{"sector":"Energy","industry":"Oil & Gas Refining & Marketing"}}],"error":null}}"#;
        let parsed: YahooSummaryResponse = serde_json::from_str(body).unwrap();
        let asset = parsed.quote_summary.result.unwrap().remove(0).asset_profile.unwrap();
        assert_eq!(asset.sector.as_deref(), Some("Energy"));
    }
}
