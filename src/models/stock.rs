use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "BSE")]
    Bse,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Nse, Exchange::Bse];

    /// Ticker suffix the market-data provider uses for this venue.
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
        }
    }

    pub fn qualify(&self, base_symbol: &str) -> String {
        format!("{}{}", base_symbol, self.suffix())
    }

    /// Static candidate list probed for this venue.
    pub fn seed_symbols(&self) -> &'static [&'static str] {
        match self {
            Exchange::Nse => NSE_SEED_SYMBOLS,
            Exchange::Bse => BSE_SEED_SYMBOLS,
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exchange::Nse => f.write_str("NSE"),
            Exchange::Bse => f.write_str("BSE"),
        }
    }
}

pub const NSE_SEED_SYMBOLS: &[&str] = &[
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK",
    "KOTAKBANK", "SBIN", "BHARTIARTL", "ITC", "ASIANPAINT",
    "MARUTI", "BAJFINANCE", "HCLTECH", "AXISBANK", "LT",
    "ULTRACEMCO", "TITAN", "WIPRO", "NESTLEIND", "POWERGRID",
];

pub const BSE_SEED_SYMBOLS: &[&str] = &["RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK"];

pub const UNKNOWN_FIELD: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub exchange: Exchange,
    #[serde(rename = "discovered_date")]
    pub discovered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_appends_exchange_suffix() {
        assert_eq!(Exchange::Nse.qualify("TCS"), "TCS.NS");
        assert_eq!(Exchange::Bse.qualify("TCS"), "TCS.BO");
    }

    #[test]
    fn test_seed_lists() {
        assert_eq!(Exchange::Nse.seed_symbols().len(), 20);
        assert_eq!(Exchange::Bse.seed_symbols().len(), 5);
        assert_eq!(Exchange::Nse.seed_symbols()[0], "RELIANCE");
    }

    #[test]
    fn test_record_uses_file_field_names() {
        let record = StockRecord {
            symbol: "INFY.NS".to_string(),
            company_name: "Infosys Limited".to_string(),
            sector: "Technology".to_string(),
            industry: "Information Technology Services".to_string(),
            exchange: Exchange::Nse,
            discovered_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["exchange"], "NSE");
        assert!(json.get("discovered_date").is_some());
    }
}
