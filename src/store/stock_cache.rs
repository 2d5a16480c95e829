use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::models::StockRecord;
use crate::store::{read_json, write_json};

/// Catalogue of discovered listings keyed by exchange-qualified symbol.
///
/// Grows monotonically; nothing in the service removes entries.
pub struct StockCache {
    path: PathBuf,
    stocks: BTreeMap<String, StockRecord>,
}

impl StockCache {
    /// Missing or corrupt file yields an empty catalogue.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let stocks = match read_json::<BTreeMap<String, StockRecord>>(&path) {
            Ok(Some(stocks)) => stocks,
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("Could not load stock cache from {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self { path, stocks }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.contains_key(symbol)
    }

    #[cfg(test)]
    pub fn get(&self, symbol: &str) -> Option<&StockRecord> {
        self.stocks.get(symbol)
    }

    pub fn put(&mut self, symbol: impl Into<String>, record: StockRecord) {
        self.stocks.insert(symbol.into(), record);
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn records(&self) -> Vec<StockRecord> {
        self.stocks.values().cloned().collect()
    }

    pub fn save(&self) -> Result<(), AppError> {
        write_json(&self.path, &self.stocks)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LastUpdateDocument {
    last_update: DateTime<Utc>,
}

/// Marker file recording when the last discovery cycle completed.
pub struct LastUpdate {
    path: PathBuf,
}

impl LastUpdate {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read(&self) -> Option<DateTime<Utc>> {
        match read_json::<LastUpdateDocument>(&self.path) {
            Ok(doc) => doc.map(|d| d.last_update),
            Err(e) => {
                warn!("Could not load last update from {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn write(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        write_json(&self.path, &LastUpdateDocument { last_update: at })
    }
}
