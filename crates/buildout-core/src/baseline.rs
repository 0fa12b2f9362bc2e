use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BuildoutError;
use crate::types::{Money, Multiple, Ticker};
use crate::BuildoutResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Current financial position of one listed company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBaseline {
    pub ticker: Ticker,
    /// Market capitalisation in trillions of USD
    pub market_cap: Money,
    /// Trailing net income in billions of USD
    pub net_income: Money,
    /// Current price/earnings multiple
    pub pe_multiple: Multiple,
}

impl CompanyBaseline {
    pub fn new(ticker: &str, market_cap: Money, net_income: Money, pe_multiple: Multiple) -> Self {
        Self {
            ticker: ticker.to_string(),
            market_cap,
            net_income,
            pe_multiple,
        }
    }
}

/// Ticker-indexed lookup over the baseline table.
#[derive(Debug, Clone, Default)]
pub struct BaselineRegistry {
    companies: BTreeMap<Ticker, CompanyBaseline>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The fixed 14-company baseline table the scenario is built around.
pub fn default_baselines() -> Vec<CompanyBaseline> {
    vec![
        CompanyBaseline::new("NVDA", dec!(4.470), dec!(44.0), dec!(37.5)),
        CompanyBaseline::new("AMD", dec!(0.26111), dec!(2.6), dec!(40.0)),
        CompanyBaseline::new("AAPL", dec!(3.775), dec!(97.0), dec!(38.0)),
        CompanyBaseline::new("ASML", dec!(0.37885), dec!(7.8), dec!(35.0)),
        CompanyBaseline::new("MU", dec!(0.18623), dec!(6.0), dec!(31.0)),
        CompanyBaseline::new("SKH", dec!(0.17804), dec!(8.0), dec!(22.0)),
        CompanyBaseline::new("NEE", dec!(0.14892), dec!(7.3), dec!(20.5)),
        CompanyBaseline::new("CEG", dec!(0.10517), dec!(4.0), dec!(26.0)),
        CompanyBaseline::new("MSFT", dec!(3.823), dec!(88.0), dec!(43.0)),
        CompanyBaseline::new("GOOGL", dec!(2.200), dec!(80.0), dec!(29.0)),
        CompanyBaseline::new("AMZN", dec!(2.353), dec!(55.0), dec!(45.0)),
        CompanyBaseline::new("META", dec!(1.897), dec!(47.0), dec!(27.0)),
        CompanyBaseline::new("ORCL", dec!(0.9325), dec!(15.0), dec!(28.0)),
        CompanyBaseline::new("TSLA", dec!(1.416), dec!(15.0), dec!(90.0)),
    ]
}

impl BaselineRegistry {
    /// Build a registry, rejecting duplicate tickers and negative multiples.
    pub fn from_entries(entries: &[CompanyBaseline]) -> BuildoutResult<Self> {
        let mut companies = BTreeMap::new();
        for entry in entries {
            if entry.pe_multiple < Decimal::ZERO {
                return Err(BuildoutError::InvalidInput {
                    field: format!("baselines:{} pe_multiple", entry.ticker),
                    reason: "P/E multiple must not be negative".into(),
                });
            }
            if companies
                .insert(entry.ticker.clone(), entry.clone())
                .is_some()
            {
                return Err(BuildoutError::Configuration {
                    key: entry.ticker.clone(),
                    reason: "Ticker appears more than once in the baseline table".into(),
                });
            }
        }
        Ok(Self { companies })
    }

    pub fn get(&self, ticker: &str) -> BuildoutResult<&CompanyBaseline> {
        self.companies
            .get(ticker)
            .ok_or_else(|| BuildoutError::Configuration {
                key: ticker.to_string(),
                reason: "No baseline registered for ticker".into(),
            })
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.companies.contains_key(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.companies.keys().map(|t| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_has_fourteen_unique_tickers() {
        let registry = BaselineRegistry::from_entries(&default_baselines()).unwrap();
        assert_eq!(registry.len(), 14);
        assert_eq!(registry.get("NVDA").unwrap().net_income, dec!(44.0));
        assert_eq!(registry.get("TSLA").unwrap().pe_multiple, dec!(90.0));
    }

    #[test]
    fn test_unknown_ticker_is_configuration_error() {
        let registry = BaselineRegistry::from_entries(&default_baselines()).unwrap();
        let err = registry.get("INTC").unwrap_err();
        assert!(matches!(err, BuildoutError::Configuration { .. }));
    }

    #[test]
    fn test_duplicate_ticker_rejected() {
        let mut entries = default_baselines();
        entries.push(CompanyBaseline::new("NVDA", dec!(1), dec!(1), dec!(1)));
        assert!(BaselineRegistry::from_entries(&entries).is_err());
    }

    #[test]
    fn test_negative_multiple_rejected() {
        let entries = vec![CompanyBaseline::new("XYZ", dec!(1), dec!(1), dec!(-3))];
        assert!(BaselineRegistry::from_entries(&entries).is_err());
    }
}
