//! Stock bar record types
//!
//! These types mirror the three tables the maintenance jobs operate on:
//! the raw bar fact table, the symbol dimension and the aggregated bar fact
//! table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw one-minute bars, sourced from the market feed or imputed
pub const STOCK_BARS_TABLE: &str = "fact_stock_bars";

/// Known ticker symbols
pub const STOCKS_TABLE: &str = "dim_stocks";

/// Aggregated bars, keyed by aggregation label
pub const STOCK_BAR_AGGREGATES_TABLE: &str = "fact_stock_bars_agg";

/// One raw price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockBar {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,
    /// Observation time (bar open)
    pub created_at: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub trade_count: i64,
    /// Volume-weighted average price
    pub vwap: Decimal,
    /// True if the bar was synthetically filled rather than sourced from the feed
    pub is_imputed: bool,
}

impl StockBar {
    /// Create a sourced bar with a flat VWAP at the close price
    pub fn new(
        symbol: impl Into<String>,
        created_at: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            created_at,
            open,
            high,
            low,
            close,
            volume,
            trade_count: 0,
            vwap: close,
            is_imputed: false,
        }
    }

    /// Mark this bar as imputed
    pub fn imputed(mut self) -> Self {
        self.is_imputed = true;
        self
    }
}

/// One aggregated bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockBarAggregate {
    pub symbol: String,
    /// Aggregation window start
    pub created_at: DateTime<Utc>,
    /// Aggregation label (e.g., "5min", "1hour")
    pub aggregation: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub trade_count: i64,
    pub vwap: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn minute(m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 14, m, 0).unwrap()
    }

    #[test]
    fn test_stock_bar_defaults() {
        let bar = StockBar::new("AAPL", minute(0), dec!(10), dec!(11), dec!(9), dec!(10.5), 100);
        assert!(!bar.is_imputed);
        assert_eq!(bar.vwap, dec!(10.5));
        assert_eq!(bar.trade_count, 0);

        let imputed = bar.imputed();
        assert!(imputed.is_imputed);
    }
}
