//! Stock symbol directory
//!
//! This module provides:
//! - SymbolDirectory: reads and syncs the `dim_stocks` dimension table
//! - SymbolGrouping: optional presentation of the symbol list
//! - Pure helpers for grouping and literal prefix matching

mod directory;

pub use directory::*;

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How `load_stock_table_list` presents its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolGrouping {
    /// Distinct uppercased first letters, sorted
    Alphabetical,
}

impl FromStr for SymbolGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alphabetical" => Ok(SymbolGrouping::Alphabetical),
            other => Err(format!(
                "Unknown symbol grouping '{}'. Valid options: alphabetical",
                other
            )),
        }
    }
}

impl std::fmt::Display for SymbolGrouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolGrouping::Alphabetical => f.write_str("alphabetical"),
        }
    }
}

/// Apply an optional grouping to a symbol list
pub fn apply_grouping(symbols: Vec<String>, group_by: Option<SymbolGrouping>) -> Vec<String> {
    match group_by {
        None => symbols,
        Some(SymbolGrouping::Alphabetical) => group_by_first_letter(&symbols),
    }
}

/// Sorted, distinct, uppercased first letters of `symbols`
///
/// Empty symbols contribute nothing.
pub fn group_by_first_letter<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    symbols
        .iter()
        .filter_map(|s| s.as_ref().chars().next())
        .map(|c| c.to_uppercase().collect::<String>())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Escape `LIKE` metacharacters so `prefix` matches literally
pub fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_first_letter() {
        assert_eq!(group_by_first_letter(&["AAPL", "AMZN", "BBY"]), vec!["A", "B"]);
        assert_eq!(
            group_by_first_letter(&["msft", "BBY", "", "aapl", "MU"]),
            vec!["A", "B", "M"]
        );
        assert!(group_by_first_letter::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_apply_grouping() {
        let symbols = vec!["BBY".to_string(), "AAPL".to_string()];
        assert_eq!(apply_grouping(symbols.clone(), None), symbols);
        assert_eq!(
            apply_grouping(symbols, Some(SymbolGrouping::Alphabetical)),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_grouping_from_str() {
        assert_eq!(
            "alphabetical".parse::<SymbolGrouping>().unwrap(),
            SymbolGrouping::Alphabetical
        );
        assert_eq!(
            " Alphabetical ".parse::<SymbolGrouping>().unwrap(),
            SymbolGrouping::Alphabetical
        );
        assert!("sector".parse::<SymbolGrouping>().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("A"), "A");
        assert_eq!(escape_like("BRK_"), "BRK\\_");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
