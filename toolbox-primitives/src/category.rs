//! Closed set of tool categories used for grouping and reporting.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Classification of a registered tool.
///
/// The set is fixed at compile time; strings that do not name a variant are
/// rejected when parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    /// Prices, candles, and market statistics.
    MarketData,
    /// Read-only blockchain queries such as balances or address info.
    ChainRead,
    /// Blockchain operations that submit transactions.
    ChainWrite,
    /// Social-media integrations.
    Social,
    /// Object and file storage.
    Storage,
    /// Agent memory stores.
    Memory,
    /// Source repository analytics (issues, pull requests, commits).
    RepositoryAnalytics,
    /// Web and document search.
    Search,
}

impl ToolCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::MarketData,
        Self::ChainRead,
        Self::ChainWrite,
        Self::Social,
        Self::Storage,
        Self::Memory,
        Self::RepositoryAnalytics,
        Self::Search,
    ];

    /// Returns the canonical kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market-data",
            Self::ChainRead => "chain-read",
            Self::ChainWrite => "chain-write",
            Self::Social => "social",
            Self::Storage => "storage",
            Self::Memory => "memory",
            Self::RepositoryAnalytics => "repository-analytics",
            Self::Search => "search",
        }
    }
}

impl Display for ToolCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::UnknownCategory {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_label() {
        for category in ToolCategory::ALL {
            let parsed: ToolCategory = category.as_str().parse().expect("parse");
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "crypto_data".parse::<ToolCategory>().expect_err("unknown");
        assert!(matches!(err, Error::UnknownCategory { value } if value == "crypto_data"));
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&ToolCategory::RepositoryAnalytics).unwrap();
        assert_eq!(json, "\"repository-analytics\"");

        let back: ToolCategory = serde_json::from_str("\"chain-write\"").unwrap();
        assert_eq!(back, ToolCategory::ChainWrite);
        assert!(serde_json::from_str::<ToolCategory>("\"defi\"").is_err());
    }
}
