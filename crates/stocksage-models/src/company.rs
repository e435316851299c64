use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Company profile as returned by the market data provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyProfile {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Market capitalization in millions of `currency`.
    #[serde(default)]
    pub market_capitalization: Option<f64>,
    /// Shares outstanding in millions.
    #[serde(default)]
    pub share_outstanding: Option<f64>,
    #[serde(default)]
    pub ipo: Option<String>,
    #[serde(default)]
    pub weburl: Option<String>,
}

impl CompanyProfile {
    /// One-line description for prompts, e.g. `Apple Inc (Technology, NASDAQ, US)`.
    pub fn headline(&self) -> String {
        let name = self.name.as_deref().unwrap_or(&self.ticker);
        let details: Vec<&str> = [
            self.industry.as_deref(),
            self.exchange.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();

        if details.is_empty() {
            name.to_string()
        } else {
            format!("{name} ({})", details.join(", "))
        }
    }
}

/// A single company news article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
}
