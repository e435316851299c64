use std::fmt::Write;

use stocksage_models::{AnalysisState, Signal, SymbolSnapshot};

/// Line prefix the suggestion agent uses to name its single pick.
pub const PICK_PREFIX: &str = "PICK:";

pub fn suggestion_system_prompt() -> String {
    format!(
        "You are a stock market expert in StockSage, a multi-agent equity research pipeline. \
         Analyze the provided stocks and suggest the most promising ones.\n\n\
         ## INPUT\n\n\
         For each candidate you receive a price summary over the lookback window, \
         an optional statistical forecast with BUY/SELL/HOLD signal counts, an optional \
         company profile and recent headlines. Treat missing sections as unknown, not negative.\n\n\
         ## WHAT TO COVER\n\n\
         - Market trends and recent price performance\n\
         - Technical picture implied by the range, volume and forecast signals\n\
         - Company context and news flow where provided\n\n\
         Rank the candidates and explain the ranking briefly.\n\n\
         ## OUTPUT\n\n\
         Plain text. The final line MUST be `{PICK_PREFIX} <TICKER>` naming exactly one \
         ticker from the candidate list, the one you consider most promising."
    )
}

pub fn prediction_system_prompt() -> String {
    "You are a stock prediction expert in StockSage. Analyze the data and provide a detailed \
     profit potential analysis for the selected stock.\n\n\
     ## OUTPUT\n\n\
     Plain text covering:\n\
     1. Expected profit or loss as a percentage\n\
     2. The timeframe over which you expect it (e.g. 30 days, 3 months)\n\
     3. The supporting factors: trend, forecast band, signals, fundamentals, news\n\
     4. Your confidence and what it rests on\n\n\
     Ground every number in the data provided. Say so when the data is thin."
        .to_string()
}

pub fn critique_system_prompt() -> String {
    "You are a critical analyst in StockSage. Review the stock prediction and identify \
     potential risks or oversights.\n\n\
     ## OUTPUT\n\n\
     Plain text covering:\n\
     1. Risks the prediction underweights or ignores\n\
     2. Factors that would invalidate it\n\
     3. Alternative scenarios and how likely they are\n\
     4. Whether the stated timeframe and magnitude are consistent with the data\n\n\
     Be specific. Do not restate the prediction."
        .to_string()
}

/// Human-readable digest of everything fetched for one symbol.
pub fn describe_snapshot(snapshot: &SymbolSnapshot, max_headlines: usize) -> String {
    let mut out = String::new();
    let symbol = snapshot.symbol();

    match &snapshot.profile {
        Some(profile) => {
            let _ = writeln!(out, "### {symbol}: {}", profile.headline());
            if let (Some(cap), currency) = (profile.market_capitalization, &profile.currency) {
                let _ = writeln!(
                    out,
                    "Market cap: {cap:.0}M {}",
                    currency.as_deref().unwrap_or("")
                );
            }
        }
        None => {
            let _ = writeln!(out, "### {symbol}");
        }
    }

    match snapshot.prices.summary() {
        Some(s) => {
            let _ = writeln!(
                out,
                "Prices: {} sessions from {} to {}; close {:.2} -> {:.2} ({:+.2}%); \
                 range {:.2}-{:.2}; average volume {:.0}",
                s.sessions,
                s.from,
                s.to,
                s.first_close,
                s.last_close,
                s.change_pct,
                s.period_low,
                s.period_high,
                s.avg_volume
            );
        }
        None => {
            let _ = writeln!(out, "Prices: none");
        }
    }

    match &snapshot.forecast {
        Some(f) => {
            let future = f.future_signals();
            let count = |signal: Signal| future.iter().filter(|r| r.signal == signal).count();
            let change = f
                .forecast
                .projected_change_pct()
                .map(|c| format!("{c:+.2}%"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = write!(
                out,
                "Forecast: {} days ahead, projected change {change}",
                f.forecast.horizon_days
            );
            if let Some(end) = future.last() {
                let _ = write!(
                    out,
                    ", end estimate {:.2} (band {:.2}-{:.2})",
                    end.yhat, end.yhat_lower, end.yhat_upper
                );
            }
            let _ = writeln!(
                out,
                "; signals BUY {}, SELL {}, HOLD {}",
                count(Signal::Buy),
                count(Signal::Sell),
                count(Signal::Hold)
            );
            if let Some(next) = future.first() {
                let _ = writeln!(out, "Next signal: {} on {}", next.signal, next.date);
            }
        }
        None => {
            let _ = writeln!(out, "Forecast: unavailable");
        }
    }

    if !snapshot.news.is_empty() && max_headlines > 0 {
        let _ = writeln!(out, "Recent headlines:");
        for item in snapshot.news.iter().take(max_headlines) {
            let _ = writeln!(
                out,
                "- {} {}: {}",
                item.datetime.format("%Y-%m-%d"),
                item.source,
                item.headline
            );
        }
    }

    out
}

pub fn suggestion_user_prompt(state: &AnalysisState, max_headlines: usize) -> String {
    let symbols = state.symbols();
    let mut out = format!(
        "Please analyze these stocks: {}. Consider market trends, technical indicators, \
         and recent performance.\n\n",
        symbols.join(", ")
    );
    for snapshot in state.snapshots() {
        out.push_str(&describe_snapshot(snapshot, max_headlines));
        out.push('\n');
    }
    let _ = write!(
        out,
        "End with `{PICK_PREFIX} <TICKER>` using one of: {}.",
        symbols.join(", ")
    );
    out
}

pub fn prediction_user_prompt(
    suggestion: &str,
    snapshot: &SymbolSnapshot,
    max_headlines: usize,
) -> String {
    format!(
        "Based on the data for {symbol}, predict the profit potential and optimal timeframe.\n\n\
         ## MARKET EXPERT SUGGESTION\n\n{suggestion}\n\n\
         ## DATA FOR {symbol}\n\n{data}",
        symbol = snapshot.symbol(),
        data = describe_snapshot(snapshot, max_headlines),
    )
}

pub fn critique_user_prompt(
    prediction: &str,
    snapshot: &SymbolSnapshot,
    max_headlines: usize,
) -> String {
    format!(
        "Review this prediction for {symbol} and provide a critical analysis.\n\n\
         ## PREDICTION\n\n{prediction}\n\n\
         ## UNDERLYING DATA\n\n{data}",
        symbol = snapshot.symbol(),
        data = describe_snapshot(snapshot, max_headlines),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stocksage_models::{Candle, CompanyProfile, NewsItem, PriceSeries};
    use uuid::Uuid;

    fn snapshot(symbol: &str) -> SymbolSnapshot {
        let candles = (1..=5)
            .map(|d| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 4, d, 0, 0, 0).unwrap(),
                open: 100.0,
                high: 105.0,
                low: 95.0,
                close: 100.0 + d as f64,
                volume: 1_000_000,
            })
            .collect();
        SymbolSnapshot::new(PriceSeries::new(symbol, candles).unwrap())
    }

    #[test]
    fn suggestion_prompt_requires_pick_line() {
        let prompt = suggestion_system_prompt();
        assert!(prompt.contains("PICK: <TICKER>"));
        assert!(prompt.contains("most promising"));
    }

    #[test]
    fn prediction_prompt_asks_for_percentage_and_timeframe() {
        let prompt = prediction_system_prompt();
        assert!(prompt.contains("percentage"));
        assert!(prompt.contains("timeframe"));
    }

    #[test]
    fn critique_prompt_covers_risks_and_alternatives() {
        let prompt = critique_system_prompt();
        assert!(prompt.contains("Risks"));
        assert!(prompt.contains("invalidate"));
        assert!(prompt.contains("Alternative scenarios"));
    }

    #[test]
    fn snapshot_description_includes_enrichment() {
        let mut snap = snapshot("AAPL");
        snap.profile = Some(CompanyProfile {
            ticker: "AAPL".to_string(),
            name: Some("Apple Inc".to_string()),
            industry: Some("Technology".to_string()),
            market_capitalization: Some(2_950_000.0),
            currency: Some("USD".to_string()),
            ..Default::default()
        });
        snap.news = vec![NewsItem {
            headline: "Apple unveils new chips".to_string(),
            summary: String::new(),
            datetime: Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap(),
            source: "Reuters".to_string(),
            url: None,
        }];

        let text = describe_snapshot(&snap, 5);
        assert!(text.contains("### AAPL: Apple Inc (Technology)"));
        assert!(text.contains("Market cap: 2950000M USD"));
        assert!(text.contains("5 sessions"));
        assert!(text.contains("Forecast: unavailable"));
        assert!(text.contains("Reuters: Apple unveils new chips"));

        let without_news = describe_snapshot(&snap, 0);
        assert!(!without_news.contains("Recent headlines"));
    }

    #[test]
    fn suggestion_user_prompt_lists_every_symbol() {
        let state = AnalysisState::new(
            Uuid::new_v4(),
            vec!["AAPL".to_string(), "MSFT".to_string()],
            vec![snapshot("AAPL"), snapshot("MSFT")],
        );
        let prompt = suggestion_user_prompt(&state, 3);
        assert!(prompt.contains("Please analyze these stocks: AAPL, MSFT."));
        assert!(prompt.contains("### MSFT"));
        assert!(prompt.ends_with("using one of: AAPL, MSFT."));
    }

    #[test]
    fn downstream_prompts_carry_upstream_text() {
        let snap = snapshot("MSFT");
        let prediction = prediction_user_prompt("MSFT has momentum", &snap, 0);
        assert!(prediction.contains("Based on the data for MSFT"));
        assert!(prediction.contains("MSFT has momentum"));

        let critique = critique_user_prompt("+6% in 30 days", &snap, 0);
        assert!(critique.contains("+6% in 30 days"));
        assert!(critique.contains("### MSFT"));
    }
}
