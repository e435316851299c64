use tracing::{debug, warn};

use crate::prompts::PICK_PREFIX;

/// How the focus symbol was chosen from the suggestion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A `PICK:` line named a candidate.
    Explicit,
    /// The candidate mentioned earliest in the text.
    Mentioned,
    /// Nothing matched; the first candidate was used.
    Fallback,
}

/// Normalize user-supplied tickers: trim, upper-case, drop empties and
/// duplicates while keeping the first-seen order.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for raw in symbols {
        let symbol = raw.as_ref().trim().trim_start_matches('$').to_uppercase();
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// Pick the symbol the downstream agents should focus on.
///
/// The last `PICK: <TICKER>` line that names a candidate wins. Otherwise the
/// candidate whose first whole-word mention (optionally `$`-prefixed) comes
/// earliest in the text is used. When the text mentions no candidate the
/// first one is returned. `None` only when there are no candidates.
pub fn resolve_focus_symbol(text: &str, candidates: &[String]) -> Option<(String, Resolution)> {
    let first = candidates.first()?;

    if let Some(symbol) = explicit_pick(text, candidates) {
        debug!(symbol = %symbol, "Focus symbol from explicit pick");
        return Some((symbol, Resolution::Explicit));
    }

    if let Some(symbol) = earliest_mention(text, candidates) {
        debug!(symbol = %symbol, "Focus symbol from first mention");
        return Some((symbol, Resolution::Mentioned));
    }

    warn!(
        fallback = %first,
        "Suggestion names none of the candidates, using the first fetched symbol"
    );
    Some((first.clone(), Resolution::Fallback))
}

fn explicit_pick(text: &str, candidates: &[String]) -> Option<String> {
    text.lines().rev().find_map(|line| {
        let line = line.trim().trim_start_matches(['*', '#', '-', '>', ' ']);
        let prefix = line.get(..PICK_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(PICK_PREFIX) {
            return None;
        }
        let token = line[PICK_PREFIX.len()..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '`' | '$'))
            .split(|c: char| c.is_whitespace() || matches!(c, '*' | '`' | ',' | ';' | ')'))
            .next()?
            .trim_end_matches(['.', '!', ':'])
            .to_uppercase();
        candidates.iter().find(|c| **c == token).cloned()
    })
}

fn earliest_mention(text: &str, candidates: &[String]) -> Option<String> {
    let mut best: Option<(usize, &String)> = None;
    for candidate in candidates {
        let Some(pos) = whole_word_position(text, candidate) else {
            continue;
        };
        let better = match best {
            None => true,
            // Same start: prefer the longer ticker (BRK.B over BRK).
            Some((best_pos, best_symbol)) => {
                pos < best_pos || (pos == best_pos && candidate.len() > best_symbol.len())
            }
        };
        if better {
            best = Some((pos, candidate));
        }
    }
    best.map(|(_, symbol)| symbol.clone())
}

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn whole_word_position(text: &str, symbol: &str) -> Option<usize> {
    text.match_indices(symbol).map(|(i, _)| i).find(|&i| {
        let before_ok = text[..i].chars().next_back().map_or(true, |c| !is_ticker_char(c));
        let after_ok = text[i + symbol.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_ticker_char(c));
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn explicit_pick_wins_over_mentions() {
        let text = "AAPL is solid, but MSFT has better momentum.\nPICK: MSFT";
        assert_eq!(
            resolve_focus_symbol(text, &candidates(&["AAPL", "MSFT"])),
            Some(("MSFT".to_string(), Resolution::Explicit))
        );
    }

    #[test]
    fn pick_line_tolerates_markdown_and_case() {
        let text = "Ranking done.\n**Pick:** $nvda.";
        assert_eq!(
            resolve_focus_symbol(text, &candidates(&["AAPL", "NVDA"])),
            Some(("NVDA".to_string(), Resolution::Explicit))
        );
    }

    #[test]
    fn pick_of_unknown_symbol_is_ignored() {
        let text = "I like MSFT.\nPICK: TSLA";
        assert_eq!(
            resolve_focus_symbol(text, &candidates(&["AAPL", "MSFT"])),
            Some(("MSFT".to_string(), Resolution::Mentioned))
        );
    }

    #[test]
    fn earliest_whole_word_mention() {
        let text = "Looking at $MSFT first, then AAPL. AAPLX is unrelated.";
        assert_eq!(
            resolve_focus_symbol(text, &candidates(&["AAPL", "MSFT"])),
            Some(("MSFT".to_string(), Resolution::Mentioned))
        );
    }

    #[test]
    fn substrings_do_not_count() {
        let text = "The GOOGL chart and METAL prices";
        assert_eq!(
            resolve_focus_symbol(text, &candidates(&["GOOG", "META"])),
            Some(("GOOG".to_string(), Resolution::Fallback))
        );
    }

    #[test]
    fn fallback_and_empty_candidates() {
        assert_eq!(
            resolve_focus_symbol("no tickers here", &candidates(&["AMZN", "AAPL"])),
            Some(("AMZN".to_string(), Resolution::Fallback))
        );
        assert_eq!(resolve_focus_symbol("AAPL", &[]), None);
    }

    #[test]
    fn normalizes_symbols() {
        assert_eq!(
            normalize_symbols(&[" aapl", "MSFT", "", "AAPL", "$nvda"]),
            vec!["AAPL", "MSFT", "NVDA"]
        );
    }
}
