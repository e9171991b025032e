//! Stateless keyword classification of free-text queries.
//!
//! Decides whether a query references market data (so the caller can fetch
//! quotes for the extracted symbols) and what the user is asking for. The
//! result routes auxiliary work only; it never affects ranking or packing.
//!
//! All keyword matching is substring membership over the lower-cased query.

use std::collections::HashSet;

use serde::Serialize;

/// Market keywords. Any hit tags the query [`Domain::Market`].
const MARKET_KEYWORDS: &[&str] = &[
    "stock", "share", "shares", "price", "ticker", "market", "trading", "volume", "chart",
    "performance", "trend", "bull", "bear", "nasdaq", "nyse", "sp500", "s&p", "dow", "equity",
    "securities",
];

/// Tickers recognised when they appear as an uppercase token.
const KNOWN_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "TSLA", "META", "NFLX", "NVDA", "AMD", "INTC", "CRM",
    "ORCL", "IBM", "ADBE", "PYPL", "UBER", "LYFT", "SPOT", "TWTR", "SNAP", "PINS", "SQ", "SHOP",
    "JPM", "BAC", "WFC", "GS", "MS", "C", "V", "MA", "AXP", "JNJ", "PFE", "MRK", "ABBV", "TMO",
    "UNH", "CVS", "WBA", "KO", "PEP", "MCD", "SBUX", "NKE", "DIS", "HD", "WMT", "SPY", "QQQ",
    "IWM", "VTI", "VOO",
];

/// Company-name substrings and the ticker they map to.
const COMPANY_SYMBOLS: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("tesla", "TSLA"),
    ("facebook", "META"),
    ("meta", "META"),
    ("netflix", "NFLX"),
    ("nvidia", "NVDA"),
    ("intel", "INTC"),
    ("amd", "AMD"),
    ("oracle", "ORCL"),
    ("salesforce", "CRM"),
    ("adobe", "ADBE"),
    ("paypal", "PYPL"),
    ("uber", "UBER"),
    ("spotify", "SPOT"),
    ("twitter", "TWTR"),
    ("snapchat", "SNAP"),
    ("pinterest", "PINS"),
    ("square", "SQ"),
    ("shopify", "SHOP"),
    ("jpmorgan", "JPM"),
    ("goldman", "GS"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("johnson", "JNJ"),
    ("pfizer", "PFE"),
    ("merck", "MRK"),
    ("cocacola", "KO"),
    ("coca-cola", "KO"),
    ("pepsi", "PEP"),
    ("mcdonald", "MCD"),
    ("mcdonalds", "MCD"),
    ("starbucks", "SBUX"),
    ("nike", "NKE"),
    ("disney", "DIS"),
    ("walmart", "WMT"),
    ("homedepot", "HD"),
];

/// Intent categories in priority order; the first category with a keyword
/// hit wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Price, &["price", "cost", "worth", "value", "trading at"]),
    (
        Intent::Performance,
        &["performance", "trend", "up", "down", "gain", "loss"],
    ),
    (
        Intent::Comparison,
        &["compare", "vs", "versus", "better", "difference"],
    ),
    (
        Intent::Analysis,
        &["analyze", "analysis", "report", "summary", "review"],
    ),
    (
        Intent::Prediction,
        &["predict", "forecast", "future", "will", "expect"],
    ),
    (Intent::News, &["news", "update", "latest", "recent", "current"]),
];

/// Query-type categories used to expand a query before retrieval.
const QUERY_TYPE_KEYWORDS: &[(QueryType, &[&str])] = &[
    (
        QueryType::StockQuery,
        &[
            "stock", "share", "price", "ticker", "market", "trading", "volume", "chart",
            "performance", "trend",
        ],
    ),
    (
        QueryType::FinancialAnalysis,
        &[
            "earnings",
            "revenue",
            "profit",
            "financial",
            "report",
            "quarterly",
            "annual",
            "balance sheet",
            "income statement",
        ],
    ),
    (
        QueryType::Comparison,
        &["compare", "vs", "versus", "difference", "better", "against", "contrast"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Market,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Price,
    Performance,
    Comparison,
    Analysis,
    Prediction,
    News,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    StockQuery,
    FinancialAnalysis,
    Comparison,
    General,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Market => "market",
            Domain::General => "general",
        }
    }
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Price => "price",
            Intent::Performance => "performance",
            Intent::Comparison => "comparison",
            Intent::Analysis => "analysis",
            Intent::Prediction => "prediction",
            Intent::News => "news",
            Intent::General => "general",
        }
    }
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::StockQuery => "stock_query",
            QueryType::FinancialAnalysis => "financial_analysis",
            QueryType::Comparison => "comparison",
            QueryType::General => "general",
        }
    }

    /// Phrase appended by [`enhance_query`].
    fn expansion(&self) -> &'static str {
        match self {
            QueryType::StockQuery => "stock price market performance trading",
            QueryType::FinancialAnalysis => "financial earnings revenue profit report",
            QueryType::Comparison => "comparison analysis performance metrics",
            QueryType::General => "financial analysis report",
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub domain: Domain,
    pub intent: Intent,
    /// Unordered. Iteration order is unspecified and must not be relied on.
    pub symbols: HashSet<String>,
}

impl Classification {
    /// An arbitrary member of the symbol set, or `None` if it is empty.
    ///
    /// Which member is returned is unspecified; callers that need a
    /// particular symbol must choose it themselves.
    pub fn any_symbol(&self) -> Option<&str> {
        self.symbols.iter().next().map(String::as_str)
    }

    /// Symbols sorted alphabetically, for display.
    pub fn sorted_symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.symbols.iter().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Whether market data should be fetched for this query.
    pub fn wants_market_data(&self) -> bool {
        self.domain == Domain::Market && !self.symbols.is_empty()
    }
}

/// Tag a query's domain and intent and extract the symbols it names.
///
/// The domain is [`Domain::Market`] when a market keyword occurs or when at
/// least one symbol was extracted.
pub fn classify(query: &str) -> Classification {
    let symbols = extract_symbols(query);
    let domain = if mentions_market(query) || !symbols.is_empty() {
        Domain::Market
    } else {
        Domain::General
    };

    Classification {
        domain,
        intent: intent(query),
        symbols,
    }
}

/// True when any market keyword occurs in the query.
pub fn mentions_market(query: &str) -> bool {
    let lower = query.to_lowercase();
    contains_any(&lower, MARKET_KEYWORDS)
}

/// Extract ticker symbols from a query.
///
/// Union of (a) uppercase 1–5 letter tokens found in the known-symbol set
/// and (b) tickers of company names that occur as substrings of the
/// lower-cased query.
pub fn extract_symbols(query: &str) -> HashSet<String> {
    let mut symbols = HashSet::new();

    for token in query.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        if is_valid_symbol(token) && KNOWN_SYMBOLS.contains(&token) {
            symbols.insert(token.to_string());
        }
    }

    let lower = query.to_lowercase();
    for (company, symbol) in COMPANY_SYMBOLS {
        if lower.contains(company) {
            symbols.insert((*symbol).to_string());
        }
    }

    symbols
}

/// First matching intent in priority order, else [`Intent::General`].
pub fn intent(query: &str) -> Intent {
    let lower = query.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(&lower, keywords))
        .map_or(Intent::General, |(intent, _)| *intent)
}

/// First matching query type in priority order, else [`QueryType::General`].
pub fn query_type(query: &str) -> QueryType {
    let lower = query.to_lowercase();
    QUERY_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(&lower, keywords))
        .map_or(QueryType::General, |(query_type, _)| *query_type)
}

/// Append the expansion phrase for `query_type` to the query.
///
/// ```rust
/// use finrag_core::classify::{enhance_query, QueryType};
///
/// assert_eq!(
///     enhance_query("apple results", QueryType::General),
///     "apple results financial analysis report"
/// );
/// ```
pub fn enhance_query(query: &str, query_type: QueryType) -> String {
    format!("{} {}", query, query_type.expansion())
        .trim()
        .to_string()
}

/// Whether `symbol` has ticker shape: 1–5 ASCII uppercase letters.
pub fn is_valid_symbol(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len()) && symbol.bytes().all(|b| b.is_ascii_uppercase())
}

/// Lead-in sentence for an answer, by intent.
pub fn response_template(intent: Intent, symbol: Option<&str>) -> String {
    let subject = symbol.unwrap_or("the requested stock");
    match intent {
        Intent::Price => format!("Here's the current price information for {}:", subject),
        Intent::Performance => format!("Here's the performance analysis for {}:", subject),
        Intent::Comparison => "Here's the comparison analysis:".to_string(),
        Intent::Analysis => "Here's the detailed analysis:".to_string(),
        Intent::Prediction => "Based on available data, here are the insights:".to_string(),
        Intent::News => "Here are the latest updates:".to_string(),
        Intent::General => "Here's the information you requested:".to_string(),
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(symbols: &[&str]) -> HashSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compare_two_tickers() {
        let c = classify("Compare AAPL vs MSFT");
        assert_eq!(c.domain, Domain::Market);
        assert_eq!(c.intent, Intent::Comparison);
        assert_eq!(c.symbols, set(&["AAPL", "MSFT"]));
    }

    #[test]
    fn test_general_query() {
        let c = classify("Give me a summary of the onboarding handbook");
        assert_eq!(c.domain, Domain::General);
        assert_eq!(c.intent, Intent::Analysis);
        assert!(c.symbols.is_empty());
        assert!(!c.wants_market_data());
    }

    #[test]
    fn test_keyword_without_symbol_is_market() {
        let c = classify("how did the nasdaq close");
        assert_eq!(c.domain, Domain::Market);
        assert!(c.symbols.is_empty());
        assert!(!c.wants_market_data());
    }

    #[test]
    fn test_company_names_map_to_symbols() {
        assert_eq!(
            extract_symbols("What is Tesla and Coca-Cola stock doing?"),
            set(&["TSLA", "KO"])
        );
    }

    #[test]
    fn test_symbols_deduplicated() {
        assert_eq!(extract_symbols("AAPL apple AAPL"), set(&["AAPL"]));
    }

    #[test]
    fn test_lowercase_and_long_tokens_ignored() {
        assert!(extract_symbols("aapl GOOGLX").is_empty());
    }

    #[test]
    fn test_unknown_uppercase_token_ignored() {
        assert!(extract_symbols("ZZZZ report").is_empty());
    }

    #[test]
    fn test_intent_priority_order() {
        // both price and comparison keywords: price wins
        assert_eq!(intent("compare the price of both"), Intent::Price);
        assert_eq!(intent("What is the forecast for next year"), Intent::Prediction);
        assert_eq!(intent("any news"), Intent::News);
        assert_eq!(intent("hello"), Intent::General);
    }

    #[test]
    fn test_query_type() {
        assert_eq!(query_type("stock price today"), QueryType::StockQuery);
        assert_eq!(query_type("quarterly earnings"), QueryType::FinancialAnalysis);
        assert_eq!(query_type("ford versus gm"), QueryType::Comparison);
        assert_eq!(query_type("hello"), QueryType::General);
    }

    #[test]
    fn test_enhance_query() {
        assert_eq!(
            enhance_query("nvda", QueryType::StockQuery),
            "nvda stock price market performance trading"
        );
    }

    #[test]
    fn test_is_valid_symbol() {
        assert!(is_valid_symbol("V"));
        assert!(is_valid_symbol("GOOGL"));
        assert!(!is_valid_symbol(""));
        assert!(!is_valid_symbol("GOOGLE"));
        assert!(!is_valid_symbol("aapl"));
        assert!(!is_valid_symbol("BRK.B"));
    }

    #[test]
    fn test_any_symbol_is_member() {
        let c = classify("Compare AAPL vs MSFT");
        let symbol = c.any_symbol().unwrap();
        assert!(c.symbols.contains(symbol));
        assert_eq!(c.sorted_symbols(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_response_template() {
        assert_eq!(
            response_template(Intent::Price, Some("AAPL")),
            "Here's the current price information for AAPL:"
        );
        assert_eq!(
            response_template(Intent::Performance, None),
            "Here's the performance analysis for the requested stock:"
        );
    }
}
