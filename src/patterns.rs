// 📐 Pattern Library - Noise, stop markers, ticker & claim shapes
//
// Pure data consumed by the sanitizer, the resolver and the verifier.
// Nothing in here does I/O; regexes are compiled once on first use.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// SANITIZER PATTERNS
// ============================================================================

/// Legal/administrative phrases that mark the start of trailing boilerplate.
/// Research documents place disclaimers as trailing blocks, so the sanitizer
/// cuts everything from the first marker line onward.
pub const LEGAL_STOP_MARKERS: &[&str] = &[
    "Disclosure Appendix",
    "Important Disclosures",
    "Analyst Certification",
    "Appendix A: Disclosure",
    "Legal Disclaimer",
    "Investment Banking Services",
    "General Disclosures",
    "Regulatory Disclosures",
    "Investment Risks",
    "Risk Factors",
    "You received this message because",
    "Unsubscribe |",
    "Manage your newsletter subscriptions",
    "Want to sponsor this newsletter?",
    "Ads powered by",
];

/// A line only counts as a stop marker when shorter than this, so body prose
/// that happens to mention "risk factors" is never mistaken for a marker.
pub const MAX_MARKER_LINE_LEN: usize = 100;

/// Noise lines that can appear anywhere in a document (page furniture, email
/// headers, attribution lines). Dropped individually without stopping the scan.
pub static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Page \d+ of \d+",
        r"Copyright \d{4}",
        r"All rights reserved",
        r"Strictly Private & Confidential",
        r"From: .*@.*",
        r"To: .*@.*",
        r"Subject: .*",
        r"View in browser",
        r"Like getting this newsletter\?",
        r"Subscribe to .*",
        r"Before it['’]s here, it['’]s on the .*",
        r"Sent from my iPhone",
        r"For the exclusive use of",
        r"Source: \w+ Research",
        r"Download the \w+ app",
    ]
    .iter()
    .map(|p| {
        Regex::new(&format!("(?i){}", p)).expect("noise pattern must compile")
    })
    .collect()
});

/// Replacement token for denylisted entity names.
pub const REDACTION_TOKEN: &str = "[REDACTED_ENTITY]";

// ============================================================================
// TICKER SHAPES
// ============================================================================

/// "Nvidia Corporation (NVDA)" - capitalized phrase followed by a
/// parenthesized 1-5 letter all-caps token. Highest-precision signal.
pub static TICKER_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z\s,\.]+\(([A-Z]{1,5})\)").unwrap()
});

/// "Ticker: NVDA" / "Symbol: NVDA" - label is case-insensitive, the
/// ticker itself must be all caps.
pub static TICKER_LABELED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:Ticker|Symbol)[:\s]+([A-Z]{1,5})\b").unwrap()
});

/// Fallback scanning is confined to the document header/title region to
/// avoid false positives from tickers mentioned in body prose.
pub const HEADER_SCAN_CHARS: usize = 500;

// ============================================================================
// CLAIM SHAPES
// ============================================================================

/// "revenue of $52 billion", "Revenue: $52B", "Revenue $52.3 billion".
/// Capture group is the numeric portion; the unit word fixes the scale.
pub static REVENUE_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)revenue\s*(?:of\b)?[:\s]*\$?([\d,\.]+)\s*(?:billion|B)").unwrap()
});

/// "EPS of $3.50", "EPS: $3.50".
pub static EPS_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)EPS\s*(?:of\b)?[:\s]*\$?([\d\.]+)").unwrap()
});

// ============================================================================
// FILING CONCEPTS & TOLERANCES
// ============================================================================

/// GAAP revenue concepts in priority order. Filers tag revenue inconsistently
/// across years and issuers, so the first concept present wins.
pub const REVENUE_CONCEPTS: &[&str] = &[
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "Revenues",
    "SalesRevenueNet",
];

/// Form type carrying audited full-year figures.
pub const ANNUAL_REPORT_FORM: &str = "10-K";

/// Tolerance band for audited revenue claims.
pub const REVENUE_TOLERANCE: f64 = 0.05;

/// Wider band for EPS: consensus estimates are themselves approximate.
pub const EPS_TOLERANCE: f64 = 0.10;

/// Filing cache freshness window.
pub const FILING_CACHE_TTL_SECS: u64 = 7 * 86_400;

// ============================================================================
// TESTS
// ============================================================================
