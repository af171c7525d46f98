// 🏷️ Entity Resolver - Free text → canonical company identity
//
// "AAPL is IDENTITY, everything else about the company is VALUE"
//
// The directory is seeded with common issuers and grows monotonically:
// one lazy bulk load from the regulator's ticker file, merged once, never
// evicted. A failed bulk load degrades to seed-only operation.

use crate::patterns::{HEADER_SCAN_CHARS, TICKER_LABELED, TICKER_PAREN};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

// ============================================================================
// COMPANY IDENTITY
// ============================================================================

/// Canonical identity for a public company. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    /// Ticker symbol, uppercase, unique directory key
    pub ticker: String,

    /// Regulator filer ID, zero-padded to 10 digits
    pub cik: String,

    /// Display name
    pub name: String,

    /// Fiscal year end as "MM-DD"
    pub fiscal_year_end: String,
}

impl CompanyIdentity {
    pub fn new(ticker: &str, cik: &str, name: &str, fiscal_year_end: &str) -> Self {
        CompanyIdentity {
            ticker: ticker.to_uppercase(),
            cik: cik.to_string(),
            name: name.to_string(),
            fiscal_year_end: fiscal_year_end.to_string(),
        }
    }
}

// ============================================================================
// DIRECTORY SOURCE
// ============================================================================

/// Remote authoritative directory (ticker → filer ID → display name).
/// Boxed so tests can inject counting/failing sources.
pub trait DirectorySource: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<CompanyIdentity>>;
}

/// SEC company_tickers.json over HTTP.
pub struct SecDirectorySource {
    agent: ureq::Agent,
    user_agent: String,
}

const SEC_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

impl SecDirectorySource {
    pub fn new(user_agent: &str) -> Self {
        SecDirectorySource {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(5))
                .build(),
            user_agent: user_agent.to_string(),
        }
    }
}

impl DirectorySource for SecDirectorySource {
    fn fetch_all(&self) -> Result<Vec<CompanyIdentity>> {
        let payload: serde_json::Value = self
            .agent
            .get(SEC_TICKERS_URL)
            .set("User-Agent", &self.user_agent)
            .call()
            .context("fetching regulator ticker directory")?
            .into_json()
            .context("parsing regulator ticker directory")?;

        let entries = payload
            .as_object()
            .ok_or_else(|| anyhow!("ticker directory is not an object"))?;

        let mut companies = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            let ticker = entry
                .get("ticker")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("directory entry missing ticker"))?;
            let cik = entry
                .get("cik_str")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow!("directory entry missing cik_str"))?;
            let name = entry.get("title").and_then(|v| v.as_str()).unwrap_or("");

            companies.push(CompanyIdentity::new(
                ticker,
                &format!("{:010}", cik),
                name,
                "12-31",
            ));
        }
        Ok(companies)
    }
}

// ============================================================================
// COMPANY DIRECTORY
// ============================================================================

/// In-memory company directory with lazy one-shot bulk load.
///
/// Lifecycle: seeded at construction, at most one bulk-merge trigger for the
/// process lifetime, monotonic growth, no eviction. Interior mutability keeps
/// the API `&self` so the directory can be shared behind `Arc`.
pub struct CompanyDirectory {
    companies: RwLock<BTreeMap<String, CompanyIdentity>>,
    bulk_load_attempted: AtomicBool,
    source: Box<dyn DirectorySource>,
}

impl CompanyDirectory {
    pub fn new(user_agent: &str) -> Self {
        Self::with_source(Box::new(SecDirectorySource::new(user_agent)))
    }

    pub fn with_source(source: Box<dyn DirectorySource>) -> Self {
        CompanyDirectory {
            companies: RwLock::new(Self::seed()),
            bulk_load_attempted: AtomicBool::new(false),
            source,
        }
    }

    /// Common issuers, resolvable without any network access.
    fn seed() -> BTreeMap<String, CompanyIdentity> {
        let seed = [
            CompanyIdentity::new("AAPL", "0000320193", "Apple Inc.", "09-30"),
            CompanyIdentity::new("NVDA", "0001045810", "NVIDIA Corporation", "01-31"),
            CompanyIdentity::new("MSFT", "0000789019", "Microsoft Corporation", "06-30"),
            CompanyIdentity::new("GOOG", "0001652044", "Alphabet Inc.", "12-31"),
            CompanyIdentity::new("GOOGL", "0001652044", "Alphabet Inc.", "12-31"),
            CompanyIdentity::new("AMZN", "0001018724", "Amazon.com, Inc.", "12-31"),
            CompanyIdentity::new("TSLA", "0001318605", "Tesla, Inc.", "12-31"),
            CompanyIdentity::new("META", "0001326801", "Meta Platforms, Inc.", "12-31"),
            CompanyIdentity::new("LLY", "0000059478", "Eli Lilly & Co", "12-31"),
        ];
        seed.into_iter().map(|c| (c.ticker.clone(), c)).collect()
    }

    pub fn len(&self) -> usize {
        self.companies.read().expect("directory lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a ticker, triggering the one-time bulk load on a miss.
    pub fn lookup(&self, ticker: &str) -> Option<CompanyIdentity> {
        let ticker = ticker.trim().to_uppercase();

        if let Some(found) = self
            .companies
            .read()
            .expect("directory lock poisoned")
            .get(&ticker)
        {
            return Some(found.clone());
        }

        // At most one attempt per process, even if it fails: the flag flips
        // before the fetch, so repeated misses never hammer the remote.
        if !self.bulk_load_attempted.swap(true, Ordering::SeqCst) {
            self.bulk_load();
        }

        self.companies
            .read()
            .expect("directory lock poisoned")
            .get(&ticker)
            .cloned()
    }

    fn bulk_load(&self) {
        match self.source.fetch_all() {
            Ok(remote) => {
                let mut map = self.companies.write().expect("directory lock poisoned");
                let before = map.len();
                for company in remote {
                    // Seed entries carry curated fiscal year ends; never clobber them
                    map.entry(company.ticker.clone()).or_insert(company);
                }
                tracing::info!(
                    "directory bulk load merged {} companies",
                    map.len() - before
                );
            }
            Err(e) => {
                // Degraded mode: keep operating on the seed table only
                tracing::warn!("directory bulk load failed, seed table only: {}", e);
            }
        }
    }

    /// Extract the subject ticker from free text.
    ///
    /// Three strategies in strict priority order, first hit wins:
    ///   1. Parenthetical: "Nvidia Corporation (NVDA)"
    ///   2. Labeled: "Ticker: NVDA" / "Symbol: NVDA"
    ///   3. Whole-word scan of the header region for known tickers
    ///
    /// `None` means the document has no single-ticker subject and belongs in
    /// macro/thematic handling instead.
    pub fn resolve(&self, text: &str) -> Option<String> {
        if let Some(caps) = TICKER_PAREN.captures(text) {
            return Some(caps[1].to_string());
        }

        if let Some(caps) = TICKER_LABELED.captures(text) {
            return Some(caps[1].to_string());
        }

        // Header-only scan keeps body-prose mentions from winning
        let header: String = text
            .chars()
            .take(HEADER_SCAN_CHARS)
            .collect::<String>()
            .to_uppercase();
        let known = self.companies.read().expect("directory lock poisoned");
        for token in header.split(|c: char| !c.is_ascii_alphanumeric()) {
            if !token.is_empty() && known.contains_key(token) {
                return Some(token.to_string());
            }
        }

        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
