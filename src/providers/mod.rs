// 🌐 External Fact Providers - fetch, normalize, cache
//
// Two independent read-through providers over regulatory filing data and
// market-consensus data. Raw provider payloads never cross this boundary;
// only normalized facts do.

pub mod consensus;
pub mod filings;

pub use consensus::{ConsensusClient, ConsensusSnapshot, QuoteTransport};
pub use filings::{FilingsClient, FilingsTransport};

use serde::{Deserialize, Serialize};

/// One externally-verified quantity: value, period label, provenance label.
/// Example: (60_000_000_000.0, "FY2024", "SEC 10-K").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFact {
    pub value: f64,
    pub period: String,
    pub source: String,
}

/// Seam consumed by the claim verifier: latest audited annual revenue-like
/// figure for a ticker. `None` is a valid "no data" outcome, never an error.
pub trait RevenueSource {
    fn latest_annual_value(&self, ticker: &str) -> Option<NumericFact>;
}

/// Seam consumed by the claim verifier: current market-consensus snapshot.
/// Absent fields stay absent; "no data" is distinguishable from zero.
pub trait ConsensusSource {
    fn consensus_snapshot(&self, ticker: &str) -> ConsensusSnapshot;
}
