// ⚖️ Claim Verifier - Cross-check document claims against external facts
//
// Scans sanitized text for quantitative claims (revenue, forward EPS),
// fetches the authoritative figure, and classifies each claim against a
// metric-specific tolerance band. Precision over recall throughout: an
// unverifiable claim is silently skipped, never flagged as a failure.

use crate::patterns::{EPS_CLAIM, EPS_TOLERANCE, REVENUE_CLAIM, REVENUE_TOLERANCE};
use crate::providers::{ConsensusSource, NumericFact, RevenueSource};
use serde::{Deserialize, Serialize};

// ============================================================================
// FACT CHECK RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactStatus {
    #[serde(rename = "MATCH")]
    Match,
    #[serde(rename = "MISMATCH")]
    Mismatch,
}

impl FactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::Match => "MATCH",
            FactStatus::Mismatch => "MISMATCH",
        }
    }
}

/// Verdict for one verified claim. Pure output value; storage is a
/// downstream concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    /// Metric name, e.g. "Revenue (FY2024)"
    pub metric: String,

    /// Claimed value in normalized units (dollars, or dollars per share)
    pub claimed: f64,

    /// Authoritative value in the same units
    pub actual: f64,

    /// Provenance label, e.g. "SEC 10-K"
    pub source: String,

    pub status: FactStatus,

    /// Signed deviation (claimed - actual) / actual, as percent,
    /// rounded to one decimal
    pub diff_pct: f64,
}

/// Verdicts for one document plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub source: String,
    pub ticker: String,
    pub results: Vec<FactCheckResult>,
    pub verified_at: chrono::DateTime<chrono::Utc>,
}

impl VerificationReport {
    pub fn summary(&self) -> String {
        let mismatches = self
            .results
            .iter()
            .filter(|r| r.status == FactStatus::Mismatch)
            .count();
        format!(
            "{} [{}]: {} claims checked, {} mismatched",
            self.source,
            self.ticker,
            self.results.len(),
            mismatches
        )
    }
}

// ============================================================================
// CLAIM VERIFIER
// ============================================================================

/// Verifies quantitative claims against the external fact providers.
pub struct ClaimVerifier {
    filings: Box<dyn RevenueSource>,
    consensus: Box<dyn ConsensusSource>,
}

impl ClaimVerifier {
    pub fn new(filings: Box<dyn RevenueSource>, consensus: Box<dyn ConsensusSource>) -> Self {
        ClaimVerifier { filings, consensus }
    }

    /// Verify every supported claim class in the text.
    ///
    /// Returns an empty list (not an error) when the ticker is absent. Each
    /// claim class is checked independently; a fault in one never aborts the
    /// other. Only the first textual match per class is evaluated: documents
    /// lead with their headline number, repetitions are not re-verified.
    pub fn verify(&self, text: &str, ticker: &str) -> Vec<FactCheckResult> {
        let mut results = Vec::new();
        if ticker.is_empty() {
            return results;
        }

        if let Some(check) = self.check_revenue(text, ticker) {
            results.push(check);
        }
        if let Some(check) = self.check_eps(text, ticker) {
            results.push(check);
        }

        results
    }

    /// Revenue claim vs the latest audited annual figure, 5% band.
    fn check_revenue(&self, text: &str, ticker: &str) -> Option<FactCheckResult> {
        let caps = REVENUE_CLAIM.captures(text)?;
        let claimed_billions = match caps[1].replace(',', "").parse::<f64>() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("unparseable revenue claim {:?}: {}", &caps[1], e);
                return None;
            }
        };
        let claimed = claimed_billions * 1e9;

        let actual = self.filings.latest_annual_value(ticker)?;
        Self::classify(
            &format!("Revenue ({})", actual.period),
            claimed,
            &actual,
            REVENUE_TOLERANCE,
        )
    }

    /// Forward EPS claim vs consensus, 10% band (estimates are themselves
    /// approximate). Missing consensus data suppresses the check entirely.
    fn check_eps(&self, text: &str, ticker: &str) -> Option<FactCheckResult> {
        let caps = EPS_CLAIM.captures(text)?;
        let claimed = match caps[1].parse::<f64>() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("unparseable EPS claim {:?}: {}", &caps[1], e);
                return None;
            }
        };

        let snapshot = self.consensus.consensus_snapshot(ticker);
        let eps = snapshot.forward_eps?;
        let actual = NumericFact {
            value: eps,
            period: "Forward".to_string(),
            source: "Analyst Consensus".to_string(),
        };
        Self::classify("Forward EPS (Consensus)", claimed, &actual, EPS_TOLERANCE)
    }

    /// Tolerance-band classification shared by every claim class.
    fn classify(
        metric: &str,
        claimed: f64,
        actual: &NumericFact,
        tolerance: f64,
    ) -> Option<FactCheckResult> {
        if actual.value == 0.0 {
            // Deviation is undefined against a zero actual; skip, don't flag
            tracing::warn!("zero actual for {}, skipping", metric);
            return None;
        }

        let diff = (claimed - actual.value) / actual.value;
        let status = if diff.abs() < tolerance {
            FactStatus::Match
        } else {
            FactStatus::Mismatch
        };

        Some(FactCheckResult {
            metric: metric.to_string(),
            claimed,
            actual: actual.value,
            source: actual.source.clone(),
            status,
            diff_pct: (diff * 1000.0).round() / 10.0,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ConsensusSnapshot;

    struct FixedRevenue(Option<f64>);

    impl RevenueSource for FixedRevenue {
        fn latest_annual_value(&self, _ticker: &str) -> Option<NumericFact> {
            self.0.map(|value| NumericFact {
                value,
                period: "FY2024".to_string(),
                source: "SEC 10-K".to_string(),
            })
        }
    }

    struct FixedConsensus(Option<f64>);

    impl ConsensusSource for FixedConsensus {
        fn consensus_snapshot(&self, _ticker: &str) -> ConsensusSnapshot {
            ConsensusSnapshot {
                forward_eps: self.0,
                ..Default::default()
            }
        }
    }

    fn verifier(revenue: Option<f64>, eps: Option<f64>) -> ClaimVerifier {
        ClaimVerifier::new(Box::new(FixedRevenue(revenue)), Box::new(FixedConsensus(eps)))
    }

    fn revenue_check(text: &str, actual: f64) -> FactCheckResult {
        let results = verifier(Some(actual), None).verify(text, "NVDA");
        results
            .into_iter()
            .find(|r| r.metric.starts_with("Revenue"))
            .expect("expected a revenue check")
    }

    #[test]
    fn test_revenue_exact_match() {
        let check = revenue_check("revenue of $60 billion this year", 60e9);
        assert_eq!(check.status, FactStatus::Match);
        assert_eq!(check.diff_pct, 0.0);
    }

    #[test]
    fn test_revenue_hallucination_mismatch() {
        let check = revenue_check("revenue of $100 billion!", 60e9);
        assert_eq!(check.status, FactStatus::Mismatch);
        assert_eq!(check.diff_pct, 66.7);
    }

    #[test]
    fn test_revenue_inside_tolerance_band() {
        // 4.8% over → inside the 5% band
        let check = revenue_check("revenue of $62.9 billion", 60e9);
        assert_eq!(check.status, FactStatus::Match);
    }

    #[test]
    fn test_revenue_outside_tolerance_band() {
        // 5.17% over → outside the 5% band
        let check = revenue_check("revenue of $63.1 billion", 60e9);
        assert_eq!(check.status, FactStatus::Mismatch);
    }

    #[test]
    fn test_revenue_deviation_is_signed() {
        let check = revenue_check("revenue of $50 billion", 60e9);
        assert_eq!(check.status, FactStatus::Mismatch);
        assert!(check.diff_pct < 0.0);
    }

    #[test]
    fn test_first_revenue_match_wins() {
        let text = "Revenue of $60 billion, though bulls whisper revenue of $80 billion.";
        let check = revenue_check(text, 60e9);
        assert_eq!(check.status, FactStatus::Match);
        assert_eq!(check.claimed, 60e9);
    }

    #[test]
    fn test_comma_separated_claim_parses() {
        let check = revenue_check("revenue of $1,000 billion", 1_000e9);
        assert_eq!(check.status, FactStatus::Match);
    }

    #[test]
    fn test_empty_ticker_returns_empty() {
        let results = verifier(Some(60e9), Some(3.5)).verify("revenue of $60 billion", "");
        assert!(results.is_empty());
    }

    #[test]
    fn test_unverifiable_revenue_claim_skipped() {
        // Claim detected but no authoritative figure → silence, not MISMATCH
        let results = verifier(None, None).verify("revenue of $60 billion", "NVDA");
        assert!(results.is_empty());
    }

    #[test]
    fn test_eps_match_and_mismatch() {
        let results = verifier(None, Some(3.50)).verify("EPS of $3.60 expected", "NVDA");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, FactStatus::Match); // 2.9% < 10%

        let results = verifier(None, Some(3.50)).verify("EPS of $4.00 expected", "NVDA");
        assert_eq!(results[0].status, FactStatus::Mismatch); // 14.3%
    }

    #[test]
    fn test_missing_consensus_suppresses_eps_check() {
        let results = verifier(None, None).verify("EPS of $3.50", "NVDA");
        assert!(results.is_empty());
        println!("✅ No-data consensus produced zero EPS results");
    }

    #[test]
    fn test_zero_actual_skipped_not_flagged() {
        let results = verifier(Some(0.0), None).verify("revenue of $60 billion", "NVDA");
        assert!(results.is_empty());
    }

    #[test]
    fn test_metric_faults_are_independent() {
        // Revenue source empty, consensus present: EPS still checked
        let text = "revenue of $60 billion on EPS of $3.50";
        let results = verifier(None, Some(3.50)).verify(text, "NVDA");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metric, "Forward EPS (Consensus)");
    }

    #[test]
    fn test_both_claims_checked_in_order() {
        let text = "We model revenue of $60 billion and EPS of $3.50.";
        let results = verifier(Some(60e9), Some(3.50)).verify(text, "NVDA");
        assert_eq!(results.len(), 2);
        assert!(results[0].metric.starts_with("Revenue"));
        assert_eq!(results[1].metric, "Forward EPS (Consensus)");
    }

    #[test]
    fn test_report_summary() {
        let report = VerificationReport {
            source: "note.txt".to_string(),
            ticker: "NVDA".to_string(),
            results: verifier(Some(60e9), None).verify("revenue of $100 billion", "NVDA"),
            verified_at: chrono::Utc::now(),
        };
        assert_eq!(report.summary(), "note.txt [NVDA]: 1 claims checked, 1 mismatched");
    }
}
