// 📊 Consensus Provider - market snapshot per ticker
//
// One remote call per invocation, no persistent cache: consensus moves often
// enough that per-run freshness beats cross-run caching. Every field is
// independently optional; absent data is never defaulted to zero, so the
// verifier can tell "no data" from "value is zero".

use crate::providers::ConsensusSource;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote?symbols=";
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Flat consensus record for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    pub price: Option<f64>,
    pub forward_eps: Option<f64>,
    pub price_target: Option<f64>,
    pub market_cap: Option<f64>,
}

impl ConsensusSnapshot {
    /// Normalize a flat provider info record. The service has renamed fields
    /// across versions, so both spellings are read before giving up.
    pub fn from_info(info: &Value) -> Self {
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| info.get(*k).and_then(|v| v.as_f64()))
        };

        ConsensusSnapshot {
            price: field(&["currentPrice", "regularMarketPrice"]),
            forward_eps: field(&["forwardEps", "epsForward"]),
            price_target: field(&["targetMeanPrice"]),
            market_cap: field(&["marketCap"]),
        }
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Quote service returning one flat info record per ticker.
pub trait QuoteTransport: Send + Sync {
    fn quote(&self, ticker: &str) -> Result<Value>;
}

/// HTTP quote transport.
pub struct HttpQuoteTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpQuoteTransport {
    pub fn new(user_agent: &str) -> Self {
        HttpQuoteTransport {
            agent: ureq::AgentBuilder::new().timeout(SOCKET_TIMEOUT).build(),
            user_agent: user_agent.to_string(),
        }
    }
}

impl QuoteTransport for HttpQuoteTransport {
    fn quote(&self, ticker: &str) -> Result<Value> {
        let url = format!("{}{}", QUOTE_URL, ticker);
        let payload: Value = self
            .agent
            .get(&url)
            .set("User-Agent", &self.user_agent)
            .call()
            .with_context(|| format!("fetching quote for {}", ticker))?
            .into_json()
            .with_context(|| format!("parsing quote for {}", ticker))?;

        payload
            .get("quoteResponse")
            .and_then(|r| r.get("result"))
            .and_then(|r| r.get(0))
            .cloned()
            .ok_or_else(|| anyhow!("empty quote response for {}", ticker))
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct ConsensusClient {
    transport: Box<dyn QuoteTransport>,
}

impl ConsensusClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_transport(Box::new(HttpQuoteTransport::new(user_agent)))
    }

    pub fn with_transport(transport: Box<dyn QuoteTransport>) -> Self {
        ConsensusClient { transport }
    }
}

impl ConsensusSource for ConsensusClient {
    /// Any transport or parse failure yields an all-absent snapshot plus a
    /// warning; it never propagates to the caller.
    fn consensus_snapshot(&self, ticker: &str) -> ConsensusSnapshot {
        match self.transport.quote(ticker) {
            Ok(info) => ConsensusSnapshot::from_info(&info),
            Err(e) => {
                tracing::warn!("consensus lookup failed for {}: {}", ticker, e);
                ConsensusSnapshot::default()
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticQuote(Option<Value>);

    impl QuoteTransport for StaticQuote {
        fn quote(&self, _ticker: &str) -> Result<Value> {
            self.0.clone().ok_or_else(|| anyhow!("simulated outage"))
        }
    }

    #[test]
    fn test_all_fields_present() {
        let info = json!({
            "currentPrice": 150.0,
            "forwardEps": 5.20,
            "targetMeanPrice": 180.0,
            "marketCap": 2.5e12,
        });
        let snap = ConsensusSnapshot::from_info(&info);

        assert_eq!(snap.price, Some(150.0));
        assert_eq!(snap.forward_eps, Some(5.20));
        assert_eq!(snap.price_target, Some(180.0));
        assert_eq!(snap.market_cap, Some(2.5e12));
    }

    #[test]
    fn test_legacy_field_spellings() {
        let info = json!({ "regularMarketPrice": 99.5, "epsForward": 4.1 });
        let snap = ConsensusSnapshot::from_info(&info);

        assert_eq!(snap.price, Some(99.5));
        assert_eq!(snap.forward_eps, Some(4.1));
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let snap = ConsensusSnapshot::from_info(&json!({ "marketCap": 1.0e9 }));

        assert_eq!(snap.market_cap, Some(1.0e9));
        assert_eq!(snap.price, None);
        assert_eq!(snap.forward_eps, None);
        assert_eq!(snap.price_target, None);
    }

    #[test]
    fn test_outage_yields_default_snapshot() {
        let client = ConsensusClient::with_transport(Box::new(StaticQuote(None)));
        let snap = client.consensus_snapshot("NVDA");
        assert_eq!(snap, ConsensusSnapshot::default());
    }

    #[test]
    fn test_snapshot_through_client() {
        let client = ConsensusClient::with_transport(Box::new(StaticQuote(Some(json!({
            "currentPrice": 10.0
        })))));
        assert_eq!(client.consensus_snapshot("AAPL").price, Some(10.0));
    }
}
