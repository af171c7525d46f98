// 🏛️ Regulatory Filings Provider - XBRL company facts with filesystem cache
//
// Read-through cache keyed by filer ID (CIK): one JSON file per company,
// valid for 7 days, refreshed through a rate-limited HTTP fetch. The raw
// response is persisted verbatim; figure extraction happens afterwards so a
// cached payload can answer future concept lookups too.

use crate::patterns::{ANNUAL_REPORT_FORM, FILING_CACHE_TTL_SECS, REVENUE_CONCEPTS};
use crate::providers::{NumericFact, RevenueSource};
use crate::resolver::CompanyDirectory;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

const FACTS_URL: &str = "https://data.sec.gov/api/xbrl/companyfacts/CIK{cik}.json";

/// Fixed pre-request delay honoring the provider's published rate ceiling.
const MIN_REQUEST_DELAY: Duration = Duration::from_millis(150);

/// Fixed per-call socket timeout. A hung provider stalls only this call.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// TRANSPORT
// ============================================================================

/// Remote filing service, boxed so tests can count calls and script payloads.
pub trait FilingsTransport: Send + Sync {
    fn company_facts(&self, cik: &str) -> Result<Value>;
}

/// HTTP transport: sleeps the minimum delay before every request and sends
/// a descriptive client identifier, as the provider requires.
pub struct SecFactsTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl SecFactsTransport {
    pub fn new(user_agent: &str) -> Self {
        SecFactsTransport {
            agent: ureq::AgentBuilder::new().timeout(SOCKET_TIMEOUT).build(),
            user_agent: user_agent.to_string(),
        }
    }
}

impl FilingsTransport for SecFactsTransport {
    fn company_facts(&self, cik: &str) -> Result<Value> {
        // Fixed delay before each request, independent of concurrency
        thread::sleep(MIN_REQUEST_DELAY);

        let url = FACTS_URL.replace("{cik}", cik);
        self.agent
            .get(&url)
            .set("User-Agent", &self.user_agent)
            .call()
            .with_context(|| format!("fetching company facts for CIK {}", cik))?
            .into_json()
            .with_context(|| format!("parsing company facts for CIK {}", cik))
    }
}

// ============================================================================
// FRESHNESS POLICY
// ============================================================================

/// A cache entry older than the freshness window must be refetched.
pub fn is_stale(age: Duration) -> bool {
    age > Duration::from_secs(FILING_CACHE_TTL_SECS)
}

// ============================================================================
// FILINGS CLIENT
// ============================================================================

/// Read-through cache over the regulatory filing service.
pub struct FilingsClient {
    directory: Arc<CompanyDirectory>,
    cache_dir: PathBuf,
    transport: Box<dyn FilingsTransport>,
}

impl FilingsClient {
    pub fn new(directory: Arc<CompanyDirectory>, cache_dir: &Path, user_agent: &str) -> Self {
        Self::with_transport(
            directory,
            cache_dir,
            Box::new(SecFactsTransport::new(user_agent)),
        )
    }

    pub fn with_transport(
        directory: Arc<CompanyDirectory>,
        cache_dir: &Path,
        transport: Box<dyn FilingsTransport>,
    ) -> Self {
        FilingsClient {
            directory,
            cache_dir: cache_dir.to_path_buf(),
            transport,
        }
    }

    fn cache_path(&self, cik: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", cik))
    }

    /// Fetch the raw facts payload, preferring a fresh cache entry.
    ///
    /// Cache faults (unreadable file, bad JSON) are logged and bypassed by
    /// falling through to a fresh remote fetch. A failed cache write never
    /// fails the fetch that produced the data.
    fn company_facts(&self, cik: &str) -> Option<Value> {
        let path = self.cache_path(cik);

        if let Some(cached) = self.read_fresh_cache(&path) {
            return Some(cached);
        }

        match self.transport.company_facts(cik) {
            Ok(payload) => {
                if let Err(e) = self.write_cache(&path, &payload) {
                    tracing::warn!("cache write failed for CIK {}: {}", cik, e);
                }
                Some(payload)
            }
            Err(e) => {
                tracing::warn!("filing fetch failed for CIK {}: {}", cik, e);
                None
            }
        }
    }

    fn read_fresh_cache(&self, path: &Path) -> Option<Value> {
        let meta = fs::metadata(path).ok()?;
        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())?;
        if is_stale(age) {
            return None;
        }

        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(Into::into))
        {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!("unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Atomic overwrite: write a temp file, then rename over the entry.
    fn write_cache(&self, path: &Path, payload: &Value) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("creating cache dir {}", self.cache_dir.display()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(payload)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }

    /// Pull the most recent annual figure out of a facts payload.
    ///
    /// Filers tag revenue inconsistently, so the concept list is scanned in
    /// priority order; for the first concept present, keep only annual-report
    /// entries, sort by period end descending (stable: provider order breaks
    /// ties) and take the newest.
    fn extract_latest_annual(payload: &Value) -> Result<NumericFact> {
        let gaap = payload
            .get("facts")
            .and_then(|v| v.get("us-gaap"))
            .ok_or_else(|| anyhow!("payload has no us-gaap facts"))?;

        for concept in REVENUE_CONCEPTS {
            let Some(entries) = gaap
                .get(concept)
                .and_then(|c| c.get("units"))
                .and_then(|u| u.get("USD"))
                .and_then(|v| v.as_array())
            else {
                continue;
            };

            let mut annual: Vec<&Value> = entries
                .iter()
                .filter(|e| {
                    e.get("form").and_then(|f| f.as_str()) == Some(ANNUAL_REPORT_FORM)
                })
                .collect();
            if annual.is_empty() {
                continue;
            }

            annual.sort_by(|a, b| {
                let end_a = a.get("end").and_then(|v| v.as_str()).unwrap_or("");
                let end_b = b.get("end").and_then(|v| v.as_str()).unwrap_or("");
                end_b.cmp(end_a)
            });

            let latest = annual[0];
            let value = latest
                .get("val")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| anyhow!("annual entry has no numeric val"))?;
            let fiscal_year = latest.get("fy").and_then(|v| v.as_u64());

            return Ok(NumericFact {
                value,
                period: match fiscal_year {
                    Some(fy) => format!("FY{}", fy),
                    None => "FY?".to_string(),
                },
                source: format!("SEC {}", ANNUAL_REPORT_FORM),
            });
        }

        Err(anyhow!("no annual entries under any known revenue concept"))
    }
}

impl RevenueSource for FilingsClient {
    fn latest_annual_value(&self, ticker: &str) -> Option<NumericFact> {
        let Some(company) = self.directory.lookup(ticker) else {
            tracing::warn!("no filer ID for ticker {}", ticker);
            return None;
        };

        let payload = self.company_facts(&company.cik)?;
        match Self::extract_latest_annual(&payload) {
            Ok(fact) => Some(fact),
            Err(e) => {
                tracing::warn!("no annual figure for {}: {}", ticker, e);
                None
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
    use crate::resolver::DirectorySource;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OfflineDirectory;
    impl DirectorySource for OfflineDirectory {
        fn fetch_all(&self) -> Result<Vec<crate::resolver::CompanyIdentity>> {
            Err(anyhow!("offline"))
        }
    }

    fn directory() -> Arc<CompanyDirectory> {
        Arc::new(CompanyDirectory::with_source(Box::new(OfflineDirectory)))
    }

    struct ScriptedTransport {
        calls: Arc<AtomicUsize>,
        payload: Option<Value>,
    }

    impl FilingsTransport for ScriptedTransport {
        fn company_facts(&self, _cik: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload.clone().ok_or_else(|| anyhow!("simulated outage"))
        }
    }

    fn facts_payload(entries: Value) -> Value {
        json!({
            "facts": { "us-gaap": {
                "Revenues": { "units": { "USD": entries } }
            }}
        })
    }

    fn client_with(
        payload: Option<Value>,
        cache_dir: &Path,
    ) -> (FilingsClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport {
            calls: calls.clone(),
            payload,
        };
        (
            FilingsClient::with_transport(directory(), cache_dir, Box::new(transport)),
            calls,
        )
    }

    #[test]
    fn test_freshness_policy_six_vs_eight_days() {
        assert!(!is_stale(Duration::from_secs(6 * 86_400)));
        assert!(is_stale(Duration::from_secs(8 * 86_400)));
    }

    #[test]
    fn test_latest_annual_picks_newest_10k() {
        let payload = facts_payload(json!([
            { "val": 26_914_000_000.0, "fy": 2023, "end": "2023-01-29", "form": "10-K" },
            { "val": 60_922_000_000.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
            { "val": 22_103_000_000.0, "fy": 2024, "end": "2023-10-29", "form": "10-Q" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client_with(Some(payload), dir.path());

        let fact = client.latest_annual_value("NVDA").unwrap();
        assert_eq!(fact.value, 60_922_000_000.0);
        assert_eq!(fact.period, "FY2024");
        assert_eq!(fact.source, "SEC 10-K");
    }

    #[test]
    fn test_quarterly_only_concept_yields_none() {
        let payload = facts_payload(json!([
            { "val": 22_103_000_000.0, "fy": 2024, "end": "2023-10-29", "form": "10-Q" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client_with(Some(payload), dir.path());

        assert!(client.latest_annual_value("NVDA").is_none());
    }

    #[test]
    fn test_concept_priority_order() {
        // Preferred concept present → the fallback concept is never consulted
        let payload = json!({
            "facts": { "us-gaap": {
                "RevenueFromContractWithCustomerExcludingAssessedTax": {
                    "units": { "USD": [
                        { "val": 50.0, "fy": 2024, "end": "2024-06-30", "form": "10-K" }
                    ]}
                },
                "Revenues": {
                    "units": { "USD": [
                        { "val": 99.0, "fy": 2024, "end": "2024-06-30", "form": "10-K" }
                    ]}
                }
            }}
        });

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client_with(Some(payload), dir.path());

        assert_eq!(client.latest_annual_value("MSFT").unwrap().value, 50.0);
    }

    #[test]
    fn test_fresh_cache_entry_skips_remote_call() {
        let payload = facts_payload(json!([
            { "val": 1.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        // Pre-write a fresh cache entry for NVDA's CIK
        std::fs::write(
            dir.path().join("0001045810.json"),
            serde_json::to_vec(&payload).unwrap(),
        )
        .unwrap();

        let (client, calls) = client_with(None, dir.path());
        let fact = client.latest_annual_value("NVDA").unwrap();

        assert_eq!(fact.value, 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        println!("✅ Fresh cache answered without a remote call");
    }

    #[test]
    fn test_stale_cache_entry_triggers_refetch() {
        let aged_payload = facts_payload(json!([
            { "val": 1.0, "fy": 2023, "end": "2023-01-29", "form": "10-K" },
        ]));
        let fresh_payload = facts_payload(json!([
            { "val": 5.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0001045810.json");
        std::fs::write(&path, serde_json::to_vec(&aged_payload).unwrap()).unwrap();

        // Backdate the entry past the freshness window
        let backdated = SystemTime::now() - Duration::from_secs(8 * 86_400);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(backdated)
            .unwrap();

        let (client, calls) = client_with(Some(fresh_payload), dir.path());
        let fact = client.latest_annual_value("NVDA").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fact.value, 5.0);
        assert_eq!(fact.period, "FY2024");
        println!("✅ Aged cache entry refetched from the remote");
    }

    #[test]
    fn test_miss_fetches_then_cache_reused() {
        let payload = facts_payload(json!([
            { "val": 2.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        let (client, calls) = client_with(Some(payload), dir.path());

        assert!(client.latest_annual_value("NVDA").is_some());
        assert!(client.latest_annual_value("NVDA").is_some());

        // Second lookup served from the file written by the first
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("0001045810.json").exists());
    }

    #[test]
    fn test_corrupt_cache_falls_through_to_fetch() {
        let payload = facts_payload(json!([
            { "val": 3.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
        ]));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001045810.json"), b"{ not json").unwrap();

        let (client, calls) = client_with(Some(payload), dir.path());
        assert_eq!(client.latest_annual_value("NVDA").unwrap().value, 3.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_write_failure_does_not_fail_fetch() {
        let payload = facts_payload(json!([
            { "val": 4.0, "fy": 2024, "end": "2024-01-28", "form": "10-K" },
        ]));

        // A file where the cache directory should be makes every write fail
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let (client, _) = client_with(Some(payload), blocker.path());

        assert_eq!(client.latest_annual_value("NVDA").unwrap().value, 4.0);
        println!("✅ Best-effort cache: data returned despite unwritable cache dir");
    }

    #[test]
    fn test_provider_outage_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client_with(None, dir.path());
        assert!(client.latest_annual_value("NVDA").is_none());
    }

    #[test]
    fn test_unknown_ticker_yields_none_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let (client, calls) = client_with(None, dir.path());
        assert!(client.latest_annual_value("ZZZZ").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
