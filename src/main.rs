use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use research_cleanroom::{
    ClaimVerifier, CompanyDirectory, ConsensusClient, DocumentSanitizer, FactStatus,
    FilingsClient, VerificationReport, USER_AGENT, VERSION,
};

struct Config {
    docs_dir: PathBuf,
    denylist_path: PathBuf,
    cache_dir: PathBuf,
}

impl Config {
    /// `research-cleanroom [docs_dir] [denylist.json] [cache_dir]`
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        Config {
            docs_dir: args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/raw_docs")),
            denylist_path: args
                .get(2)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("banned_entities.json")),
            cache_dir: args
                .get(3)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/cache/filings")),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = Config::from_args();

    println!("🧼 Research Clean Room v{}", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Sanitizer with the deployment-private denylist
    let sanitizer = DocumentSanitizer::from_denylist_file(&config.denylist_path);
    println!("🔒 Denylist entries loaded: {}", sanitizer.denylist_len());

    // 2. Load and sanitize the batch
    println!("\n📄 Loading documents from {}...", config.docs_dir.display());
    let documents = sanitizer.load_directory(&config.docs_dir);
    if documents.is_empty() {
        println!("⚠️  No .txt documents found. Drop research text files there and rerun.");
        return Ok(());
    }
    println!("✓ Sanitized {} documents", documents.len());

    // 3. Wire resolver, providers, verifier
    let directory = Arc::new(CompanyDirectory::new(USER_AGENT));
    let filings = FilingsClient::new(directory.clone(), &config.cache_dir, USER_AGENT);
    let consensus = ConsensusClient::new(USER_AGENT);
    let verifier = ClaimVerifier::new(Box::new(filings), Box::new(consensus));

    // 4. Verify document by document; one failure never aborts the batch
    for doc in &documents {
        println!(
            "\n📑 {} [{}] ({:.1}% boilerplate removed)",
            doc.source,
            doc.kind.as_str(),
            doc.boilerplate_removed * 100.0
        );

        let Some(ticker) = directory.resolve(&doc.content) else {
            println!("   ➡️  No single-company subject; routed to macro/thematic handling");
            continue;
        };

        let report = VerificationReport {
            source: doc.source.clone(),
            ticker: ticker.clone(),
            results: verifier.verify(&doc.content, &ticker),
            verified_at: chrono::Utc::now(),
        };

        if report.results.is_empty() {
            println!("   [{}] No verifiable quantitative claims", ticker);
            continue;
        }

        for check in &report.results {
            let icon = match check.status {
                FactStatus::Match => "✅",
                FactStatus::Mismatch => "❌",
            };
            println!(
                "   {} {}: claimed {:.2} vs actual {:.2} ({}, {:+.1}%)",
                icon, check.metric, check.claimed, check.actual, check.source, check.diff_pct
            );
        }
        println!("   {}", report.summary());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Batch complete: {} documents processed", documents.len());

    Ok(())
}
