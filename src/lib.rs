// Research Clean Room - Core Library
// Sanitizes financial research documents and cross-checks their
// quantitative claims against authoritative external data.
//
// Pipeline: raw document → Sanitizer → clean text → Entity Resolver
// → Claim Verifier (filings + consensus) → fact-check verdicts

pub mod patterns;
pub mod providers;
pub mod resolver;
pub mod sanitizer;
pub mod verifier;

// Re-export commonly used types
pub use providers::{
    ConsensusClient, ConsensusSnapshot, ConsensusSource, FilingsClient, NumericFact,
    RevenueSource,
};
pub use resolver::{CompanyDirectory, CompanyIdentity, DirectorySource};
pub use sanitizer::{DocumentKind, DocumentSanitizer, SanitizedDocument};
pub use verifier::{ClaimVerifier, FactCheckResult, FactStatus, VerificationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Descriptive client identifier sent to every external provider.
pub const USER_AGENT: &str =
    concat!("ResearchCleanRoom/", env!("CARGO_PKG_VERSION"), " (research@example.com)");
