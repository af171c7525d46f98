// 🧹 Document Sanitizer - Boilerplate removal + entity redaction
//
// Two sequential passes over the raw text:
//   1. Structural cut: hard cutoff at the first legal stop marker,
//      per-line drop of noise (page furniture, email headers, attributions)
//   2. Entity redaction: case-insensitive literal replacement of every
//      denylisted name with a fixed token
//
// Redaction runs only after the structural cut, so names that live in the
// discarded disclaimer block never need redacting.

use crate::patterns::{
    LEGAL_STOP_MARKERS, MAX_MARKER_LINE_LEN, NOISE_PATTERNS, REDACTION_TOKEN,
};
use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// DOCUMENT KIND
// ============================================================================

/// Coarse document classification inferred from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Newsletter,
    ResearchNote,
}

impl DocumentKind {
    pub fn from_source(source: &str) -> Self {
        if source.to_lowercase().contains("newsletter") {
            DocumentKind::Newsletter
        } else {
            DocumentKind::ResearchNote
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Newsletter => "newsletter",
            DocumentKind::ResearchNote => "research note",
        }
    }
}

// ============================================================================
// SANITIZED DOCUMENT
// ============================================================================

/// Clean, de-identified prose plus provenance. Created once per input
/// document and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedDocument {
    /// Original filename
    pub source: String,

    /// Cleaned text, ready for claim extraction
    pub content: String,

    /// Newsletter vs research note
    pub kind: DocumentKind,

    /// 1 - len(clean) / len(raw). A reporting metric, not a hard invariant:
    /// redaction substitutions can occasionally lengthen text slightly.
    pub boilerplate_removed: f64,
}

// ============================================================================
// SANITIZER
// ============================================================================

/// Converts raw paginated documents into clean, de-identified prose.
///
/// The denylist is supplied by a deployment-private configuration file and
/// is never embedded in shipped logic. An empty denylist is a valid
/// degraded mode: no redaction.
pub struct DocumentSanitizer {
    denylist: Vec<String>,
    /// One case-insensitive literal matcher per denylist entry
    redactors: Vec<regex::Regex>,
}

impl DocumentSanitizer {
    /// Sanitizer with no redaction.
    pub fn new() -> Self {
        Self::with_denylist(Vec::new())
    }

    /// Sanitizer with an injected denylist of literal names.
    ///
    /// Matching is literal substring, case-insensitive. Partial-word
    /// collisions are accepted collateral: redacting "Gold" also hits the
    /// "Gold" inside "Goldman". Over-redaction is preferred over leaks.
    pub fn with_denylist(entries: Vec<String>) -> Self {
        let redactors = entries
            .iter()
            .filter(|e| !e.is_empty())
            .filter_map(|entry| {
                RegexBuilder::new(&regex::escape(entry))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        tracing::warn!("unusable denylist entry {:?}: {}", entry, e);
                        e
                    })
                    .ok()
            })
            .collect();

        DocumentSanitizer {
            denylist: entries,
            redactors,
        }
    }

    /// Load the denylist from a JSON array of strings. A missing file is a
    /// valid degraded mode (no redaction), not an error.
    pub fn from_denylist_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("{} not found, running without entity redaction", path.display());
            return Self::new();
        }

        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).map_err(Into::into))
        {
            Ok(entries) => Self::with_denylist(entries),
            Err(e) => {
                tracing::warn!("could not parse denylist {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn denylist_len(&self) -> usize {
        self.denylist.len()
    }

    /// Sanitize one document given its page-level text blocks.
    pub fn sanitize(&self, pages: &[String], source: &str) -> SanitizedDocument {
        let raw = pages.join("\n");
        let cut = self.structural_cut(&raw);
        let content = self.redact(&cut);

        let boilerplate_removed = if raw.is_empty() {
            0.0
        } else {
            1.0 - (content.len() as f64 / raw.len() as f64)
        };

        SanitizedDocument {
            source: source.to_string(),
            content,
            kind: DocumentKind::from_source(source),
            boilerplate_removed,
        }
    }

    /// Pass 1: stop-marker hard cutoff + per-line noise drop.
    ///
    /// A short line containing a legal stop marker discards itself and every
    /// line after it (disclaimers are trailing blocks, so a hard cutoff is
    /// safe). Noise lines are dropped individually wherever they appear.
    fn structural_cut(&self, text: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();

        'lines: for line in text.lines() {
            let trimmed = line.trim();

            if trimmed.chars().count() < MAX_MARKER_LINE_LEN {
                let lower = trimmed.to_lowercase();
                for marker in LEGAL_STOP_MARKERS {
                    if lower.contains(&marker.to_lowercase()) {
                        break 'lines;
                    }
                }
            }

            let is_noise = NOISE_PATTERNS.iter().any(|re| re.is_match(trimmed));
            if !is_noise && !trimmed.is_empty() {
                kept.push(trimmed);
            }
        }

        kept.join("\n")
    }

    /// Pass 2: replace every denylisted name with the redaction token.
    fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for re in &self.redactors {
            out = re.replace_all(&out, REDACTION_TOKEN).into_owned();
        }
        out
    }

    /// Batch load: sanitize every `.txt` file in a directory.
    ///
    /// A failure on one document is logged and skipped; it never aborts the
    /// rest of the batch.
    pub fn load_directory(&self, dir: &Path) -> Vec<SanitizedDocument> {
        let mut documents = Vec::new();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cannot read document directory {}: {}", dir.display(), e);
                return documents;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("txt"))
            .collect();
        paths.sort();

        for path in paths {
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown.txt")
                .to_string();

            match self.load_one(&path, &source) {
                Ok(doc) => documents.push(doc),
                Err(e) => tracing::warn!("failed to load {}: {}", source, e),
            }
        }

        documents
    }

    fn load_one(&self, path: &Path, source: &str) -> Result<SanitizedDocument> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(self.sanitize(&[raw], source))
    }
}

impl Default for DocumentSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
