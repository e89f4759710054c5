use crate::client::SearchRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Which resolver produced a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Location embedded in the index record
    EmbeddedLocation,
    /// Open-access resolution API keyed by DOI
    OpenAccessApi,
    /// External utility run as a subprocess
    RestrictedFallback,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EmbeddedLocation => "embedded_location",
            Self::OpenAccessApi => "open_access_api",
            Self::RestrictedFallback => "restricted_fallback",
        };
        f.write_str(name)
    }
}

/// A fetchable document reference, valid for one orchestrator iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub url: String,
    pub provenance: Provenance,
}

impl ResolvedReference {
    pub fn new(url: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            url: url.into(),
            provenance,
        }
    }
}

/// One index record being acquired, with its normalized DOI and target path
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: SearchRecord,
    pub doi: Option<String>,
    pub target: PathBuf,
}

impl Candidate {
    pub fn new(record: SearchRecord, target: PathBuf) -> Self {
        let doi = crate::client::normalize_doi(record.doi.as_deref());
        Self {
            record,
            doi,
            target,
        }
    }
}

/// Failures local to a resolver; they never escape `resolve`
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("External tool not installed: {0}")]
    ToolUnavailable(String),

    #[error("Provider error: {0}")]
    Other(String),
}

/// One step of the ordered fallback chain.
///
/// `resolve` turns a candidate into a reference, `fetch` materializes it at
/// the target path. Resolvers that write the document themselves treat
/// `fetch` as a check that the file is present.
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    /// Unique name used in logs
    fn name(&self) -> &str;

    fn provenance(&self) -> Provenance;

    /// Attempt resolution; `Ok(None)` means this resolver does not apply
    async fn try_resolve(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<ResolvedReference>, ProviderError>;

    /// Write the referenced document to `target`
    async fn fetch(&self, reference: &ResolvedReference, target: &Path) -> bool;

    /// Soft-failing resolution: errors are logged and reported as "no result"
    async fn resolve(&self, candidate: &Candidate) -> Option<ResolvedReference> {
        match self.try_resolve(candidate).await {
            Ok(Some(reference)) => {
                debug!("{} resolved {}", self.name(), reference.url);
                Some(reference)
            }
            Ok(None) => None,
            Err(e) => {
                let err = crate::Error::from(e);
                if err.is_soft_failure() {
                    warn!("{} failed for '{}': {}", self.name(), candidate.record.title, err);
                } else {
                    error!("{} failed for '{}': {}", self.name(), candidate.record.title, err);
                }
                None
            }
        }
    }
}
