use super::traits::{Candidate, DocumentResolver, Provenance, ProviderError, ResolvedReference};
use crate::client::Downloader;
use async_trait::async_trait;
use std::path::Path;

/// Uses the document URL the index already embedded in the record.
/// No network call is made during resolution.
#[derive(Debug, Clone)]
pub struct EmbeddedLocationResolver {
    downloader: Downloader,
}

impl EmbeddedLocationResolver {
    pub const fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl DocumentResolver for EmbeddedLocationResolver {
    fn name(&self) -> &str {
        "embedded_location"
    }

    fn provenance(&self) -> Provenance {
        Provenance::EmbeddedLocation
    }

    async fn try_resolve(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<ResolvedReference>, ProviderError> {
        Ok(candidate
            .record
            .locations
            .first_document_url()
            .map(|url| ResolvedReference::new(url, Provenance::EmbeddedLocation)))
    }

    async fn fetch(&self, reference: &ResolvedReference, target: &Path) -> bool {
        self.downloader.download(&reference.url, target).await
    }
}
