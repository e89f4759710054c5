use super::traits::{Candidate, DocumentResolver, Provenance, ProviderError, ResolvedReference};
use crate::client::Downloader;
use crate::config::UnpaywallConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    best_oa_location: Option<BestLocation>,
}

#[derive(Debug, Deserialize)]
struct BestLocation {
    url_for_pdf: Option<String>,
}

/// Looks a DOI up in the Unpaywall open-access API
#[derive(Debug, Clone)]
pub struct UnpaywallResolver {
    client: Client,
    config: UnpaywallConfig,
    downloader: Downloader,
}

impl UnpaywallResolver {
    pub const fn new(client: Client, config: UnpaywallConfig, downloader: Downloader) -> Self {
        Self {
            client,
            config,
            downloader,
        }
    }

    /// `<base>/<doi>`; each DOI segment is percent-encoded but the `/`
    /// separators are kept since the API routes on them
    fn lookup_url(&self, doi: &str) -> String {
        let encoded = doi
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), encoded)
    }

    async fn lookup(&self, doi: &str) -> Result<Option<String>, ProviderError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let url = self.lookup_url(doi);
        debug!("Unpaywall lookup: {}", url);

        let sent = self
            .client
            .get(&url)
            .query(&[("email", self.config.email.as_str())])
            .timeout(timeout)
            .send()
            .await;

        tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;

        let response = sent.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body: UnpaywallResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Unpaywall response: {e}")))?;

        Ok(body
            .best_oa_location
            .and_then(|loc| loc.url_for_pdf)
            .filter(|u| !u.trim().is_empty()))
    }
}

#[async_trait]
impl DocumentResolver for UnpaywallResolver {
    fn name(&self) -> &str {
        "unpaywall"
    }

    fn provenance(&self) -> Provenance {
        Provenance::OpenAccessApi
    }

    async fn try_resolve(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<ResolvedReference>, ProviderError> {
        let Some(doi) = candidate.doi.as_deref() else {
            return Ok(None);
        };

        Ok(self
            .lookup(doi)
            .await?
            .map(|url| ResolvedReference::new(url, Provenance::OpenAccessApi)))
    }

    async fn fetch(&self, reference: &ResolvedReference, target: &Path) -> bool {
        self.downloader.download(&reference.url, target).await
    }
}
