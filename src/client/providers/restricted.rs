use super::traits::{Candidate, DocumentResolver, Provenance, ProviderError, ResolvedReference};
use crate::config::FallbackConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Last-resort resolver that shells out to an external download utility.
///
/// The utility writes into a private temporary directory; the first document
/// it produces is moved to the candidate's target path during `resolve`, so
/// `fetch` only confirms the file is there.
#[derive(Debug, Clone)]
pub struct RestrictedAccessResolver {
    config: FallbackConfig,
}

impl RestrictedAccessResolver {
    pub const fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    fn command(&self, doi: &str, out_dir: &Path) -> Command {
        // The utility treats --out as a file name unless it ends in a separator
        let out = format!("{}{MAIN_SEPARATOR}", out_dir.display());
        let mut command = Command::new(&self.config.command);
        command
            .arg("download")
            .arg("--doi")
            .arg(format!("https://doi.org/{doi}"))
            .arg("--out")
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run_utility(&self, doi: &str, out_dir: &Path) -> Result<(), ProviderError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, self.command(doi, out_dir).output())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProviderError::ToolUnavailable(self.config.command.clone())
                } else {
                    ProviderError::Other(format!("failed to run {}: {e}", self.config.command))
                }
            })?;

        if !output.status.success() {
            debug!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    /// First `.pdf` in `dir`, by file name
    async fn first_document(dir: &Path) -> Result<Option<PathBuf>, ProviderError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ProviderError::Other(e.to_string()))?;
        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProviderError::Other(e.to_string()))?
        {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if is_pdf {
                documents.push(path);
            }
        }
        documents.sort();
        Ok(documents.into_iter().next())
    }

    async fn move_into_place(source: &Path, target: &Path) -> std::io::Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::rename(source, target).await.is_err() {
            // Temp dir may sit on another filesystem
            tokio::fs::copy(source, target).await?;
            tokio::fs::remove_file(source).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentResolver for RestrictedAccessResolver {
    fn name(&self) -> &str {
        "restricted_fallback"
    }

    fn provenance(&self) -> Provenance {
        Provenance::RestrictedFallback
    }

    async fn try_resolve(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<ResolvedReference>, ProviderError> {
        let Some(doi) = candidate.doi.as_deref() else {
            return Ok(None);
        };
        info!("Trying {} for DOI: {}", self.config.command, doi);

        let scratch = tempfile::tempdir().map_err(|e| ProviderError::Other(e.to_string()))?;
        self.run_utility(doi, scratch.path()).await?;
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let Some(document) = Self::first_document(scratch.path()).await? else {
            warn!("{} produced no document for {}", self.config.command, doi);
            return Ok(None);
        };

        Self::move_into_place(&document, &candidate.target)
            .await
            .map_err(|e| ProviderError::Other(format!("could not move document: {e}")))?;
        info!("Fetched via {}: {:?}", self.config.command, candidate.target);

        Ok(Some(ResolvedReference::new(
            format!("https://doi.org/{doi}"),
            Provenance::RestrictedFallback,
        )))
    }

    async fn fetch(&self, _reference: &ResolvedReference, target: &Path) -> bool {
        tokio::fs::try_exists(target).await.unwrap_or(false)
    }
}
