use super::storage;
use crate::client::PaperMetadata;
use crate::text::{load_text, ExtractedDocument};
use crate::{Config, Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Input parameters for the extraction tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractInput {
    /// Metadata file written by the acquisition tool
    pub metadata_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    pub extracted_papers: usize,
    pub output_file: PathBuf,
    pub papers: Vec<ExtractedDocument>,
}

/// Segments and keywords every acquired document listed in a metadata file
#[derive(Debug, Clone)]
pub struct ExtractTool {
    config: Arc<Config>,
}

impl ExtractTool {
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    #[instrument(skip(self), fields(metadata_file = ?input.metadata_file))]
    pub async fn extract(&self, input: ExtractInput) -> Result<ExtractResult> {
        let papers: Vec<PaperMetadata> =
            storage::read_json(&input.metadata_file, "Metadata file").await?;
        info!("Extracting text from {} documents", papers.len());

        let mut documents = Vec::with_capacity(papers.len());
        for paper in &papers {
            let Some(path) = paper.file_path.clone() else {
                warn!("'{}' has no file path, skipping", paper.title);
                continue;
            };
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                warn!("Document {:?} is missing, skipping", path);
                continue;
            }

            if let Some(text) = load_off_runtime(&path, load_text).await {
                documents.push(ExtractedDocument::from_text(paper, &text));
            }
        }

        let output_file = self.config.output.extracted_file();
        storage::write_json(&output_file, &documents).await?;
        info!("Extracted {} documents into {:?}", documents.len(), output_file);

        Ok(ExtractResult {
            extracted_papers: documents.len(),
            output_file,
            papers: documents,
        })
    }

    pub async fn run(&self, input: ExtractInput) -> serde_json::Value {
        match self.extract(input).await {
            Ok(result) => {
                serde_json::to_value(result).unwrap_or_else(|e| Error::from(e).to_payload())
            }
            Err(e) => e.report("Extraction"),
        }
    }
}

/// Run `loader` on the blocking pool; a failed or panicked load yields `None`
async fn load_off_runtime(path: &Path, loader: fn(&Path) -> Result<String>) -> Option<String> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || loader(&owned)).await {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            warn!("Could not read {:?}: {}", path, e);
            None
        }
        Err(e) => {
            warn!("Text loader for {:?} aborted: {}", path, e);
            None
        }
    }
}
