use super::storage;
use crate::synthesis::{synthesize, Synthesis};
use crate::text::ExtractedDocument;
use crate::{Config, Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Input parameters for the analysis tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeInput {
    /// Extraction output written by the extraction tool
    pub extracted_content_file: PathBuf,
}

/// Builds the cross-document synthesis
#[derive(Debug, Clone)]
pub struct AnalyzeTool {
    config: Arc<Config>,
}

impl AnalyzeTool {
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    #[instrument(skip(self), fields(input = ?input.extracted_content_file))]
    pub async fn analyze(&self, input: AnalyzeInput) -> Result<Synthesis> {
        let documents: Vec<ExtractedDocument> =
            storage::read_json(&input.extracted_content_file, "Extracted content file").await?;

        let synthesis = synthesize(&documents);
        let output_file = self.config.output.synthesis_file();
        storage::write_json(&output_file, &synthesis).await?;
        info!(
            "Synthesized {} documents into {} themes ({:?})",
            synthesis.total_papers,
            synthesis.themes.len(),
            output_file
        );
        Ok(synthesis)
    }

    pub async fn run(&self, input: AnalyzeInput) -> serde_json::Value {
        match self.analyze(input).await {
            Ok(synthesis) => {
                serde_json::to_value(synthesis).unwrap_or_else(|e| Error::from(e).to_payload())
            }
            Err(e) => e.report("Analysis"),
        }
    }
}
