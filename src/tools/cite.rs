use super::storage;
use crate::client::{normalize_doi, PaperMetadata};
use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument};

const UNKNOWN_AUTHOR: &str = "Unknown";
const UNTITLED: &str = "Untitled";
const NO_DATE: &str = "n.d.";
/// Authors listed by name in APA and IEEE citations
const CITED_AUTHORS: usize = 3;

fn default_style() -> String {
    "APA".to_string()
}

/// Input parameters for the citation tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CiteInput {
    /// Metadata file written by the acquisition tool
    pub metadata_file: PathBuf,
    /// Citation style: APA, IEEE or MLA
    #[serde(default = "default_style")]
    pub style: String,
    /// Also return each paper's abstract, rebuilt from the index payload
    #[serde(default)]
    pub include_abstract: bool,
}

/// Citation style; anything unrecognised formats as MLA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Apa,
    Ieee,
    Mla,
}

impl CitationStyle {
    pub fn parse(style: &str) -> Self {
        match style.trim().to_ascii_uppercase().as_str() {
            "APA" => Self::Apa,
            "IEEE" => Self::Ieee,
            _ => Self::Mla,
        }
    }

    pub fn format(self, paper: &PaperMetadata) -> String {
        match self {
            Self::Apa => format_apa(paper),
            Self::Ieee => format_ieee(paper),
            Self::Mla => format_mla(paper),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiteResult {
    /// Style as requested
    pub style: String,
    pub citation_count: usize,
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstracts: Option<Vec<Option<String>>>,
}

fn title(paper: &PaperMetadata) -> &str {
    let title = paper.title.trim();
    if title.is_empty() {
        UNTITLED
    } else {
        title
    }
}

fn year(paper: &PaperMetadata) -> String {
    paper
        .year
        .map_or_else(|| NO_DATE.to_string(), |y| y.to_string())
}

/// Every listed author, with blanks shown as `Unknown`
fn authors(paper: &PaperMetadata) -> Vec<&str> {
    if paper.authors.is_empty() {
        return vec![UNKNOWN_AUTHOR];
    }
    paper
        .authors
        .iter()
        .map(|a| {
            a.as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(UNKNOWN_AUTHOR)
        })
        .collect()
}

fn format_apa(paper: &PaperMetadata) -> String {
    let authors = authors(paper);
    let mut author_str = authors
        .iter()
        .take(CITED_AUTHORS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > CITED_AUTHORS {
        author_str.push_str(", et al.");
    }

    let mut citation = format!("{author_str} ({}). {}.", year(paper), title(paper));
    if let Some(doi) = normalize_doi(paper.doi.as_deref()) {
        citation.push_str(&format!(" https://doi.org/{doi}"));
    }
    citation
}

fn format_ieee(paper: &PaperMetadata) -> String {
    let surnames = authors(paper)
        .into_iter()
        .take(CITED_AUTHORS)
        .map(|a| a.split_whitespace().last().unwrap_or(UNKNOWN_AUTHOR))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{surnames}, \"{},\" {}.", title(paper), year(paper))
}

fn format_mla(paper: &PaperMetadata) -> String {
    let first = authors(paper)
        .first()
        .copied()
        .unwrap_or(UNKNOWN_AUTHOR);
    format!("{first}. \"{}.\" {}.", title(paper), year(paper))
}

/// Formats citations for every paper in a metadata file
#[derive(Debug, Clone, Default)]
pub struct CiteTool;

impl CiteTool {
    pub const fn new() -> Self {
        Self
    }

    #[instrument(skip(self), fields(style = %input.style))]
    pub async fn cite(&self, input: CiteInput) -> Result<CiteResult> {
        let papers: Vec<PaperMetadata> =
            storage::read_json(&input.metadata_file, "Metadata file").await?;
        let style = CitationStyle::parse(&input.style);
        info!("Formatting {} citations as {:?}", papers.len(), style);

        let citations: Vec<String> = papers.iter().map(|p| style.format(p)).collect();
        let abstracts = input
            .include_abstract
            .then(|| papers.iter().map(PaperMetadata::abstract_text).collect());

        Ok(CiteResult {
            style: input.style,
            citation_count: citations.len(),
            citations,
            abstracts,
        })
    }

    pub async fn run(&self, input: CiteInput) -> serde_json::Value {
        match self.cite(input).await {
            Ok(result) => {
                serde_json::to_value(result).unwrap_or_else(|e| Error::from(e).to_payload())
            }
            Err(e) => e.report("Citation formatting"),
        }
    }
}
