//! Text signals mined from acquired documents.
//!
//! Everything here is heuristic text mining, not document parsing: section
//! windows overlap and keywords are raw frequency counts.

pub mod keywords;
pub mod loader;
pub mod segmenter;

pub use keywords::{extract_keywords, rank_by_frequency};
pub use loader::load_text;
pub use segmenter::{segment, SectionLabel, Sections};

use crate::client::{lenient_year, null_as_default, PaperMetadata};
use serde::{Deserialize, Serialize};

/// Signals extracted from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<u32>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Option<String>>,
    /// Length of the full extracted text, in characters
    #[serde(default)]
    pub full_text_length: usize,
    #[serde(flatten)]
    pub sections: Sections,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExtractedDocument {
    /// Segment and keyword `full_text`, carrying over the bibliographic fields
    pub fn from_text(metadata: &PaperMetadata, full_text: &str) -> Self {
        Self {
            title: Some(metadata.title.clone()).filter(|t| !t.trim().is_empty()),
            year: metadata.year,
            doi: metadata.doi.clone(),
            authors: metadata.authors.clone(),
            full_text_length: full_text.chars().count(),
            sections: segment(full_text).capped(),
            keywords: extract_keywords(full_text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        let metadata = PaperMetadata {
            title: "Healthcare Analytics".to_string(),
            year: Some(2024),
            doi: Some("10.1000/h".to_string()),
            file_path: None,
            authors: vec![Some("Grace Hopper".to_string())],
            abstract_index: None,
        };
        let text = "Abstract healthcare analytics. Methods: healthcare records. \
                    Conclusion: analytics matter.";
        let doc = ExtractedDocument::from_text(&metadata, text);

        assert_eq!(doc.title.as_deref(), Some("Healthcare Analytics"));
        assert_eq!(doc.full_text_length, text.chars().count());
        assert!(doc.sections.methodology.starts_with("Methods"));
        assert_eq!(doc.keywords[0], "healthcare");
        assert!(doc.keywords.contains(&"analytics".to_string()));

        let untitled = PaperMetadata {
            title: String::new(),
            ..metadata
        };
        assert_eq!(ExtractedDocument::from_text(&untitled, text).title, None);
    }

    #[test]
    fn test_serialized_field_names() {
        let doc = ExtractedDocument {
            title: Some("T".to_string()),
            year: None,
            doi: None,
            authors: Vec::new(),
            full_text_length: 3,
            sections: Sections {
                abstract_text: "abs".to_string(),
                ..Sections::default()
            },
            keywords: Vec::new(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["abstract"], "abs");
        assert_eq!(value["methodology"], "");
        assert_eq!(value["full_text_length"], 3);
    }
}
