pub mod downloader;
pub mod openalex;
pub mod providers;

pub use downloader::{document_path, sanitize_filename, Downloader};
pub use openalex::{OpenAlexPaginator, SearchRecord, SearchRequest};

use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP client configuration shared by the pipeline's providers.
///
/// The built client carries no whole-request deadline: index and API calls
/// set one per request, document bodies are bounded by `read_timeout`
/// between chunks instead.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Longest wait for response headers or the next body chunk
    pub read_timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(60),
            max_redirects: 10,
            user_agent: "PaperFetcher/1.1".to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn from_config(config: &crate::Config) -> Self {
        let timeout = Duration::from_secs(config.downloads.timeout_secs);
        Self {
            read_timeout: timeout,
            connect_timeout: timeout,
            user_agent: config.downloads.user_agent.clone(),
            ..Self::default()
        }
    }

    /// Build the run-scoped client handed to every resolver
    pub fn build(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .user_agent(&self.user_agent)
            .build()
            .map_err(crate::Error::Http)
    }
}

const DOI_PREFIXES: [&str; 3] = ["https://doi.org/", "http://doi.org/", "doi:"];

/// Strip resolver URL and scheme prefixes from a raw DOI.
///
/// Returns `None` for absent or blank input. Prefix matching is
/// case-insensitive; the remainder is returned as-is.
pub fn normalize_doi(raw: Option<&str>) -> Option<String> {
    let doi = raw?.trim();
    if doi.is_empty() {
        return None;
    }

    for prefix in DOI_PREFIXES {
        if doi.len() >= prefix.len()
            && doi.is_char_boundary(prefix.len())
            && doi[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            let rest = doi[prefix.len()..].trim();
            return if rest.is_empty() {
                None
            } else {
                Some(rest.to_string())
            };
        }
    }
    Some(doi.to_string())
}

/// Record of one successfully acquired document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<u32>,
    #[serde(default)]
    pub doi: Option<String>,
    /// Local path of the downloaded document
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// At most three display names
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Option<String>>,
    /// Raw `abstract_inverted_index` payload from the index
    #[serde(rename = "abstract", default)]
    pub abstract_index: Option<serde_json::Value>,
}

pub const MAX_AUTHORS: usize = 3;

impl PaperMetadata {
    /// Metadata for a record whose document now lives at `file_path`
    pub fn acquired(record: SearchRecord, file_path: PathBuf) -> Self {
        let mut authors = record.authors;
        authors.truncate(MAX_AUTHORS);
        Self {
            title: record.title,
            year: record.year,
            doi: record.doi,
            file_path: Some(file_path),
            authors,
            abstract_index: record.abstract_index,
        }
    }

    /// Reconstruct plain abstract text from the inverted index, ordered by position
    pub fn abstract_text(&self) -> Option<String> {
        let index = self.abstract_index.as_ref()?.as_object()?;
        let mut positioned: Vec<(u64, &str)> = index
            .iter()
            .flat_map(|(token, positions)| {
                positions
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(serde_json::Value::as_u64)
                    .map(move |pos| (pos, token.as_str()))
            })
            .collect();
        if positioned.is_empty() {
            return None;
        }
        positioned.sort_by_key(|(pos, _)| *pos);
        positioned.dedup_by_key(|(pos, _)| *pos);
        Some(
            positioned
                .into_iter()
                .map(|(_, token)| token)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    /// Authors with missing display names dropped
    pub fn author_names(&self) -> Vec<&str> {
        self.authors
            .iter()
            .filter_map(|a| a.as_deref())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Accept a year written as a number, a numeric string, `"Unknown"` or null
pub(crate) fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Number(u32),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<RawYear>::deserialize(deserializer)? {
        Some(RawYear::Number(year)) => Some(year),
        Some(RawYear::Text(text)) => leading_year(&text),
        Some(RawYear::Other(_)) | None => None,
    })
}

/// Leading digit run of a year string, so `"2024-05"` reads as 2024
fn leading_year(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text, |end| &text[..end]);
    if digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Treat an explicit JSON `null` like an absent field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
