use super::providers::ProviderError;
use crate::config::OpenAlexConfig;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// Cursor value that starts a fresh pagination
const INITIAL_CURSOR: &str = "*";

/// Topic query with optional publication year bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub topic: String,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
}

impl SearchRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            from_year: None,
            to_year: None,
        }
    }

    #[must_use]
    pub const fn with_years(mut self, from_year: Option<i32>, to_year: Option<i32>) -> Self {
        self.from_year = from_year;
        self.to_year = to_year;
        self
    }

    /// Comma-joined filter clauses: open access only, then the year range
    pub fn filter(&self) -> String {
        let mut clauses = vec!["is_oa:true".to_string()];
        if let Some(from) = self.from_year {
            clauses.push(format!("from_publication_date:{from}-01-01"));
        }
        if let Some(to) = self.to_year {
            clauses.push(format!("to_publication_date:{to}-12-31"));
        }
        clauses.join(",")
    }
}

/// Candidate document locations embedded in an index record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedLocations {
    pub best_oa: Option<String>,
    pub primary: Option<String>,
    pub others: Vec<String>,
}

impl EmbeddedLocations {
    /// First document URL in priority order: best OA, primary, then the rest
    pub fn first_document_url(&self) -> Option<&str> {
        self.best_oa
            .as_deref()
            .or(self.primary.as_deref())
            .or_else(|| self.others.first().map(String::as_str))
    }
}

/// One work drawn from the scholarly index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub doi: Option<String>,
    pub title: String,
    pub year: Option<u32>,
    pub authors: Vec<Option<String>>,
    pub locations: EmbeddedLocations,
    pub abstract_index: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    meta: Option<RawMeta>,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWork {
    title: Option<String>,
    publication_year: Option<u32>,
    doi: Option<String>,
    authorships: Option<Vec<RawAuthorship>>,
    best_oa_location: Option<RawLocation>,
    primary_location: Option<RawLocation>,
    locations: Option<Vec<serde_json::Value>>,
    abstract_inverted_index: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawAuthorship {
    author: Option<RawAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    pdf_url: Option<String>,
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

impl From<RawWork> for SearchRecord {
    fn from(work: RawWork) -> Self {
        let others = work
            .locations
            .unwrap_or_default()
            .into_iter()
            .filter_map(|loc| {
                loc.get("pdf_url")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
            .filter(|u| !u.trim().is_empty())
            .collect();

        Self {
            doi: work.doi,
            title: work
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "untitled".to_string()),
            year: work.publication_year,
            authors: work
                .authorships
                .unwrap_or_default()
                .into_iter()
                .map(|a| a.author.and_then(|author| author.display_name))
                .collect(),
            locations: EmbeddedLocations {
                best_oa: non_empty(work.best_oa_location.and_then(|l| l.pdf_url)),
                primary: non_empty(work.primary_location.and_then(|l| l.pdf_url)),
                others,
            },
            abstract_index: work.abstract_inverted_index,
        }
    }
}

/// One decoded page of results
#[derive(Debug, Default)]
pub struct Page {
    pub records: Vec<SearchRecord>,
    pub next_cursor: Option<String>,
}

/// Cursor-paginated reader over the OpenAlex works endpoint
pub struct OpenAlexPaginator {
    client: Client,
    config: OpenAlexConfig,
}

impl OpenAlexPaginator {
    pub const fn new(client: Client, config: OpenAlexConfig) -> Self {
        Self { client, config }
    }

    /// Fetch a single page at `cursor`
    pub async fn fetch_page(
        &self,
        request: &SearchRequest,
        cursor: &str,
    ) -> Result<Page, ProviderError> {
        let filter = request.filter();
        let per_page = self.config.page_size.to_string();
        debug!("OpenAlex page request: cursor={} filter={}", cursor, filter);

        let sent = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("search", request.topic.as_str()),
                ("filter", filter.as_str()),
                ("per_page", per_page.as_str()),
                ("cursor", cursor),
                ("mailto", self.config.mailto.as_str()),
            ])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await;

        tokio::time::sleep(self.config.page_delay()).await;

        let response = sent.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let raw: RawPage = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("OpenAlex page: {e}")))?;

        let records = raw
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawWork>(value) {
                Ok(work) => Some(SearchRecord::from(work)),
                Err(e) => {
                    debug!("Skipping undecodable OpenAlex record: {}", e);
                    None
                }
            })
            .collect();

        Ok(Page {
            records,
            next_cursor: raw
                .meta
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty()),
        })
    }

    /// Lazily stream every record for `request`, page by page.
    ///
    /// Ends on an empty page, a missing next cursor or a failed request.
    /// Failures are logged, never retried. Each call starts from the first page.
    pub fn stream(&self, request: SearchRequest) -> impl Stream<Item = SearchRecord> + '_ {
        info!("Searching OpenAlex for: '{}'", request.topic);

        stream::unfold(
            (Some(INITIAL_CURSOR.to_string()), request),
            move |(cursor, request)| async move {
                let cursor = cursor?;
                match self.fetch_page(&request, &cursor).await {
                    Ok(page) if page.records.is_empty() => {
                        debug!("OpenAlex returned an empty page, stopping");
                        None
                    }
                    Ok(page) => {
                        debug!("OpenAlex page yielded {} records", page.records.len());
                        Some((page.records, (page.next_cursor, request)))
                    }
                    Err(e) => {
                        error!("OpenAlex request failed: {}", e);
                        None
                    }
                }
            },
        )
        .flat_map(stream::iter)
    }
}

impl std::fmt::Debug for OpenAlexPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexPaginator")
            .field("base_url", &self.config.base_url)
            .field("page_size", &self.config.page_size)
            .finish_non_exhaustive()
    }
}
