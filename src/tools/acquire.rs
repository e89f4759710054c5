use super::storage;
use crate::client::providers::{
    Candidate, DocumentResolver, EmbeddedLocationResolver, Provenance, RestrictedAccessResolver,
    UnpaywallResolver,
};
use crate::client::{
    document_path, sanitize_filename, Downloader, HttpClientConfig, OpenAlexPaginator,
    PaperMetadata, SearchRecord, SearchRequest,
};
use crate::{Config, Error, Result};
use chrono::{Datelike, Utc};
use futures::{Stream, StreamExt};
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Input parameters for the acquisition tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AcquireInput {
    /// Research topic searched in the scholarly index
    pub topic: String,
    /// Number of documents to download (defaults to `acquisition.target_count`)
    #[serde(default)]
    pub target_count: Option<usize>,
    /// Earliest publication year, inclusive
    #[serde(default)]
    pub from_year: Option<i32>,
    /// Latest publication year, inclusive
    #[serde(default)]
    pub to_year: Option<i32>,
}

impl AcquireInput {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_count: None,
            from_year: None,
            to_year: None,
        }
    }

    /// Reject blank topics and year ranges no document can satisfy
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::InvalidInput {
                field: "topic".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if let (Some(from), Some(to)) = (self.from_year, self.to_year) {
            if from > to {
                return Err(Error::InvalidInput {
                    field: "from_year".to_string(),
                    reason: format!("{from} is after to_year {to}"),
                });
            }
        }

        let current_year = Utc::now().year();
        if let Some(from) = self.from_year.filter(|from| *from > current_year) {
            return Err(Error::InvalidInput {
                field: "from_year".to_string(),
                reason: format!("{from} is in the future"),
            });
        }
        Ok(())
    }
}

/// Outcome of one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireResult {
    pub downloaded_count: usize,
    pub papers_directory: PathBuf,
    pub metadata_file: PathBuf,
    pub papers: Vec<PaperMetadata>,
}

/// Drives the resolver chain over the index search results
pub struct AcquireTool {
    config: Arc<Config>,
    client: Client,
    resolvers: Vec<Arc<dyn DocumentResolver>>,
}

impl std::fmt::Debug for AcquireTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireTool")
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl AcquireTool {
    /// Build the run-scoped HTTP client and the default resolver chain
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = HttpClientConfig::from_config(&config).build()?;
        let resolvers = Self::default_resolvers(&config, &client);
        Ok(Self::with_resolvers(config, client, resolvers))
    }

    pub fn with_resolvers(
        config: Arc<Config>,
        client: Client,
        resolvers: Vec<Arc<dyn DocumentResolver>>,
    ) -> Self {
        Self {
            config,
            client,
            resolvers,
        }
    }

    /// Embedded location, then the open-access API, then the subprocess fallback
    pub fn default_resolvers(config: &Config, client: &Client) -> Vec<Arc<dyn DocumentResolver>> {
        let downloader = Downloader::new(
            client.clone(),
            config.downloads.chunk_size,
            Duration::from_secs(config.downloads.timeout_secs),
        );
        let mut resolvers: Vec<Arc<dyn DocumentResolver>> = vec![
            Arc::new(EmbeddedLocationResolver::new(downloader.clone())),
            Arc::new(UnpaywallResolver::new(
                client.clone(),
                config.unpaywall.clone(),
                downloader,
            )),
        ];
        if config.fallback.enabled {
            resolvers.push(Arc::new(RestrictedAccessResolver::new(
                config.fallback.clone(),
            )));
        }
        resolvers
    }

    /// Search the index for `input.topic` and download up to the target count
    #[instrument(skip(self), fields(topic = %input.topic, run_id = %Uuid::new_v4()))]
    pub async fn acquire(&self, input: AcquireInput) -> Result<AcquireResult> {
        input.validate()?;
        let topic = input.topic.trim();

        let target_count = input
            .target_count
            .unwrap_or(self.config.acquisition.target_count);
        let papers_directory = self.config.downloads.directory.join(sanitize_filename(
            topic,
            self.config.downloads.max_filename_len,
        ));

        let paginator = OpenAlexPaginator::new(self.client.clone(), self.config.openalex.clone());
        let request = SearchRequest::new(topic).with_years(input.from_year, input.to_year);

        self.acquire_from(paginator.stream(request), &papers_directory, target_count)
            .await
    }

    /// Run the resolver chain over `records` in discovery order.
    ///
    /// Stops drawing records once `target_count` documents are on disk.
    pub async fn acquire_from<S>(
        &self,
        records: S,
        papers_directory: &Path,
        target_count: usize,
    ) -> Result<AcquireResult>
    where
        S: Stream<Item = SearchRecord>,
    {
        tokio::fs::create_dir_all(papers_directory).await?;
        let metadata_file = self.config.output.metadata_file();
        let max_len = self.config.downloads.max_filename_len;

        let mut records = std::pin::pin!(records);
        let mut papers: Vec<PaperMetadata> = Vec::new();
        let mut acquired_dois: HashSet<String> = HashSet::new();

        while papers.len() < target_count {
            let Some(record) = records.next().await else {
                debug!("Search results exhausted");
                break;
            };

            let target = document_path(papers_directory, record.year, &record.title, max_len);
            let candidate = Candidate::new(record, target);

            if let Some(doi) = &candidate.doi {
                if acquired_dois.contains(doi) {
                    debug!("Skipping duplicate DOI {}", doi);
                    continue;
                }
            }

            let Some(provenance) = self.acquire_one(&candidate).await else {
                warn!("No source could deliver '{}'", candidate.record.title);
                continue;
            };

            // a resolver can report success without leaving a file behind
            if !tokio::fs::try_exists(&candidate.target).await.unwrap_or(false) {
                warn!(
                    "{} reported success but {:?} is missing",
                    provenance, candidate.target
                );
                continue;
            }

            info!(
                "[{}/{}] Acquired '{}' via {}",
                papers.len() + 1,
                target_count,
                candidate.record.title,
                provenance
            );
            if let Some(doi) = candidate.doi {
                acquired_dois.insert(doi);
            }
            papers.push(PaperMetadata::acquired(candidate.record, candidate.target));

            if self.config.acquisition.checkpoint_metadata {
                storage::write_json(&metadata_file, &papers).await?;
            }
            tokio::time::sleep(self.config.success_delay()).await;
        }

        storage::write_json(&metadata_file, &papers).await?;
        info!(
            "Acquisition finished: {} documents, metadata in {:?}",
            papers.len(),
            metadata_file
        );

        Ok(AcquireResult {
            downloaded_count: papers.len(),
            papers_directory: papers_directory.to_path_buf(),
            metadata_file,
            papers,
        })
    }

    /// First resolver whose reference could be fetched to the candidate's target
    async fn acquire_one(&self, candidate: &Candidate) -> Option<Provenance> {
        for resolver in &self.resolvers {
            let Some(reference) = resolver.resolve(candidate).await else {
                continue;
            };
            if resolver.fetch(&reference, &candidate.target).await {
                return Some(resolver.provenance());
            }
        }
        None
    }

    /// Tool boundary: the result as JSON, or an `{"error": ..}` payload
    pub async fn run(&self, input: AcquireInput) -> serde_json::Value {
        match self.acquire(input).await {
            Ok(result) => {
                serde_json::to_value(result).unwrap_or_else(|e| Error::from(e).to_payload())
            }
            Err(e) => e.report("Acquisition"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::openalex::EmbeddedLocations;
    use crate::client::providers::{ProviderError, ResolvedReference};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Writes a stub document for every candidate it accepts
    struct StubResolver {
        accept: fn(&Candidate) -> bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DocumentResolver for StubResolver {
        fn name(&self) -> &str {
            "stub"
        }

        fn provenance(&self) -> Provenance {
            Provenance::EmbeddedLocation
        }

        async fn try_resolve(
            &self,
            candidate: &Candidate,
        ) -> std::result::Result<Option<ResolvedReference>, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(candidate.record.title.clone());
            Ok((self.accept)(candidate)
                .then(|| ResolvedReference::new("stub://doc", Provenance::EmbeddedLocation)))
        }

        async fn fetch(&self, _reference: &ResolvedReference, target: &Path) -> bool {
            tokio::fs::write(target, b"%PDF-1.4").await.is_ok()
        }
    }

    /// One link of a recorded chain: logs `<name>:<title>` for every attempt
    struct ChainStep {
        name: &'static str,
        provenance: Provenance,
        resolves: fn(&Candidate) -> bool,
        fetches: fn(&Candidate) -> bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DocumentResolver for ChainStep {
        fn name(&self) -> &str {
            self.name
        }

        fn provenance(&self) -> Provenance {
            self.provenance
        }

        async fn try_resolve(
            &self,
            candidate: &Candidate,
        ) -> std::result::Result<Option<ResolvedReference>, ProviderError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, candidate.record.title));
            if !(self.resolves)(candidate) {
                return Err(ProviderError::Status(404));
            }
            let url = if (self.fetches)(candidate) {
                "stub://ok"
            } else {
                "stub://broken"
            };
            Ok(Some(ResolvedReference::new(url, self.provenance)))
        }

        async fn fetch(&self, reference: &ResolvedReference, target: &Path) -> bool {
            reference.url == "stub://ok" && tokio::fs::write(target, b"%PDF-1.4").await.is_ok()
        }
    }

    type ChainSpec = (
        &'static str,
        Provenance,
        fn(&Candidate) -> bool,
        fn(&Candidate) -> bool,
    );

    fn chain_tool(
        dir: &Path,
        steps: [ChainSpec; 3],
    ) -> (AcquireTool, Arc<Mutex<Vec<String>>>) {
        let mut config = Config::default();
        config.output.directory = dir.join("outputs");
        config.downloads.success_delay_ms = 0;
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolvers = steps
            .into_iter()
            .map(|(name, provenance, resolves, fetches)| {
                Arc::new(ChainStep {
                    name,
                    provenance,
                    resolves,
                    fetches,
                    log: Arc::clone(&log),
                }) as Arc<dyn DocumentResolver>
            })
            .collect();
        let client = HttpClientConfig::default().build().unwrap();
        (
            AcquireTool::with_resolvers(Arc::new(config), client, resolvers),
            log,
        )
    }

    fn record(title: &str, doi: Option<&str>) -> SearchRecord {
        SearchRecord {
            doi: doi.map(str::to_string),
            title: title.to_string(),
            year: Some(2023),
            authors: vec![Some("Ada Lovelace".to_string())],
            locations: EmbeddedLocations::default(),
            abstract_index: None,
        }
    }

    fn tool(dir: &Path, accept: fn(&Candidate) -> bool) -> (AcquireTool, Arc<Mutex<Vec<String>>>) {
        let mut config = Config::default();
        config.output.directory = dir.join("outputs");
        config.downloads.success_delay_ms = 0;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = StubResolver {
            accept,
            calls: Arc::clone(&calls),
        };
        let client = HttpClientConfig::default().build().unwrap();
        (
            AcquireTool::with_resolvers(Arc::new(config), client, vec![Arc::new(resolver)]),
            calls,
        )
    }

    #[tokio::test]
    async fn test_stops_at_target_count() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, calls) = tool(dir.path(), |_| true);
        let records = futures::stream::iter(vec![
            record("First", None),
            record("Second", None),
            record("Third", None),
        ]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 2)
            .await
            .unwrap();

        assert_eq!(result.downloaded_count, 2);
        assert_eq!(*calls.lock().unwrap(), vec!["First", "Second"]);
        assert!(result.metadata_file.exists());
    }

    #[tokio::test]
    async fn test_failed_candidates_are_skipped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path(), |c| c.record.title != "Broken");
        let records = futures::stream::iter(vec![
            record("First", None),
            record("Broken", None),
            record("Third", None),
        ]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 5)
            .await
            .unwrap();

        let titles: Vec<_> = result.papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        for paper in &result.papers {
            assert!(paper.file_path.as_ref().unwrap().exists());
        }
    }

    #[tokio::test]
    async fn test_duplicate_doi_acquired_once() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path(), |_| true);
        let records = futures::stream::iter(vec![
            record("Original", Some("10.1/dup")),
            record("Reprint", Some("https://doi.org/10.1/dup")),
        ]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 5)
            .await
            .unwrap();
        assert_eq!(result.downloaded_count, 1);
    }

    #[tokio::test]
    async fn test_zero_target_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, calls) = tool(dir.path(), |_| true);
        let records = futures::stream::iter(vec![record("First", None)]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 0)
            .await
            .unwrap();
        assert_eq!(result.downloaded_count, 0);
        assert!(calls.lock().unwrap().is_empty());

        let written: Vec<PaperMetadata> =
            serde_json::from_slice(&std::fs::read(&result.metadata_file).unwrap()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_year_range_validation() {
        let mut input = AcquireInput::new("graphs");
        input.from_year = Some(2022);
        input.to_year = Some(2020);
        assert!(matches!(input.validate(), Err(Error::InvalidInput { .. })));

        input.to_year = Some(2024);
        assert!(input.validate().is_ok());

        input.from_year = Some(Utc::now().year() + 1);
        input.to_year = None;
        assert!(input.validate().is_err());
    }

    #[tokio::test]
    async fn test_blank_topic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _) = tool(dir.path(), |_| true);
        let payload = tool.run(AcquireInput::new("   ")).await;
        assert!(payload["error"].as_str().unwrap().contains("topic"));
    }

    #[tokio::test]
    async fn test_chain_tries_resolvers_in_order_per_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, log) = chain_tool(
            dir.path(),
            [
                // embedded link only works for "Linked"
                (
                    "embedded",
                    Provenance::EmbeddedLocation,
                    |c| c.record.title == "Linked",
                    |_| true,
                ),
                // API resolves "Stale" but its download fails; "Api" succeeds
                (
                    "api",
                    Provenance::OpenAccessApi,
                    |c| c.record.title != "Orphan",
                    |c| c.record.title == "Api",
                ),
                (
                    "fallback",
                    Provenance::RestrictedFallback,
                    |_| true,
                    |c| c.record.title != "Orphan",
                ),
            ],
        );
        let records = futures::stream::iter(vec![
            record("Linked", None),
            record("Api", None),
            record("Stale", None),
            record("Orphan", None),
            record("Surplus", None),
        ]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 3)
            .await
            .unwrap();

        let titles: Vec<_> = result.papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Linked", "Api", "Stale"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "embedded:Linked",
                "embedded:Api",
                "api:Api",
                "embedded:Stale",
                "api:Stale",
                "fallback:Stale",
            ]
        );
    }

    #[tokio::test]
    async fn test_candidate_failing_every_resolver_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, log) = chain_tool(
            dir.path(),
            [
                ("embedded", Provenance::EmbeddedLocation, |_| false, |_| true),
                ("api", Provenance::OpenAccessApi, |_| false, |_| true),
                (
                    "fallback",
                    Provenance::RestrictedFallback,
                    |c| c.record.title == "Rescued",
                    |_| true,
                ),
            ],
        );
        let records = futures::stream::iter(vec![record("Lost", None), record("Rescued", None)]);

        let result = tool
            .acquire_from(records, &dir.path().join("papers"), 5)
            .await
            .unwrap();

        assert_eq!(result.downloaded_count, 1);
        assert_eq!(result.papers[0].title, "Rescued");
        assert_eq!(log.lock().unwrap().len(), 6);
        assert!(!dir.path().join("papers").join("2023-Lost.pdf").exists());
    }
}
