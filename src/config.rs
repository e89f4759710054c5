//! # Configuration
//!
//! Layered configuration for the pipeline: compiled-in defaults, an optional
//! TOML file, then `LITREVIEW__SECTION__KEY` environment variables. The legacy
//! `OPENALEX_MAILTO` and `UNPAYWALL_EMAIL` variables override the contact
//! addresses last.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "LITREVIEW";
const DEFAULT_CONTACT: &str = "research@example.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openalex: OpenAlexConfig,
    pub unpaywall: UnpaywallConfig,
    pub fallback: FallbackConfig,
    pub downloads: DownloadConfig,
    pub output: OutputConfig,
    pub acquisition: AcquisitionConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Scholarly metadata index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Contact address sent as `mailto` for the polite pool
    pub mailto: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    /// Fixed delay after every page request
    pub page_delay_ms: u64,
}

impl OpenAlexConfig {
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org/works".to_string(),
            mailto: DEFAULT_CONTACT.to_string(),
            page_size: 25,
            timeout_secs: 20,
            page_delay_ms: 500,
        }
    }
}

/// Open-access resolution API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpaywallConfig {
    pub base_url: String,
    pub email: String,
    pub timeout_secs: u64,
    pub request_delay_ms: u64,
}

impl Default for UnpaywallConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.unpaywall.org/v2".to_string(),
            email: DEFAULT_CONTACT.to_string(),
            timeout_secs: 20,
            request_delay_ms: 400,
        }
    }
}

/// Restricted-access fallback utility, invoked as a subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub command: String,
    pub timeout_secs: u64,
    /// Pause after the process exits before scanning its output directory
    pub settle_delay_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "scidownl".to_string(),
            timeout_secs: 90,
            settle_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root under which per-topic directories are created
    pub directory: PathBuf,
    pub timeout_secs: u64,
    pub chunk_size: usize,
    /// Pacing delay after every successful download
    pub success_delay_ms: u64,
    pub max_filename_len: usize,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("papers"),
            timeout_secs: 60,
            chunk_size: 64 * 1024,
            success_delay_ms: 800,
            max_filename_len: 80,
            user_agent: "PaperFetcher/1.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("outputs"),
        }
    }
}

impl OutputConfig {
    pub fn metadata_file(&self) -> PathBuf {
        self.directory.join("paper_metadata.json")
    }

    pub fn extracted_file(&self) -> PathBuf {
        self.directory.join("extracted_content.json")
    }

    pub fn synthesis_file(&self) -> PathBuf {
        self.directory.join("synthesis.json")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub target_count: usize,
    /// Rewrite the metadata file after every successful download
    pub checkpoint_metadata: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            target_count: 5,
            checkpoint_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            graceful_shutdown_timeout_secs: 5,
        }
    }
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub downloads_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub log_level: Option<String>,
    pub disable_fallback: bool,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration file {:?}", path);
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_legacy_env(&mut self) {
        if let Ok(mailto) = std::env::var("OPENALEX_MAILTO") {
            if !mailto.trim().is_empty() {
                self.openalex.mailto = mailto;
            }
        }
        if let Ok(email) = std::env::var("UNPAYWALL_EMAIL") {
            if !email.trim().is_empty() {
                self.unpaywall.email = email;
            }
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.downloads_directory {
            self.downloads.directory.clone_from(dir);
        }
        if let Some(dir) = &overrides.output_directory {
            self.output.directory.clone_from(dir);
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if overrides.disable_fallback {
            self.fallback.enabled = false;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool); 10] = [
            ("openalex.page_size", self.openalex.page_size == 0),
            ("openalex.timeout_secs", self.openalex.timeout_secs == 0),
            ("openalex.mailto", self.openalex.mailto.trim().is_empty()),
            ("unpaywall.timeout_secs", self.unpaywall.timeout_secs == 0),
            ("unpaywall.email", self.unpaywall.email.trim().is_empty()),
            ("fallback.timeout_secs", self.fallback.timeout_secs == 0),
            ("fallback.command", self.fallback.command.trim().is_empty()),
            ("downloads.timeout_secs", self.downloads.timeout_secs == 0),
            ("downloads.chunk_size", self.downloads.chunk_size == 0),
            ("downloads.max_filename_len", self.downloads.max_filename_len == 0),
        ];

        if let Some((field, _)) = checks.iter().find(|(_, invalid)| *invalid) {
            return Err(Error::InvalidInput {
                field: (*field).to_string(),
                reason: "must be non-zero / non-empty".to_string(),
            });
        }
        Ok(())
    }

    pub const fn success_delay(&self) -> Duration {
        Duration::from_millis(self.downloads.success_delay_ms)
    }
}
