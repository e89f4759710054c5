pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod synthesis;
pub mod text;
pub mod tools;

pub use client::{PaperMetadata, SearchRecord};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, ErrorCategory, Result};
pub use server::Server;
pub use synthesis::{synthesize, Synthesis};
pub use text::ExtractedDocument;
pub use tools::{AcquireTool, AnalyzeTool, CiteTool, ExtractTool};
