//! Tool boundaries of the pipeline.
//!
//! Each tool reads its input from disk, writes one JSON artifact under the
//! output directory, and reports failures as an `{"error": ..}` payload
//! through its `run` method.

pub mod acquire;
pub mod analyze;
pub mod cite;
pub mod extract;
pub mod storage;

pub use acquire::{AcquireInput, AcquireResult, AcquireTool};
pub use analyze::{AnalyzeInput, AnalyzeTool};
pub use cite::{CitationStyle, CiteInput, CiteResult, CiteTool};
pub use extract::{ExtractInput, ExtractResult, ExtractTool};
