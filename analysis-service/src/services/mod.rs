//! Services module for analysis-service.

pub mod analysis;
pub mod analyzer;
pub mod metrics;
pub mod parser;
pub mod upload;

pub use analysis::{AnalysisError, AnalysisService};
pub use analyzer::{AnalyzerError, TransactionAnalyzer};
pub use metrics::{get_metrics, init_metrics, record_analyzer_request, record_csv_upload};
pub use upload::UploadService;
