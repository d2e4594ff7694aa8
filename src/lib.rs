// srcfmt - batch source normalizer
// Re-export public modules and types

pub mod backup;
pub mod cli;
pub mod config;
pub mod formatters;
pub mod models;
pub mod processing;
pub mod processor;
pub mod utils;

// Re-export main types for convenience
pub use backup::{BackupGuard, BackupStore};
pub use config::{Config, ResolvedConfig};
pub use formatters::{FormatterRegistry, FormatterSpec};
pub use models::line_segment::LineSegment;
pub use models::options::{ProcessOptions, TextPasses};
pub use processing::endings::normalize_line_endings;
pub use processing::file::normalize_content;
pub use processing::line::normalize_line;
pub use processor::{OutputWriter, ProcessedFile, Processor};
