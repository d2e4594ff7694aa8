pub mod registry;
pub mod runner;

pub use registry::{FormatterRegistry, FormatterSpec};
pub use runner::{locate, run_formatter};
