pub mod line_segment;
pub mod options;
