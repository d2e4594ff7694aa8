pub mod endings;
pub mod file;
pub mod line;
