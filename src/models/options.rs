/// Run-wide switches for the per-file pipeline
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    /// Report what would change without touching files or running formatters
    pub dry_run: bool,
    /// Convert DOS line endings to Unix ones
    pub convert_line_endings: bool,
    /// Rewrite `//` comments as block comments (for configured extensions)
    pub convert_comments: bool,
    /// Invoke the external formatter registered for the file's extension
    pub run_formatters: bool,
    /// Keep a timestamped copy of every file that changes
    pub keep_backups: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            convert_line_endings: true,
            convert_comments: true,
            run_formatters: true,
            keep_backups: true,
        }
    }
}

/// Text passes applied to one file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPasses {
    pub line_endings: bool,
    pub comments: bool,
}

impl TextPasses {
    pub fn any(&self) -> bool {
        self.line_endings || self.comments
    }
}
