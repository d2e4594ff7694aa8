use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::options::TextPasses;
use crate::processing::endings::normalize_line_endings;
use crate::processing::line::normalize_line;

/// Apply the enabled text passes to a whole file's content.
///
/// Lines are split on `\n` and rejoined with `\n`, so a trailing newline (or
/// its absence) survives unchanged. When line endings are left alone, a
/// line's `\r` is kept out of the normalizer and restored afterwards.
pub fn normalize_content(content: &str, passes: TextPasses) -> String {
    let content = if passes.line_endings {
        normalize_line_endings(content)
    } else {
        content.into()
    };

    if !passes.comments {
        return content.into_owned();
    }

    content
        .split('\n')
        .map(|line| match line.strip_suffix('\r') {
            Some(line) => normalize_line(line) + "\r",
            None => normalize_line(line),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read a file that must be valid UTF-8
pub fn read_source(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    String::from_utf8(bytes)
        .with_context(|| format!("File is not valid UTF-8: {}", path.display()))
}

/// Replace `path` with `content` through a temporary file in the same
/// directory, keeping the original permissions.
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let permissions = fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {}", path.display()))?
        .permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;
    fs::set_permissions(temp.path(), permissions)
        .with_context(|| format!("Failed to copy permissions to {}", path.display()))?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}
