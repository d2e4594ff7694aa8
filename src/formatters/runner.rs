use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::registry::FormatterSpec;

/// Resolve a formatter's program on `PATH`
pub fn locate(spec: &FormatterSpec) -> Result<PathBuf> {
    which::which(&spec.command).with_context(|| {
        format!(
            "Formatter '{}' not found: '{}' is not on PATH",
            spec.name, spec.command
        )
    })
}

/// Run a formatter on `file` in place
pub fn run_formatter(spec: &FormatterSpec, file: &Path) -> Result<()> {
    let program = locate(spec).with_context(|| format!("Cannot format {}", file.display()))?;
    let args = spec.command_args(file);
    log::debug!("running {} {:?}", program.display(), args);

    let output = Command::new(&program)
        .args(&args)
        .output()
        .with_context(|| format!("Failed to start {} on {}", spec.name, file.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} failed on {} ({}): {}",
            spec.name,
            file.display(),
            output.status,
            stderr.trim()
        );
    }

    if !output.stderr.is_empty() {
        log::debug!(
            "{} stderr: {}",
            spec.name,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
