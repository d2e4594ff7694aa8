use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::formatters::registry::{FormatterRegistry, is_builtin, normalize_extension};
use crate::utils::path::expand_tilde;

/// File names searched for when discovering project configuration
pub const CONFIG_FILE_NAMES: [&str; 2] = [".srcfmt.toml", "srcfmt.toml"];

/// Fallback backup directory when no platform data directory exists
pub const LOCAL_BACKUP_DIR: &str = ".srcfmt-backups";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Settings that apply to the whole run
    #[serde(default)]
    pub global: GlobalConfig,

    /// Comment-style conversion settings
    #[serde(default)]
    pub comments: CommentsConfig,

    /// Formatter definitions and overrides of the built-in ones, by name
    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,
}

/// Global configuration settings. Unset values fall back to defaults after
/// all configuration layers are merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GlobalConfig {
    /// Directory holding timestamped backup sessions
    pub backup_dir: Option<PathBuf>,

    /// Whether to keep backups of changed files
    pub keep_backups: Option<bool>,

    /// Whether to convert DOS line endings
    pub convert_line_endings: Option<bool>,

    /// Whether to respect .gitignore files
    pub respect_gitignore: Option<bool>,

    /// Worker threads (0 = one per CPU)
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommentsConfig {
    /// Whether to rewrite `//` comments as block comments
    pub enabled: Option<bool>,

    /// Extensions the rewrite applies to
    pub extensions: Option<Vec<String>>,
}

/// One `[formatters.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FormatterConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

/// Configuration with every default filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backup_dir: PathBuf,
    pub keep_backups: bool,
    pub convert_line_endings: bool,
    pub respect_gitignore: bool,
    pub threads: usize,
    pub convert_comments: bool,
    pub comment_extensions: Vec<String>,
    pub formatters: FormatterRegistry,
}

fn default_comment_extensions() -> Vec<String> {
    vec!["c".to_string(), "h".to_string()]
}

/// `<data dir>/srcfmt/backups`, or a directory in the working tree
pub fn default_backup_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("srcfmt").join("backups"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_BACKUP_DIR))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, formatter) in &self.formatters {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Formatter with empty name"));
            }

            if let Some(extensions) = &formatter.extensions {
                if extensions.iter().any(|e| normalize_extension(e).is_empty()) {
                    return Err(anyhow::anyhow!(
                        "Formatter '{}' has an empty file extension",
                        name
                    ));
                }
            }

            if formatter.enabled == Some(false) || is_builtin(name) {
                continue;
            }

            if formatter.command.as_deref().is_none_or(|c| c.trim().is_empty()) {
                return Err(anyhow::anyhow!("Formatter '{}' has no command", name));
            }

            if formatter.extensions.as_ref().is_none_or(|e| e.is_empty()) {
                return Err(anyhow::anyhow!(
                    "Formatter '{}' has no file extensions",
                    name
                ));
            }
        }

        if let Some(extensions) = &self.comments.extensions {
            if extensions.iter().any(|e| normalize_extension(e).is_empty()) {
                return Err(anyhow::anyhow!("Comment extensions contain an empty entry"));
            }
        }

        Ok(())
    }

    /// Merge this config with another, giving precedence to the other config
    pub fn merge_with(&self, other: &Config) -> Config {
        let mut merged = self.clone();

        let global = &other.global;
        if global.backup_dir.is_some() {
            merged.global.backup_dir = global.backup_dir.clone();
        }
        merged.global.keep_backups = global.keep_backups.or(merged.global.keep_backups);
        merged.global.convert_line_endings = global
            .convert_line_endings
            .or(merged.global.convert_line_endings);
        merged.global.respect_gitignore =
            global.respect_gitignore.or(merged.global.respect_gitignore);
        merged.global.threads = global.threads.or(merged.global.threads);

        merged.comments.enabled = other.comments.enabled.or(merged.comments.enabled);
        if other.comments.extensions.is_some() {
            merged.comments.extensions = other.comments.extensions.clone();
        }

        // Formatter tables merge field by field
        for (name, formatter) in &other.formatters {
            let entry = merged.formatters.entry(name.clone()).or_default();
            if formatter.command.is_some() {
                entry.command = formatter.command.clone();
            }
            if formatter.args.is_some() {
                entry.args = formatter.args.clone();
            }
            if formatter.extensions.is_some() {
                entry.extensions = formatter.extensions.clone();
            }
            entry.enabled = formatter.enabled.or(entry.enabled);
        }

        merged
    }

    /// Fill in defaults and build the formatter registry
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let formatters = FormatterRegistry::from_config(&self.formatters)?;

        let threads = match self.global.threads.unwrap_or(0) {
            0 => num_cpus::get(),
            n => n,
        };

        let comment_extensions = self
            .comments
            .extensions
            .clone()
            .unwrap_or_else(default_comment_extensions)
            .iter()
            .map(|e| normalize_extension(e))
            .collect();

        Ok(ResolvedConfig {
            backup_dir: self
                .global
                .backup_dir
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_else(default_backup_dir),
            keep_backups: self.global.keep_backups.unwrap_or(true),
            convert_line_endings: self.global.convert_line_endings.unwrap_or(true),
            respect_gitignore: self.global.respect_gitignore.unwrap_or(true),
            threads,
            convert_comments: self.comments.enabled.unwrap_or(true),
            comment_extensions,
            formatters,
        })
    }

    /// Get the global configuration file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("srcfmt").join("config.toml"))
    }

    /// Nearest project configuration at or above `start_dir`
    pub fn find_project_config(start_dir: &Path) -> Option<PathBuf> {
        start_dir.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Load the effective configuration.
    ///
    /// An explicit file replaces discovery. Otherwise the global config is
    /// layered under the nearest project config; unreadable discovered files
    /// are reported and skipped.
    pub fn load(explicit: Option<&Path>, start_dir: &Path) -> Result<Config> {
        if let Some(path) = explicit {
            return Config::from_file(path);
        }

        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path().filter(|p| p.is_file()) {
            match Config::from_file(&global_path) {
                Ok(global) => config = config.merge_with(&global),
                Err(e) => eprintln!("Warning: Failed to load global config: {e:#}"),
            }
        }

        if let Some(project_path) = Self::find_project_config(start_dir) {
            log::debug!("using config {}", project_path.display());
            match Config::from_file(&project_path) {
                Ok(project) => config = config.merge_with(&project),
                Err(e) => eprintln!(
                    "Warning: Failed to load config file {}: {e:#}",
                    project_path.display()
                ),
            }
        }

        Ok(config)
    }

    /// Create a template configuration
    pub fn template() -> String {
        r#"# srcfmt configuration
# Place as .srcfmt.toml in a project root or at ~/.config/srcfmt/config.toml

[global]
# backup_dir = "~/.local/share/srcfmt/backups"  # Where timestamped backups go
keep_backups = true           # Keep a copy of every file that changes
convert_line_endings = true   # Convert CRLF to LF
respect_gitignore = true      # Skip files ignored by git
threads = 0                   # Worker threads, 0 = one per CPU

[comments]
enabled = true                # Rewrite // comments as /* */
extensions = ["c", "h"]

# Built-in formatters: clang-format, rustfmt, gofmt, black, shfmt.
# Override any field by name, or switch one off:
#
# [formatters.black]
# enabled = false

[formatters.clang-format]
extensions = ["c", "h", "cc", "cpp", "cxx", "hpp", "hh", "hxx"]
command = "clang-format"
args = ["-i", "{file}"]

# A new formatter needs a command and extensions. "{file}" is replaced with
# the file path; without it the path is appended.
#
# [formatters.astyle]
# command = "astyle"
# args = ["--suffix=none", "--quiet"]
# extensions = ["java"]
"#
        .to_string()
    }
}
