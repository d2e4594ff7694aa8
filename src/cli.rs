use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, ResolvedConfig};
use crate::formatters::registry::FormatterRegistry;
use crate::formatters::runner::locate;
use crate::models::options::ProcessOptions;
use crate::utils::path::{expand_paths, expand_tilde, has_glob_meta};

/// Command-line interface for srcfmt
#[derive(Parser, Debug)]
#[command(
    name = "srcfmt",
    version,
    about = "Normalize line endings and comment style, then run per-extension formatters.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub args: ProcessArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template configuration file
    Init {
        /// Where to write the template
        #[arg(short, long, default_value = ".srcfmt.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },

    /// List configured formatters and whether their programs are installed
    Tools {
        /// Use this configuration file instead of discovering one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// Files, directories or glob patterns to process
    #[arg(default_value = ".")]
    pub paths: Vec<String>,

    /// Show what would change without modifying files
    #[arg(short = 'n', long, default_value_t = false)]
    pub dry_run: bool,

    /// Exit with status 1 if any file changed (or would change)
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Print per-file details and debug logs
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable .gitignore file processing
    #[arg(long = "no-gitignore", default_value_t = false)]
    pub no_gitignore: bool,

    /// Do not keep backups of changed files
    #[arg(long = "no-backup", default_value_t = false)]
    pub no_backup: bool,

    /// Directory for timestamped backups
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Use this configuration file instead of discovering one
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Skip external formatters
    #[arg(long = "no-format", default_value_t = false)]
    pub no_format: bool,

    /// Skip the comment-style rewrite
    #[arg(long = "no-comments", default_value_t = false)]
    pub no_comments: bool,

    /// Skip line-ending conversion
    #[arg(long = "no-line-endings", default_value_t = false)]
    pub no_line_endings: bool,
}

impl ProcessArgs {
    /// Let command-line flags win over configuration
    pub fn apply_overrides(&self, config: &mut ResolvedConfig) {
        if let Some(dir) = &self.backup_dir {
            config.backup_dir = expand_tilde(dir);
        }
        if self.no_backup {
            config.keep_backups = false;
        }
        if self.no_gitignore {
            config.respect_gitignore = false;
        }
        if self.no_comments {
            config.convert_comments = false;
        }
        if self.no_line_endings {
            config.convert_line_endings = false;
        }
        match self.threads {
            Some(0) => config.threads = num_cpus::get(),
            Some(n) => config.threads = n,
            None => {}
        }
    }

    pub fn process_options(&self, config: &ResolvedConfig) -> ProcessOptions {
        ProcessOptions {
            dry_run: self.dry_run,
            convert_line_endings: config.convert_line_endings,
            convert_comments: config.convert_comments,
            run_formatters: !self.no_format,
            keep_backups: config.keep_backups,
        }
    }
}

/// Availability of one configured formatter
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: String,
    pub command: String,
    pub extensions: Vec<String>,
    pub location: Option<PathBuf>,
}

impl Cli {
    /// Write the template configuration to `output_path`
    pub fn handle_init_command(output_path: &Path, force: bool) -> Result<()> {
        if output_path.exists() && !force {
            return Err(anyhow::anyhow!(
                "Configuration file already exists: {}. Use --force to overwrite.",
                output_path.display()
            ));
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(output_path, Config::template()).with_context(|| {
            format!(
                "Failed to write configuration file: {}",
                output_path.display()
            )
        })?;

        println!("Created configuration file: {}", output_path.display());
        Ok(())
    }

    /// Resolve every configured formatter on PATH
    pub fn tool_statuses(registry: &FormatterRegistry) -> Vec<ToolStatus> {
        registry
            .iter()
            .map(|spec| ToolStatus {
                name: spec.name.clone(),
                command: spec.command.clone(),
                extensions: spec.extensions.clone(),
                location: locate(spec).ok(),
            })
            .collect()
    }

    pub fn handle_tools_command(config_path: Option<&Path>) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let config = Config::load(config_path, &cwd)?.resolve()?;

        for status in Self::tool_statuses(&config.formatters) {
            let location = match &status.location {
                Some(path) => path.display().to_string(),
                None => "not found".to_string(),
            };
            println!(
                "{:<14} {:<16} {:<28} {}",
                status.name,
                status.command,
                status.extensions.join(","),
                location
            );
        }
        Ok(())
    }
}

/// Collect files to process, respecting .gitignore rules unless disabled.
///
/// `.git` directories and anything under `skip_dirs` are never entered.
/// Each file is returned once, in discovery order, even when it is reached
/// through more than one spelling of its path.
pub fn collect_files(
    paths: &[String],
    respect_gitignore: bool,
    skip_dirs: &[PathBuf],
) -> Vec<PathBuf> {
    let skip: Vec<PathBuf> = skip_dirs
        .iter()
        .filter_map(|dir| dir.canonicalize().ok())
        .collect();

    let mut files = Vec::new();
    for pattern in paths {
        if has_glob_meta(pattern) {
            files.extend(expand_paths(std::slice::from_ref(pattern)));
            continue;
        }

        let path = PathBuf::from(pattern);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            walk_dir(&path, respect_gitignore, &skip, &mut files);
        } else {
            eprintln!("No such file or directory: {}", pattern);
        }
    }

    let mut seen = HashSet::new();
    files.retain(|file| seen.insert(file.canonicalize().unwrap_or_else(|_| file.clone())));
    files
}

fn walk_dir(dir: &Path, respect_gitignore: bool, skip: &[PathBuf], files: &mut Vec<PathBuf>) {
    let skip = skip.to_vec();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .parents(respect_gitignore)
        .ignore(respect_gitignore)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore)
        .git_exclude(respect_gitignore)
        .require_git(false)
        .filter_entry(move |entry| {
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            if entry.file_name() == ".git" {
                return false;
            }
            match entry.path().canonicalize() {
                Ok(canonical) => !skip.iter().any(|s| canonical.starts_with(s)),
                Err(_) => true,
            }
        })
        .build();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(err) => log::warn!("skipping entry: {err}"),
        }
    }
}

/// Parse CLI arguments and return configuration
pub fn parse_args() -> Cli {
    Cli::parse()
}
