use crate::backup::BackupStore;
use crate::config::ResolvedConfig;
use crate::formatters::registry::{FormatterRegistry, FormatterSpec, extension_of};
use crate::formatters::runner::run_formatter;
use crate::models::options::{ProcessOptions, TextPasses};
use crate::processing::endings::has_dos_line_endings;
use crate::processing::file::{normalize_content, read_source, write_atomically};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What happens to one file
#[derive(Debug, Clone, Copy)]
pub struct FilePlan<'a> {
    pub formatter: Option<&'a FormatterSpec>,
    pub convert_comments: bool,
}

pub struct Processor {
    registry: FormatterRegistry,
    comment_extensions: HashSet<String>,
    options: ProcessOptions,
    backups: Option<BackupStore>,
}

impl Processor {
    pub fn new(
        registry: FormatterRegistry,
        comment_extensions: impl IntoIterator<Item = String>,
        options: ProcessOptions,
        backups: Option<BackupStore>,
    ) -> Self {
        Self {
            registry,
            comment_extensions: comment_extensions.into_iter().collect(),
            options,
            backups,
        }
    }

    /// Build a processor from resolved configuration. Backups are only taken
    /// outside dry runs.
    pub fn from_config(config: &ResolvedConfig, options: ProcessOptions) -> Result<Self> {
        let backups = if options.keep_backups && !options.dry_run {
            Some(BackupStore::create(&config.backup_dir)?)
        } else {
            None
        };

        Ok(Self::new(
            config.formatters.clone(),
            config.comment_extensions.clone(),
            options,
            backups,
        ))
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    pub fn backups(&self) -> Option<&BackupStore> {
        self.backups.as_ref()
    }

    /// Hand the backup store back so the session can be closed
    pub fn into_backups(self) -> Option<BackupStore> {
        self.backups
    }

    /// Decide what to do with `path`, or `None` if no stage applies to it.
    ///
    /// Line endings are only converted in files of a known source type.
    pub fn plan(&self, path: &Path) -> Option<FilePlan<'_>> {
        let extension = extension_of(path)?;
        let registered = self.registry.formatter_for(path);
        let comment_source = self.comment_extensions.contains(&extension);

        let formatter = registered.filter(|_| self.options.run_formatters);
        let convert_comments = self.options.convert_comments && comment_source;
        let convert_line_endings =
            self.options.convert_line_endings && (comment_source || registered.is_some());

        if formatter.is_none() && !convert_comments && !convert_line_endings {
            return None;
        }

        Some(FilePlan {
            formatter,
            convert_comments,
        })
    }

    pub fn handles(&self, path: &Path) -> bool {
        self.plan(path).is_some()
    }

    /// Process a single file
    pub fn process_file(&self, path: &Path) -> Result<ProcessedFile> {
        let plan = self
            .plan(path)
            .with_context(|| format!("Unsupported file type: {}", path.display()))?;

        let original = read_source(path)?;
        let passes = TextPasses {
            line_endings: self.options.convert_line_endings,
            comments: plan.convert_comments,
        };
        let normalized = normalize_content(&original, passes);

        let mut processed = ProcessedFile {
            path: path.to_path_buf(),
            line_endings_fixed: passes.line_endings && has_dos_line_endings(&original),
            text_changed: normalized != original,
            formatter: plan.formatter.map(|spec| spec.name.clone()),
            formatted: false,
            backup: None,
            original_content: original,
            processed_content: normalized,
        };

        if self.options.dry_run {
            return Ok(processed);
        }

        let guard = match &self.backups {
            Some(store) => Some(store.backup(path)?),
            None => None,
        };

        if processed.text_changed {
            write_atomically(path, &processed.processed_content)?;
        }

        if let Some(spec) = plan.formatter {
            run_formatter(spec, path)?;
            processed.formatted = true;
            processed.processed_content = read_source(path)?;
        }

        if let Some(guard) = guard {
            processed.backup = guard.settle()?;
        }

        log::debug!(
            "{}: text_changed={} formatted={} modified={}",
            path.display(),
            processed.text_changed,
            processed.formatted,
            processed.modified()
        );
        Ok(processed)
    }
}

#[derive(Debug)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub original_content: String,
    pub processed_content: String,
    /// CRLF line endings were converted
    pub line_endings_fixed: bool,
    /// The text passes changed the content
    pub text_changed: bool,
    /// Name of the formatter registered for this file
    pub formatter: Option<String>,
    /// The formatter actually ran
    pub formatted: bool,
    /// Backup copy kept for this file
    pub backup: Option<PathBuf>,
}

impl ProcessedFile {
    pub fn modified(&self) -> bool {
        self.original_content != self.processed_content
    }
}

// Simple output writer
pub struct OutputWriter {
    dry_run: bool,
    verbose: bool,
}

impl OutputWriter {
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }

    pub fn report(&self, processed_file: &ProcessedFile) {
        let path = processed_file.path.display();

        if !processed_file.modified() {
            if self.verbose {
                println!("✓ No changes needed: {}", path);
            }
            return;
        }

        if self.dry_run {
            println!("[DRY RUN] Would modify: {}", path);
            if self.verbose {
                self.print_details(processed_file);
            }
            self.show_diff(processed_file);
            return;
        }

        if self.verbose {
            println!("✓ Modified: {}", path);
            self.print_details(processed_file);
        } else {
            println!("Modified: {}", path);
        }
    }

    pub fn report_error(&self, path: &Path, error: &anyhow::Error) {
        eprintln!("Error processing {}: {:#}", path.display(), error);
    }

    fn print_details(&self, processed_file: &ProcessedFile) {
        if processed_file.line_endings_fixed {
            println!("  Converted CRLF line endings");
        }
        if processed_file.text_changed {
            println!("  Normalized text");
        }
        match (&processed_file.formatter, processed_file.formatted) {
            (Some(name), true) => println!("  Formatted with {}", name),
            (Some(name), false) if self.dry_run => println!("  Formatter {} not run", name),
            _ => {}
        }
        if let Some(backup) = &processed_file.backup {
            println!("  Backup: {}", backup.display());
        }
    }

    fn show_diff(&self, processed_file: &ProcessedFile) {
        println!("\n--- {}", processed_file.path.display());
        println!("+++ {} (processed)", processed_file.path.display());

        let original_lines: Vec<&str> = processed_file.original_content.lines().collect();
        let processed_lines: Vec<&str> = processed_file.processed_content.lines().collect();

        let max_lines = original_lines.len().max(processed_lines.len());

        for i in 0..max_lines {
            match (original_lines.get(i), processed_lines.get(i)) {
                (Some(original), Some(processed)) if original != processed => {
                    println!("-{}", original);
                    println!("+{}", processed);
                }
                (Some(original), None) => println!("-{}", original),
                (None, Some(processed)) => println!("+{}", processed),
                _ => {}
            }
        }
    }

    pub fn print_summary(&self, total_files: usize, modified_files: usize, failed_files: usize) {
        if self.dry_run {
            println!(
                "\n[DRY RUN] Summary: {} files processed, {} would be modified",
                total_files, modified_files
            );
        } else {
            println!(
                "\nSummary: {} files processed, {} modified",
                total_files, modified_files
            );
        }

        if failed_files > 0 {
            println!("{} file(s) failed", failed_files);
        } else if total_files > 0 && modified_files == 0 {
            println!("All files were already normalized.");
        }
    }

    pub fn print_backup_location(&self, session: &Path) {
        println!("Backups saved in {}", session.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn text_only(dry_run: bool) -> ProcessOptions {
        ProcessOptions {
            dry_run,
            run_formatters: false,
            ..ProcessOptions::default()
        }
    }

    fn processor(options: ProcessOptions, backups: Option<BackupStore>) -> Processor {
        Processor::new(
            FormatterRegistry::builtin(),
            ["c".to_string(), "h".to_string()],
            options,
            backups,
        )
    }

    #[test]
    fn test_plan_selects_stages() {
        let processor = processor(ProcessOptions::default(), None);

        let plan = processor.plan(Path::new("a.c")).unwrap();
        assert!(plan.convert_comments);
        assert_eq!(plan.formatter.unwrap().name, "clang-format");

        let plan = processor.plan(Path::new("a.cpp")).unwrap();
        assert!(!plan.convert_comments);

        let plan = processor.plan(Path::new("lib.rs")).unwrap();
        assert_eq!(plan.formatter.unwrap().name, "rustfmt");

        assert!(processor.plan(Path::new("notes.txt")).is_none());
        assert!(!processor.handles(Path::new("Makefile")));
    }

    #[test]
    fn test_plan_keeps_known_sources_without_formatters() {
        let processor = processor(text_only(false), None);
        let plan = processor.plan(Path::new("lib.rs")).unwrap();
        assert!(plan.formatter.is_none());
        assert!(!plan.convert_comments);
        assert!(processor.plan(Path::new("notes.txt")).is_none());
    }

    #[test]
    fn test_process_file_rewrites_comments_and_endings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "int x = 1; // set x\r\nchar *u = \"http://a\";\r\n").unwrap();

        let store =
            BackupStore::with_base(&dir.path().join("bk"), dir.path().to_path_buf()).unwrap();
        let processor = processor(text_only(false), Some(store));
        let processed = processor.process_file(&path).unwrap();

        assert!(processed.modified());
        assert!(processed.line_endings_fixed);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "int x = 1; /* set x */\nchar *u = \"http://a\";\n"
        );

        let backup = processed.backup.expect("backup kept");
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            "int x = 1; // set x\r\nchar *u = \"http://a\";\r\n"
        );
    }

    #[test]
    fn test_unchanged_file_leaves_no_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clean.c");
        fs::write(&path, "int x; /* fine */\n").unwrap();

        let store =
            BackupStore::with_base(&dir.path().join("bk"), dir.path().to_path_buf()).unwrap();
        let processor = processor(text_only(false), Some(store));
        let processed = processor.process_file(&path).unwrap();

        assert!(!processed.modified());
        assert!(processed.backup.is_none());

        let session = processor.into_backups().unwrap().finish().unwrap();
        assert!(session.is_none());
    }

    #[test]
    fn test_dry_run_does_not_touch_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "x; // y\n").unwrap();

        let processor = processor(text_only(true), None);
        let processed = processor.process_file(&path).unwrap();

        assert!(processed.modified());
        assert_eq!(processed.processed_content, "x; /* y */\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "x; // y\n");
    }

    #[test]
    fn test_unsupported_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "// hi").unwrap();

        let err = processor(text_only(false), None)
            .process_file(&path)
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[cfg(unix)]
    #[test]
    fn test_formatter_failure_keeps_backup_of_rewritten_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.c");
        fs::write(&path, "a; // b\n").unwrap();

        let failing = FormatterSpec::new("failing", &["c"], "sh", &["-c", "exit 1"]);
        let mut configured = std::collections::BTreeMap::new();
        configured.insert(
            failing.name.clone(),
            crate::config::FormatterConfig {
                command: Some(failing.command.clone()),
                args: Some(failing.args.clone()),
                extensions: Some(failing.extensions.clone()),
                enabled: None,
            },
        );
        let registry = FormatterRegistry::from_config(&configured).unwrap();

        let backup_root = dir.path().join("bk");
        let store = BackupStore::with_base(&backup_root, dir.path().to_path_buf()).unwrap();
        let session = store.session_dir().to_path_buf();
        let processor = Processor::new(
            registry,
            ["c".to_string()],
            ProcessOptions::default(),
            Some(store),
        );

        assert!(processor.process_file(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a; /* b */\n");
        assert_eq!(
            fs::read_to_string(session.join("bad.c")).unwrap(),
            "a; // b\n"
        );
    }
}
