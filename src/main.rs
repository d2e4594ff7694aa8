use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

use srcfmt::cli::{Cli, Commands, ProcessArgs, collect_files, parse_args};
use srcfmt::config::Config;
use srcfmt::processor::{OutputWriter, Processor};

fn main() -> ExitCode {
    let cli = parse_args();
    init_logging(cli.args.verbose);

    let result = match &cli.command {
        Some(Commands::Init { output, force }) => {
            Cli::handle_init_command(output, *force).map(|()| ExitCode::SUCCESS)
        }
        Some(Commands::Tools { config }) => {
            Cli::handle_tools_command(config.as_deref()).map(|()| ExitCode::SUCCESS)
        }
        None => run(&cli.args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(args: &ProcessArgs) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let mut config = Config::load(args.config.as_deref(), &cwd)?.resolve()?;
    args.apply_overrides(&mut config);

    let options = args.process_options(&config);
    let processor = Processor::from_config(&config, options)?;

    let skip_dirs = vec![config.backup_dir.clone()];
    let files: Vec<PathBuf> = collect_files(&args.paths, config.respect_gitignore, &skip_dirs)
        .into_iter()
        .filter(|path| processor.handles(path))
        .collect();

    if files.is_empty() {
        eprintln!("No files found matching the provided patterns.");
        if let Some(store) = processor.into_backups() {
            store.finish()?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("Processing {} file(s)...", files.len());
    if args.dry_run {
        println!("Dry run mode - no files will be modified");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .context("Failed to start worker threads")?;
    let results: Vec<_> = pool.install(|| {
        files
            .par_iter()
            .map(|path| processor.process_file(path))
            .collect()
    });

    let writer = OutputWriter::new(args.dry_run, args.verbose);
    let mut modified_files = 0;
    let mut failed_files = 0;

    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(processed) => {
                if processed.modified() {
                    modified_files += 1;
                }
                writer.report(&processed);
            }
            Err(err) => {
                failed_files += 1;
                writer.report_error(path, &err);
            }
        }
    }

    writer.print_summary(files.len(), modified_files, failed_files);

    if let Some(store) = processor.into_backups() {
        if let Some(session) = store.finish()? {
            writer.print_backup_location(&session);
        }
    }

    Ok(if failed_files > 0 {
        ExitCode::from(2)
    } else if args.check && modified_files > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
