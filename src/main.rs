/*!
 * bagmend CLI - Command Line Interface
 */

use clap::{Parser, Subcommand, ValueEnum};
use bagmend::{
    cli_style::{
        path_table, print_error, print_info, print_success, print_warning, section_header,
        stats_table,
    },
    config::{BagmendConfig, LogLevel},
    confirm::{ConfirmationReport, PathStatus},
    core::{NamingConvention, RenameOutcome, RenamePlan, RenameSession},
    error::{BagError, Result, EXIT_INTEGRITY, EXIT_SUCCESS},
    logging,
    manifest::{RehashReport, Rehasher},
    mapfile::load_rename_map,
    BagDirectory,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Parser)]
#[command(name = "bagmend")]
#[command(version, about = "Rename payload files in BagIt bags while keeping every manifest valid", long_about = None)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename payload files and update the manifests (dry-run unless --execute)
    Rename {
        /// One or more bag directories
        #[arg(required = true)]
        bags: Vec<PathBuf>,

        /// JSON rename map; without it names follow the institutional convention
        #[arg(short = 'm', long = "map", value_name = "FILE")]
        map: Option<PathBuf>,

        /// Actually rename files and rewrite manifests
        #[arg(long, conflicts_with = "dry_run")]
        execute: bool,

        /// Only report what would change (the default)
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Threads used to calculate checksums
        #[arg(long)]
        processes: Option<usize>,

        /// Write the applied renames to renameLog-<bag>-<timestamp>.json
        #[arg(long)]
        write_log: bool,

        /// Write the rename log to this file (single bag only)
        #[arg(long, value_name = "FILE")]
        log_path: Option<PathBuf>,

        /// Skip validation before and after renaming
        #[arg(long)]
        no_validate: bool,

        /// Institution prefix for convention-based names
        #[arg(long)]
        institution: Option<String>,

        /// Show progress bar while hashing
        #[arg(long)]
        progress: bool,
    },

    /// Rewrite manifests for renames already applied on disk
    Rehash {
        /// Bag directory
        bag: PathBuf,

        /// JSON rename map
        #[arg(short = 'm', long = "map", value_name = "FILE")]
        map: PathBuf,

        /// Validate the bag afterwards
        #[arg(long)]
        validate: bool,

        /// Threads used to calculate checksums
        #[arg(long)]
        processes: Option<usize>,
    },

    /// Validate bag fixity
    Validate {
        /// One or more bag directories
        #[arg(required = true)]
        bags: Vec<PathBuf>,

        /// Threads used to calculate checksums
        #[arg(long)]
        processes: Option<usize>,

        /// Show progress bar while hashing
        #[arg(long)]
        progress: bool,
    },

    /// Check a rename log against the files on disk
    Confirm {
        /// Directory (or bag) the log's paths are relative to
        directory: PathBuf,

        /// Rename log written by `rename`
        #[arg(short = 'l', long = "log", value_name = "FILE")]
        log: PathBuf,

        /// Also write the report as JSON to this file
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!(category = %e.category(), "{}", e);
            print_error(&e.to_string(), suggestion(&e));
            if let BagError::Validation { problems } = &e {
                for problem in problems {
                    eprintln!("  {}", problem);
                }
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn suggestion(err: &BagError) -> Option<&'static str> {
    match err {
        BagError::InvalidBag(_) => Some("Point bagmend at the directory that contains bagit.txt"),
        BagError::Config(_) => Some("Check the --config file and the command-line options"),
        BagError::Validation { .. } => Some("Fix the bag (or use --no-validate) before renaming"),
        _ => None,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut config = if let Some(ref config_path) = cli.config {
        BagmendConfig::from_file(config_path)?
    } else {
        BagmendConfig::default()
    };

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Rename {
            bags,
            map,
            execute,
            dry_run,
            processes,
            write_log,
            log_path,
            no_validate,
            institution,
            progress,
        } => {
            if execute {
                config.dry_run = false;
            }
            if dry_run {
                config.dry_run = true;
            }
            if let Some(processes) = processes {
                config.processes = processes;
            }
            config.write_log |= write_log;
            if log_path.is_some() {
                config.log_path = log_path;
            }
            if no_validate {
                config.validate_before = false;
                config.validate_after = false;
            }
            if let Some(institution) = institution {
                config.convention.institution = institution;
            }
            config.show_progress |= progress;

            handle_rename(&config, &bags, map, cli.json)
        }
        Commands::Rehash {
            bag,
            map,
            validate,
            processes,
        } => {
            if let Some(processes) = processes {
                config.processes = processes;
            }
            handle_rehash(&config, &bag, &map, validate, cli.json)
        }
        Commands::Validate {
            bags,
            processes,
            progress,
        } => {
            if let Some(processes) = processes {
                config.processes = processes;
            }
            config.show_progress |= progress;
            handle_validate(&config, &bags, cli.json)
        }
        Commands::Confirm {
            directory,
            log,
            output,
        } => handle_confirm(&directory, &log, output, cli.json),
    }
}

fn open_bag(config: &BagmendConfig, path: &Path) -> Result<BagDirectory> {
    Ok(BagDirectory::open(path)?
        .with_processes(config.processes)
        .with_progress(config.show_progress))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_rename(
    config: &BagmendConfig,
    bags: &[PathBuf],
    map: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    if bags.len() > 1 && config.log_path.is_some() {
        return Err(BagError::Config(
            "--log-path takes a single bag; use --write-log for one log per bag".to_string(),
        ));
    }

    let plan = match map {
        Some(path) => RenamePlan::Map(load_rename_map(&path)?),
        None => RenamePlan::Convention(NamingConvention::from(&config.convention)),
    };
    let session = RenameSession::from_config(config);

    let mut failures = 0;
    for path in bags {
        let bag = open_bag(config, path)?;
        let outcome = session.run(&bag, &plan)?;

        if json {
            print_json(&outcome)?;
        } else {
            print_rename_outcome(&outcome);
        }
        failures += outcome.failures;
    }

    if failures > 0 {
        return Err(BagError::RenameFailures { failures });
    }
    Ok(EXIT_SUCCESS)
}

fn print_rename_outcome(outcome: &RenameOutcome) {
    section_header(&outcome.bag.display().to_string());
    println!(
        "{}",
        stats_table(&[
            ("Renamed", outcome.successes.to_string()),
            ("Failed", outcome.failures.to_string()),
            ("Previously renamed", outcome.previously_renamed.to_string()),
        ])
    );

    if !outcome.applied.is_empty() {
        let rows: Vec<(String, String)> = outcome
            .applied
            .iter()
            .map(|e| (e.old.clone(), e.new.clone()))
            .collect();
        println!("{}", path_table(("Old name", "New name"), &rows));
    }

    for old in &outcome.failed {
        print_warning(&format!("Not renamed: {}", old));
    }
    if let Some(ref log) = outcome.log_file {
        print_info(&format!("Rename log written to {}", log.display()));
    }

    if outcome.dry_run {
        print_info("No changes were made (dry-run mode). Run with --execute to apply them.");
        return;
    }

    if let Some(ref report) = outcome.rehash {
        print_rehash_report(report);
    }
    if outcome.validated_after.is_some() {
        print_success("Bag validated after renaming");
    }
}

fn print_rehash_report(report: &RehashReport) {
    if report.skipped {
        print_info("Nothing to rehash");
        return;
    }
    print_success(&format!(
        "Rewrote {} payload manifest(s), patched {} tag manifest(s)",
        report.payload_manifests.len(),
        report.tag_manifests.len()
    ));
    for unmatched in &report.unmatched {
        print_warning(&format!("Not listed in any payload manifest: {}", unmatched));
    }
}

fn handle_rehash(
    config: &BagmendConfig,
    path: &Path,
    map: &Path,
    validate: bool,
    json: bool,
) -> Result<i32> {
    let bag = open_bag(config, path)?;
    let renames = load_rename_map(map)?;
    let report = Rehasher::new(config.engine_config()).run(&bag, &renames)?;

    if json {
        print_json(&report)?;
    } else {
        section_header(&bag.path().display().to_string());
        print_rehash_report(&report);
    }

    if validate {
        bag.refresh()?.validate_fixity(config.processes)?;
        if !json {
            print_success("Bag is valid");
        }
    }
    Ok(EXIT_SUCCESS)
}

fn handle_validate(config: &BagmendConfig, bags: &[PathBuf], json: bool) -> Result<i32> {
    let mut code = EXIT_SUCCESS;
    for path in bags {
        let bag = open_bag(config, path)?;
        match bag.validate_fixity(config.processes) {
            Ok(summary) => {
                if json {
                    print_json(&summary)?;
                } else {
                    print_success(&format!(
                        "{} is valid ({} entries checked)",
                        bag.path().display(),
                        summary.entries_checked
                    ));
                }
            }
            Err(BagError::Validation { problems }) => {
                if json {
                    print_json(&problems)?;
                } else {
                    print_error(
                        &format!("{} is invalid", bag.path().display()),
                        None,
                    );
                    for problem in &problems {
                        eprintln!("  {}", problem);
                    }
                }
                code = EXIT_INTEGRITY;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(code)
}

fn handle_confirm(
    directory: &Path,
    log: &Path,
    output: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    let renames = load_rename_map(log)?;
    let report = ConfirmationReport::build(directory, &renames)?;

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    }

    if json {
        print_json(&report)?;
    } else {
        let mut rows: Vec<(String, String)> = report
            .renamed
            .iter()
            .map(|p| {
                let status = match p.status {
                    PathStatus::ChangesMade => "changes made",
                    PathStatus::Missing => "FILE PATH DOES NOT EXIST",
                };
                (p.path.clone(), status.to_string())
            })
            .collect();
        rows.extend(
            report
                .unlogged
                .iter()
                .map(|p| (p.clone(), "not found in rename log".to_string())),
        );
        println!("{}", path_table(("Path", "Confirmation"), &rows));
    }

    Ok(if report.is_confirmed() {
        EXIT_SUCCESS
    } else {
        EXIT_INTEGRITY
    })
}
