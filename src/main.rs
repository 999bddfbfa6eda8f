//! Command line entry point.

use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context,
    Result,
    bail,
};
use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use svg_translate::batch::{
    BatchOptions,
    BatchReport,
    start_injects,
};
use svg_translate::config::{
    ConfigManager,
    Settings,
};
use svg_translate::discover::expand_inputs;
use svg_translate::extract::{
    ExtractOptions,
    extract_file,
};
use svg_translate::inject::{
    InjectOptions,
    MappingSource,
    inject,
};
use svg_translate::mapping::{
    load_all_mappings_lenient,
    save_mapping,
};
use svg_translate::prepare::{
    GroupingPolicy,
    make_translation_ready,
};
use svg_translate::svg::Document;
use svg_translate::workflow::{
    WorkflowOptions,
    svg_extract_and_injects,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Parser)]
#[command(name = "svg-translate")]
#[command(version)]
#[command(about = "Extract and inject translations of multilingual SVG files")]
struct Cli {
    /// Settings file (default: .svg-translate.json in the current directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// What to do.
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Extract the translations of an SVG as mapping JSON
    Extract {
        /// Prepared or raw multilingual SVG
        #[arg(value_name = "SVG")]
        svg: PathBuf,

        /// Write the mapping here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lowercase the keys
        #[arg(long)]
        case_insensitive: bool,
    },

    /// Rewrite an SVG into the translation-ready form
    Prepare {
        /// SVG to rewrite
        #[arg(value_name = "SVG")]
        svg: PathBuf,

        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// How loose texts are grouped into switches
        #[arg(long, value_enum)]
        grouping: Option<GroupingArg>,
    },

    /// Inject translations from mapping files into an SVG
    Inject {
        /// SVG to translate
        #[arg(value_name = "SVG")]
        svg: PathBuf,

        /// Mapping files, merged in order
        #[arg(short, long = "mapping", value_name = "FILE", num_args = 1..)]
        mappings: Vec<PathBuf>,

        /// Write the result to this file
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Write the result into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Replace existing translations
        #[arg(long)]
        overwrite: bool,

        /// Match mapping keys ignoring case
        #[arg(long)]
        case_insensitive: bool,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Inject translations into many SVG files
    Batch {
        /// Files or directories to process
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Mapping files, merged in order
        #[arg(short, long = "mapping", value_name = "FILE", num_args = 1..)]
        mappings: Vec<PathBuf>,

        /// Write results into this directory instead of in place
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Replace existing translations
        #[arg(long)]
        overwrite: bool,

        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Write the batch report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Copy the translations of one SVG into others
    Sync {
        /// SVG to take the translations from
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Files or directories to translate
        #[arg(value_name = "TARGET", required = true)]
        targets: Vec<PathBuf>,

        /// Write results into this directory instead of in place
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also save the extracted mapping
        #[arg(long, value_name = "FILE")]
        save_mapping: Option<PathBuf>,
    },
}

/// `--grouping` values.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupingArg {
    /// One switch per loose text
    Standalone,
    /// Join `{id}-{lang}` texts to the switch of `{id}`
    IdPrefix,
}

impl From<GroupingArg> for GroupingPolicy {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Standalone => Self::Standalone,
            GroupingArg::IdPrefix => Self::IdPrefix,
        }
    }
}

/// Installs the subscriber; the guard flushes the log file on drop.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}

/// Loads `--config` or the settings file of the current directory.
fn load_settings(config: Option<&Path>) -> Result<ConfigManager> {
    let mut manager = ConfigManager::new();
    let current_dir = std::env::current_dir().context("Failed to read the current directory")?;
    manager.load_settings(config, &current_dir)?;
    if let Some(path) = manager.config_path() {
        tracing::info!("Using settings from {}", path.display());
    }
    Ok(manager)
}

/// Applies command line overrides and validates the result.
fn apply_overrides(
    manager: &mut ConfigManager,
    update: impl FnOnce(&mut Settings),
) -> Result<Settings> {
    let mut settings = manager.get_settings().clone();
    update(&mut settings);
    manager.update_settings(settings)?;
    Ok(manager.get_settings().clone())
}

/// Mapping files from the command line, else from the settings.
fn mapping_files(cli_files: Vec<PathBuf>, settings: &Settings) -> Result<Vec<PathBuf>> {
    let files = if cli_files.is_empty() { settings.mapping_files.clone() } else { cli_files };
    if files.is_empty() {
        bail!("No mapping files given; pass --mapping or set mappingFiles");
    }
    Ok(files)
}

/// SVG files under `paths`; missing paths are kept and fail per file.
fn collect_targets(paths: &[PathBuf], settings: &Settings) -> Result<Vec<PathBuf>> {
    let files = expand_inputs(paths, &settings.include_patterns, &settings.exclude_patterns)?;
    if files.is_empty() {
        bail!("No SVG files found");
    }
    Ok(files)
}

/// Logs the totals and writes the JSON report if asked.
fn log_report(report: &BatchReport, report_path: Option<&Path>) -> Result<()> {
    tracing::info!(
        files = report.files,
        saved = report.saved_done,
        no_changes = report.no_changes,
        failed = report.no_save,
        nested = report.nested_files,
        inserted = report.stats.inserted_translations,
        updated = report.stats.updated_translations,
        "Done"
    );
    for (kind, count) in &report.errors {
        tracing::warn!("{count} file(s) failed with {kind:?}");
    }
    if let Some(path) = report_path {
        report.write_json(path)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

/// Runs one subcommand.
#[allow(clippy::print_stdout, clippy::too_many_lines)]
fn run(command: Commands, mut manager: ConfigManager) -> Result<()> {
    match command {
        Commands::Extract { svg, output, case_insensitive } => {
            let settings = apply_overrides(&mut manager, |s| {
                s.case_sensitive &= !case_insensitive;
            })?;
            let options = ExtractOptions {
                case_sensitive: settings.case_sensitive,
                prepare: settings.prepare_options(),
            };
            let mapping = extract_file(&svg, &options)?;
            match output {
                Some(output) => {
                    save_mapping(&output, &mapping)?;
                    tracing::info!(keys = mapping.len(), "Mapping written to {}", output.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&mapping)?),
            }
        }

        Commands::Prepare { svg, output, grouping } => {
            let settings = apply_overrides(&mut manager, |s| {
                if let Some(grouping) = grouping {
                    s.grouping = grouping.into();
                }
            })?;
            let mut doc = Document::load(&svg)?;
            let report = make_translation_ready(&mut doc, &settings.prepare_options())?;
            let target = output.unwrap_or(svg);
            doc.save(&target)?;
            tracing::info!(?report, "Prepared document written to {}", target.display());
        }

        Commands::Inject {
            svg,
            mappings,
            output_file,
            output_dir,
            overwrite,
            case_insensitive,
            dry_run,
        } => {
            let settings = apply_overrides(&mut manager, |s| {
                s.overwrite |= overwrite;
                s.case_sensitive &= !case_insensitive;
                if output_dir.is_some() {
                    s.output_dir = output_dir;
                }
            })?;
            let files = mapping_files(mappings, &settings)?;
            let options = InjectOptions {
                save_result: !dry_run,
                output_file,
                ..settings.inject_options()
            };

            let outcome = inject(&svg, MappingSource::Files(&files), &options)?;
            let stats = outcome.stats;
            match outcome.saved_to {
                Some(path) => tracing::info!(?stats, "Saved {}", path.display()),
                None => tracing::info!(?stats, "Dry run, nothing written"),
            }
        }

        Commands::Batch { paths, mappings, output_dir, overwrite, threads, report } => {
            let settings = apply_overrides(&mut manager, |s| {
                s.overwrite |= overwrite;
                if output_dir.is_some() {
                    s.output_dir = output_dir;
                }
                if threads.is_some() {
                    s.num_threads = threads;
                }
            })?;
            let files = mapping_files(mappings, &settings)?;
            let (mapping, failed) = load_all_mappings_lenient(&files);
            if mapping.is_empty() {
                bail!("No translations loaded ({} mapping file(s) failed)", failed.len());
            }
            let targets = collect_targets(&paths, &settings)?;

            let options = BatchOptions {
                inject: settings.inject_options(),
                output_dir: settings.output_dir.clone(),
                threads: settings.threads(),
            };
            let batch_report = start_injects(&targets, &mapping, &options);
            log_report(&batch_report, report.as_deref())?;
        }

        Commands::Sync { source, targets, output_dir, save_mapping } => {
            let settings = apply_overrides(&mut manager, |s| {
                if output_dir.is_some() {
                    s.output_dir = output_dir;
                }
            })?;
            let targets = collect_targets(&targets, &settings)?;

            let workflow = WorkflowOptions {
                extract: ExtractOptions {
                    case_sensitive: settings.case_sensitive,
                    prepare: settings.prepare_options(),
                },
                mapping_output: save_mapping,
            };
            let options = BatchOptions {
                inject: settings.inject_options(),
                output_dir: settings.output_dir.clone(),
                threads: settings.threads(),
            };
            let batch_report = svg_extract_and_injects(&source, &targets, &workflow, &options)?;
            log_report(&batch_report, None)?;
        }
    }
    Ok(())
}

/// Entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let manager = load_settings(cli.config.as_deref())?;
    run(cli.command, manager)
}
