//! The command line interface for the program.
use crate::column::ColumnMapper;
use crate::config::Configuration;
use crate::generator::GeneratorDescriptor;
use crate::input::read_generator_records;
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_resolved_generators};
use crate::resolve::Resolver;
use crate::settings::Settings;
use crate::technology::TechnologyClassifier;
use crate::units::ActivePower;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the translate command
#[derive(Args, Default)]
pub struct TranslateOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// File of overrides to apply to the configuration
    #[arg(long)]
    pub overrides: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Fail on the first record which cannot be resolved, instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Classify generators and compute their reserve contributions.
    Translate {
        /// Path to the configuration file.
        config: PathBuf,
        /// Path to the generators CSV file.
        generators: PathBuf,
        /// Other translate options
        #[command(flatten)]
        opts: TranslateOpts,
    },
    /// Validate a configuration file.
    Validate {
        /// Path to the configuration file.
        config: PathBuf,
        /// File of overrides to apply to the configuration
        #[arg(long)]
        overrides: Option<PathBuf>,
    },
    /// Show how a single generator would be classified.
    Classify {
        /// Path to the configuration file.
        config: PathBuf,
        /// The generator's fuel
        #[arg(long)]
        fuel: String,
        /// The generator's prime mover
        #[arg(long)]
        prime_mover: Option<String>,
        /// Rated capacity in MW
        #[arg(long, default_value_t = 1.0)]
        capacity: f64,
    },
    /// Manage settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Translate {
                config,
                generators,
                opts,
            } => handle_translate_command(&config, &generators, &opts, None),
            Self::Validate { config, overrides } => {
                handle_validate_command(&config, overrides.as_deref(), None)
            }
            Self::Classify {
                config,
                fuel,
                prime_mover,
                capacity,
            } => handle_classify_command(&config, &fuel, prime_mover.as_deref(), capacity),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ r2x --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// The outcome of translating a file of generator records
#[derive(Debug, PartialEq)]
pub struct TranslateSummary {
    /// The file written
    pub output_file: PathBuf,
    /// The number of records resolved
    pub resolved: usize,
    /// The number of records which could not be resolved
    pub skipped: usize,
}

/// Handle the `translate` command.
pub fn handle_translate_command(
    config_path: &Path,
    generators_path: &Path,
    opts: &TranslateOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(generators_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let summary = translate(
        config_path,
        opts.overrides.as_deref(),
        generators_path,
        output_path,
        opts.strict,
    )?;
    info!(
        "Resolved {} generators ({} skipped); written to {}",
        summary.resolved,
        summary.skipped,
        summary.output_file.display()
    );

    Ok(())
}

/// Resolve every record in `generators_path` and write the results to `output_path`.
///
/// Records which can't be resolved are logged and skipped, unless `strict` is set, in which case
/// the first such record is an error.
pub fn translate(
    config_path: &Path,
    overrides: Option<&Path>,
    generators_path: &Path,
    output_path: &Path,
    strict: bool,
) -> Result<TranslateSummary> {
    let config = Configuration::from_path(config_path, overrides)
        .context("Failed to load configuration.")?;
    info!("Loaded configuration from {}", config_path.display());

    let records = read_generator_records(generators_path, &ColumnMapper::new(&config))?;
    let resolver = Resolver::new(&config);
    let mut resolved = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (index, record) in records.iter().enumerate() {
        // Row numbers count the header as row 1
        let row = index + 2;
        match resolver.resolve_record(record) {
            Ok(generator) => resolved.push(generator),
            Err(err) if strict => {
                return Err(err).with_context(|| {
                    format!(
                        "Failed to resolve row {row} of {}",
                        generators_path.display()
                    )
                });
            }
            Err(err) => {
                warn!("Skipping row {row} of {}: {err}", generators_path.display());
                skipped += 1;
            }
        }
    }

    let output_file = write_resolved_generators(output_path, &config, &resolved)?;

    Ok(TranslateSummary {
        output_file,
        resolved: resolved.len(),
        skipped,
    })
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    config_path: &Path,
    overrides: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    // Load/validate the configuration
    Configuration::from_path(config_path, overrides)
        .context("Failed to validate configuration.")?;
    info!("Configuration validation successful!");

    Ok(())
}

/// Handle the `classify` command.
pub fn handle_classify_command(
    config_path: &Path,
    fuel: &str,
    prime_mover: Option<&str>,
    capacity: f64,
) -> Result<()> {
    ensure!(
        capacity.is_finite() && capacity > 0.0,
        "Capacity must be a positive number"
    );

    let settings = Settings::load().context("Failed to load settings.")?;
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let config =
        Configuration::from_path(config_path, None).context("Failed to load configuration.")?;
    let descriptor = GeneratorDescriptor::new(
        Some(fuel),
        prime_mover,
        ActivePower(capacity),
        "cli".into(),
        0,
    );

    for candidate in TechnologyClassifier::new(&config).candidates(&descriptor) {
        println!(
            "Candidate: {} {} (specificity {})",
            candidate.class, candidate.rule, candidate.specificity
        );
    }

    let resolved = Resolver::new(&config).resolve(descriptor)?;
    println!(
        "Model class: {} (fuel category: {})",
        resolved.model_class, resolved.fuel_category
    );
    for (reserve, fraction) in resolved.reserves.iter_contributing() {
        println!(
            "{reserve}: {fraction} ({} MW)",
            resolved
                .reserves
                .capacity_for(reserve, resolved.descriptor.capacity)
        );
    }

    Ok(())
}
