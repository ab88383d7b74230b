use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use log::info;
use serde::Serialize;

use u_timetable::config::EngineConfig;
use u_timetable::dto::GenerationResponse;
use u_timetable::generator::Generator;
use u_timetable::models::GenerationRequest;
use u_timetable::sources::{CsvRoster, JsonRoster, RosterSource};
use u_timetable::validation::validate_with;

#[derive(Parser)]
#[command(name = "timetable")]
#[command(about = "School timetable generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a generation request
    Validate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate a timetable from a request
    Generate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Shuffle equally ranked candidates with this seed
        #[arg(long)]
        seed: Option<u64>,
        /// Return a partial timetable instead of failing
        #[arg(long)]
        allow_conflicts: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build a generation request from roster files
    #[command(group(
        ArgGroup::new("source")
            .args(["classes", "json"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        /// Classes CSV (class,subject,periods_per_week)
        #[arg(long, requires = "teachers")]
        classes: Option<PathBuf>,
        /// Teachers CSV (teacher,subjects)
        #[arg(long)]
        teachers: Option<PathBuf>,
        /// Roster JSON ({classes, teachers})
        #[arg(long)]
        json: Option<PathBuf>,
        /// Comma-separated day names
        #[arg(long, value_delimiter = ',', default_value = "Mon,Tue,Wed,Thu,Fri")]
        days: Vec<String>,
        #[arg(long, default_value_t = 6)]
        periods: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input, config } => {
            let config = load_config(config.as_deref())?;
            let request = read_request(&input)?;
            let report = validate_with(&request, &config.validation)
                .with_context(|| format!("invalid request in {}", input.display()))?;
            write_json(&report, None)?;
            if !report.valid {
                std::process::exit(2);
            }
        }
        Commands::Generate {
            input,
            config,
            seed,
            allow_conflicts,
            out,
        } => {
            let config = load_config(config.as_deref())?;
            let mut request = read_request(&input)?;
            if let Some(seed) = seed {
                request.options.shuffle_assignments = true;
                request.options.seed = Some(seed);
            }
            request.options.allow_conflicts |= allow_conflicts;

            let outcome = Generator::new()
                .with_config(config)
                .generate(&request)
                .with_context(|| format!("generation failed for {}", input.display()))?;
            let response = GenerationResponse::from(outcome);
            write_json(&response, out.as_deref())?;
            if !response.success {
                std::process::exit(2);
            }
        }
        Commands::Import {
            classes,
            teachers,
            json,
            days,
            periods,
            out,
        } => {
            let roster = match (classes, teachers, json) {
                (Some(classes), Some(teachers), _) => CsvRoster::new(classes, teachers).load(),
                (_, _, Some(json)) => JsonRoster::new(json).load(),
                _ => anyhow::bail!("either --classes with --teachers, or --json is required"),
            }
            .context("failed to load roster")?;

            info!(
                "Imported {} classes and {} teachers",
                roster.classes.len(),
                roster.teachers.len()
            );
            let request = roster.into_request(days, periods);
            write_json(&request, out.as_deref())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn read_request(path: &Path) -> anyhow::Result<GenerationRequest> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse request {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
