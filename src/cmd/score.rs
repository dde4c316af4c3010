use crate::reports;
use clap::Args;
use flightscore::analysis::{score_schedule, FlightData};
use flightscore::config::Config;
use flightscore::criteria::exponential::load_lookup_file;
use flightscore::criteria::library::CriteriaLibrary;
use flightscore::definition::load_schedule;
use flightscore::diagnostics::TracingSink;
use flightscore::error::FsResult;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub config: Config,

    /// schedule file, or a built-in name such as `f3a_p23`
    #[arg(short, long)]
    pub schedule: String,

    /// one state per manoeuvre, or one state labelled by manoeuvre
    #[arg(short, long)]
    pub flight: PathBuf,

    /// JSON config, replaces the alignment and scoring options above
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    /// `group;name;exponent;error;downgrade;haslimit` lookup table
    #[arg(long)]
    pub criteria: Option<PathBuf>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// print every element downgrade as well
    #[arg(long, default_value_t = false)]
    pub details: bool,
}

/// The library with any loaded lookup curves applied.
pub fn load_library(table: Option<&PathBuf>) -> FsResult<CriteriaLibrary> {
    let mut lib = CriteriaLibrary::default();
    if let Some(path) = table {
        let unknown = lib.apply_lookups(&load_lookup_file(path)?);
        if !unknown.is_empty() {
            warn!(?unknown, "lookup rows without a matching criteria");
        }
    }
    Ok(lib)
}

pub fn run(args: ScoreArgs) -> FsResult<()> {
    // 1. Config, file first
    let config = match &args.config_file {
        Some(path) => Config {
            log_level: args.config.log_level.clone(),
            ..Config::load_from_file(path)?
        },
        None => {
            args.config.validate()?;
            args.config.clone()
        }
    };

    // 2. Inputs
    let sched = load_schedule(&args.schedule)?;
    let lib = load_library(args.criteria.as_ref())?;
    let flights = FlightData::load_from_file(&args.flight)?.into_manoeuvres(&sched);
    println!(
        "\n✈️  Scoring {} ({} manoeuvres, {} flown)",
        sched.name,
        sched.len(),
        flights.iter().filter(|f| !f.is_empty()).count()
    );

    // 3. Score
    let sink = TracingSink::from_config(&config)?;
    let results = score_schedule(&sched, flights, &config, &lib, &sink);

    // 4. Report
    reports::print_schedule_report(&results);
    if args.details {
        reports::print_downgrade_breakdown(&results);
    }
    if let Some(path) = &args.output {
        results.save_to_file(path)?;
        println!("💾 Results written to {}", path.display());
    }
    Ok(())
}
