use clap::Args;
use flightscore::definition::{load_schedule, Heading};
use flightscore::error::{FsResult, ScoreError};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// schedule file, or a built-in name such as `f3a_p23`
    #[arg(short, long)]
    pub schedule: String,

    /// short name of the manoeuvre
    #[arg(short, long)]
    pub manoeuvre: String,

    /// which option of a manoeuvre with alternatives
    #[arg(long, default_value_t = 0)]
    pub option: usize,

    #[arg(long, default_value = "Right")]
    pub heading: String,

    /// distance from the pilot in metres
    #[arg(long, default_value_t = 150.0)]
    pub depth: f64,

    #[arg(long, default_value_t = 25.0)]
    pub freq: f64,

    /// write the template here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_heading(s: &str) -> FsResult<Heading> {
    match s.to_lowercase().as_str() {
        "right" => Ok(Heading::Right),
        "left" => Ok(Heading::Left),
        "in" => Ok(Heading::In),
        "out" => Ok(Heading::Out),
        other => Err(ScoreError::Config(format!("unknown heading {}", other))),
    }
}

pub fn run(args: TemplateArgs) -> FsResult<()> {
    let sched = load_schedule(&args.schedule)?;
    let mdo = sched.get(&args.manoeuvre).ok_or_else(|| {
        ScoreError::Config(format!("{} is not in {}", args.manoeuvre, sched.name))
    })?;
    let mdef = mdo.options().get(args.option).ok_or_else(|| {
        ScoreError::Config(format!(
            "{} has {} options",
            args.manoeuvre,
            mdo.options().len()
        ))
    })?;

    let itrans = mdef.initial_transform(parse_heading(&args.heading)?, args.depth);
    let (man, tp) = mdef.fit_box(&itrans)?.create_template(&itrans, args.freq)?;
    info!(
        manoeuvre = %man.uid,
        elements = man.len(),
        samples = tp.len(),
        duration = tp.duration(),
        "template created"
    );

    let text = serde_json::to_string_pretty(&tp)?;
    match &args.output {
        Some(path) => {
            fs::write(path, text)?;
            println!("💾 Template written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
