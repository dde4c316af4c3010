use clap::{Parser, Subcommand};
use std::process;
use tracing::Level;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Score(cmd::score::ScoreArgs),
    Template(cmd::template::TemplateArgs),
    Criteria(cmd::criteria::CriteriaArgs),
}

fn init_tracing(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // 1. Logging
    let level = match &cli.command {
        Commands::Score(args) => args.config.log_level.clone(),
        Commands::Template(args) => args.log_level.clone(),
        Commands::Criteria(args) => args.log_level.clone(),
    };
    init_tracing(&level);

    // 2. Execute
    let result = match cli.command {
        Commands::Score(args) => cmd::score::run(args),
        Commands::Template(args) => cmd::template::run(args),
        Commands::Criteria(args) => cmd::criteria::run(args),
    };

    if let Err(e) = result {
        eprintln!("\n❌ FATAL: {}", e);
        process::exit(1);
    }
}
