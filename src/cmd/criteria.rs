use crate::cmd::score::load_library;
use crate::reports;
use clap::Args;
use flightscore::error::FsResult;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct CriteriaArgs {
    /// lookup table applied over the built in curves
    #[arg(short, long)]
    pub table: Option<PathBuf>,

    /// only show criteria whose key contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

pub fn run(args: CriteriaArgs) -> FsResult<()> {
    let lib = load_library(args.table.as_ref())?;
    reports::print_criteria_report(&lib, args.filter.as_deref());
    Ok(())
}
