use clap::{Parser, Subcommand};

use self::{
    analyze_perf::AnalyzePerfArg, compare::CompareArg, generate_sessions::GenerateSessionsArg,
};

mod analyze_perf;
mod compare;
mod generate_sessions;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compare a session against history, other players, or a stage
    Compare(#[clap(flatten)] CompareArg),
    /// Replay a performance log and export its statistics
    AnalyzePerf(#[clap(flatten)] AnalyzePerfArg),
    /// Generate a synthetic session collection
    GenerateSessions(#[clap(flatten)] GenerateSessionsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    crate::logging::init(args.verbose);
    match args.mode {
        Mode::Compare(arg) => compare::run(&arg)?,
        Mode::AnalyzePerf(arg) => analyze_perf::run(&arg)?,
        Mode::GenerateSessions(arg) => generate_sessions::run(&arg)?,
    }
    Ok(())
}
