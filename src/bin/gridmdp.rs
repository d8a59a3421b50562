use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use gridmdp::mdp::{
    value_iteration, HistoryView, MdpConfig, StoppingRule, SweepMode, ValueIterationConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoppingArg {
    /// Stop once a sweep's delta is at most `epsilon`
    Threshold,
    /// Stop once two consecutive deltas are identical
    ExactDelta,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SweepArg {
    InPlace,
    Synchronous,
}

#[derive(Parser)]
#[command(name = "gridmdp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Solve a grid world MDP by value iteration", long_about = None)]
struct Args {
    /// JSON grid description
    #[arg(value_name = "FILE", default_value = "input.json")]
    config: PathBuf,

    /// Digits after the decimal point
    #[arg(short, long, default_value_t = 4)]
    precision: usize,

    /// Print only the converged grid
    #[arg(short, long)]
    final_only: bool,

    /// Override the stopping rule from the file
    #[arg(long, value_enum)]
    stopping: Option<StoppingArg>,

    /// Override the sweep order from the file
    #[arg(long, value_enum)]
    sweep: Option<SweepArg>,
}

fn apply_overrides(
    mut solver: ValueIterationConfig,
    config: &MdpConfig,
    args: &Args,
) -> ValueIterationConfig {
    match args.stopping {
        Some(StoppingArg::Threshold) => solver.stopping = StoppingRule::Threshold(config.epsilon),
        Some(StoppingArg::ExactDelta) => solver.stopping = StoppingRule::ExactDelta,
        None => {}
    }
    match args.sweep {
        Some(SweepArg::InPlace) => solver.sweep_mode = SweepMode::InPlace,
        Some(SweepArg::Synchronous) => solver.sweep_mode = SweepMode::Synchronous,
        None => {}
    }
    solver
}

fn run(args: &Args) -> gridmdp::Result<()> {
    let config = MdpConfig::from_path(&args.config)?;
    let grid = config.to_grid_world()?;
    let solver = apply_overrides(config.solver_config()?, &config, args);
    log::debug!("solver settings: {:?}", solver);

    let result = value_iteration(&grid, &solver);
    println!("mdp Complete");
    if !result.converged {
        log::warn!("printing the last snapshot reached before the sweep limit");
    }

    println!(
        "{}",
        HistoryView::new(&grid, &result)
            .with_precision(args.precision)
            .final_only(args.final_only)
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        process::exit(1);
    }
}
