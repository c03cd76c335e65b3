use clap::Args;
use loopcue_core::{compute_snapshot, CycleLength};

#[derive(Args)]
pub struct SnapshotArgs {
    /// Cycle length in seconds (fractions allowed)
    #[arg(long, default_value_t = 60.0)]
    cycle: f64,
    /// Cycle start, milliseconds since the epoch
    #[arg(long, default_value_t = 0)]
    start_ms: u64,
    /// Evaluation instant, milliseconds since the epoch
    #[arg(long)]
    now_ms: u64,
}

pub fn run(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cycle = CycleLength::new(args.cycle)?;
    let snapshot = compute_snapshot(args.start_ms, args.now_ms, cycle);
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}
