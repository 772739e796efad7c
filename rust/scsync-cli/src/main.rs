use clap::Parser;
use scsync::{run_day, DirLocator, RunStatus};
use scsync_cli::{init_logging, Args};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let locator = DirLocator::new(&args.data_dir);
    let outcome = run_day(&locator, &args.symbol, args.date)?;
    println!(
        "{} {} {}: {} trades out ({} injected), {} depth records, hash {:016x}",
        args.symbol,
        args.date,
        outcome.status,
        outcome.counts.trades_out,
        outcome.counts.injected,
        outcome.counts.depth_records_out,
        outcome.manifest_hash,
    );
    if !outcome.anomalies.is_empty() {
        println!("anomalies: {}", outcome.anomalies);
    }
    if !outcome.report.passed() {
        anyhow::bail!("verification of the rewritten pair failed: {:?}", outcome.report);
    }
    if outcome.status == RunStatus::PartiallyComplete {
        tracing::warn!("run was cut short by an input truncation");
    }
    Ok(())
}
