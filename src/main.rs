// Gravsim - headless runner
// Loads entity records, advances the simulation and prints JSON snapshots

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use gravsim_lib::{split_rows, AppState, SimulationConfig};

#[derive(Parser, Debug)]
#[command(about = "Simulate Newtonian gravity between point masses in a bounded 2D arena")]
struct Args {
    /// Comma separated rows of: mass, px, py, vx, vy, ax, ay
    #[arg(short, long)]
    records: PathBuf,

    /// JSON config file; GRAVSIM_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of manual ticks to run
    #[arg(short, long, default_value_t = 100)]
    ticks: u64,

    /// Run the auto ticker for this many milliseconds instead of manual ticks
    #[arg(long)]
    auto_ms: Option<u64>,

    /// Print a snapshot every N manual ticks (0 prints only the final one)
    #[arg(long, default_value_t = 0)]
    every: u64,
}

fn load_config(path: Option<&PathBuf>) -> Result<SimulationConfig> {
    let config = match path {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    Ok(config.with_env()?)
}

fn print_snapshot(app: &AppState) -> Result<()> {
    println!("{}", serde_json::to_string(&app.snapshot())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    let text = fs::read_to_string(&args.records)
        .with_context(|| format!("failed to read records {}", args.records.display()))?;

    let app = AppState::new(config);
    let errors = app.reset_from_rows(&split_rows(&text));
    if !errors.is_empty() {
        warn!("{} records skipped", errors.len());
    }

    match args.auto_ms {
        Some(ms) => {
            app.start_auto_update().await;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            app.stop_auto_update().await;
        }
        None => {
            for n in 1..=args.ticks {
                app.tick();
                if args.every > 0 && n % args.every == 0 {
                    print_snapshot(&app)?;
                }
            }
        }
    }

    info!("finished after {} ticks", app.snapshot().tick_count);
    print_snapshot(&app)
}
