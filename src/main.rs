use physim::{Sandbox, ScenarioConfig};
use physim::run_2d;
use physim::{bench_long_range, bench_tick};

use clap::Parser;
use anyhow::Result;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, default_value = "playground.yaml")]
    file_name: String,
    /// Run the benchmarks instead of opening a window
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(file_name);
    let file = File::open(&config_path)?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.bench {
        bench_long_range();
        bench_tick();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let sandbox = Sandbox::build_scenario(scenario_cfg);
    run_2d(sandbox);

    Ok(())
}
