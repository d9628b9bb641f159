// Runs every implant on a local image and writes one PNG per implant.
//
//     phosphene <input_image> <output_dir>

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use phosphene::{ConfigurationRegistry, Orchestrator, SimulationRunner, TempFileManager};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "phosphene", version, about = "Simulate phosphene percepts for AlphaAMS, Argus II and PRIMA")]
struct Cli {
    /// Image to simulate.
    input: PathBuf,
    /// Directory the rendered `<implant>.png` files are written to.
    output_dir: PathBuf,
    /// Directory for intermediate files. Defaults to the system temp directory.
    #[arg(long, env = "PHOSPHENE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "phosphene=info,info".to_string()))
        .init();

    let cli = Cli::parse();

    // --- 1. Pipeline Setup ---
    let temp_files = cli.scratch_dir.map(TempFileManager::new).unwrap_or_default();
    let orchestrator = Orchestrator::new(SimulationRunner::new(Arc::new(ConfigurationRegistry::new()), temp_files));

    // --- 2. Simulation ---
    let result = orchestrator
        .run_all(&cli.input)
        .with_context(|| format!("simulating {}", cli.input.display()))?;

    // --- 3. Output ---
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    for (kind, encoded) in result.iter() {
        let path = cli.output_dir.join(format!("{kind}.png"));
        fs::write(&path, STANDARD.decode(encoded)?).with_context(|| format!("writing {}", path.display()))?;
        info!(implant = %kind, path = %path.display(), "wrote percept");
    }

    Ok(())
}
