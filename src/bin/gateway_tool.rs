use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use shardgate::{GatewayFormat, GatewaySettings, GatewayState, GatewayStore};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gateway-tool")]
#[command(about = "Inspect and convert persisted gateway state files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a state file (binary or JSON) as JSON
    Inspect { path: PathBuf },
    /// Convert a state file between forms; formats follow the file extensions
    Convert { input: PathBuf, output: PathBuf },
    /// Show the newest committed state in a gateway directory
    Latest { dir: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { path } => inspect(&path),
        Command::Convert { input, output } => convert(&input, &output),
        Command::Latest { dir } => latest(&dir),
    }
}

fn inspect(path: &Path) -> Result<()> {
    let state = GatewayStore::read_state_file(path)
        .with_context(|| format!("Failed to read gateway state '{}'", path.display()))?;
    println!("{}", state.to_json_pretty()?);
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let state = GatewayStore::read_state_file(input)
        .with_context(|| format!("Failed to read gateway state '{}'", input.display()))?;

    let format = output
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(GatewayFormat::from_extension)
        .ok_or_else(|| anyhow!("Output '{}' must end in .bin or .json", output.display()))?;
    let bytes = match format {
        GatewayFormat::Binary => state.to_bytes()?,
        GatewayFormat::Json => state.to_json_pretty()?.into_bytes(),
    };

    fs::write(output, bytes)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    println!(
        "Converted version {} ({} shards) to {}",
        state.version(),
        state.shards().len(),
        output.display()
    );
    Ok(())
}

fn latest(dir: &Path) -> Result<()> {
    let store = GatewayStore::open_existing(dir, GatewaySettings::default())
        .with_context(|| format!("Failed to open gateway directory '{}'", dir.display()))?;
    match store.load_latest()? {
        Some(state) => print_summary(&state),
        None => println!("No gateway state in {}", dir.display()),
    }
    Ok(())
}

fn print_summary(state: &GatewayState) {
    println!("version: {}", state.version());
    println!("indices: {}", state.metadata().indices().count());
    println!("started shards: {}", state.shards().len());
    for (shard_id, version) in state.sorted_shards() {
        println!("  {} @ {}", shard_id, version);
    }
}
