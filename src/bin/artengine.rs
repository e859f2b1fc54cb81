use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "artengine", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the layers directory tree and write config/layers.json.
    Catalog(RootArgs),
    /// Select, render and persist the whole collection.
    Build(RootArgs),
    /// Write a rarity report for a finished build.
    Report(RootArgs),
}

#[derive(Parser, Debug)]
struct RootArgs {
    /// Project root holding the config, layers and build directories.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Engine config file (defaults to <root>/config/engine.json).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Catalog(args) => cmd_catalog(args),
        Command::Build(args) => cmd_build(args),
        Command::Report(args) => cmd_report(args),
    }
}

fn load_config(args: &RootArgs) -> anyhow::Result<artengine::EngineConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| args.root.join("config/engine.json"));
    Ok(artengine::EngineConfig::load(&path)?)
}

fn cmd_catalog(args: RootArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let layers_root = args.root.join(&config.paths.layers);
    let catalog = artengine::scan_layers(&layers_root, config.default_weight)?;
    let out = args.root.join(&config.paths.config).join("layers.json");
    artengine::write_catalog(&catalog, &out)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_build(args: RootArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let summary = artengine::run_build(&config, &args.root)?;
    eprintln!(
        "wrote {} items from {} series to {}",
        summary.items,
        summary.series,
        summary.out_dir.display()
    );
    Ok(())
}

fn cmd_report(args: RootArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let out = artengine::run_report(&config, &args.root)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
