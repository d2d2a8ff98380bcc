use clap::{Parser, Subcommand};
use odm_cli::commands::{cmd_run, cmd_stage1, cmd_stage2, prepare};
use odm_cli::{RunArgs, Stage1Args, Stage2Args};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "odm")]
#[command(version, about = "Two-stage outlier screening for medical image corpora", long_about = None)]
struct Cli {
    /// Config file (default: search ODM_CONFIG, ./config, ., ~/odm)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Debug logging and per-batch progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage 1: screen images by histogram and write the accepted manifest
    Stage1(Stage1Args),

    /// Stage 2: split a manifest into good and bad paths by outlier score
    Stage2(Stage2Args),

    /// Run stage 1 then stage 2 on its manifest
    Run(RunArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = prepare(cli.config.as_deref(), cli.verbose).and_then(|config| match &cli.command {
        Commands::Stage1(args) => cmd_stage1(config, args),
        Commands::Stage2(args) => cmd_stage2(config, args),
        Commands::Run(args) => cmd_run(config, args),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
