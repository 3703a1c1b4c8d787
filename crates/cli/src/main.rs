//! AutoLab CLI - Main Entry Point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod client;
mod commands;
mod output;

use commands::{mentor, progress, run, scenario, Context};

/// AutoLab - practice browser test automation against a mock runtime
#[derive(Parser)]
#[command(name = "autolab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "AUTOLAB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios
    List(scenario::ListArgs),

    /// Show a scenario's brief and starter code
    Show(scenario::ShowArgs),

    /// Run a script and print its trace
    Run(run::RunArgs),

    /// Ask the mentor for a hint
    Hint(mentor::HintArgs),

    /// Have the mentor review a solution
    Verify(mentor::VerifyArgs),

    /// Show or reset saved progress
    Progress(progress::ProgressArgs),

    /// Show version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("AutoLab CLI v{}", autolab_common::VERSION);
        println!("Mock Playwright and Cypress runtime for learning test automation");
        return Ok(());
    }

    let config_path = cli.config.unwrap_or_else(autolab_common::default_config_path);
    let ctx = Context::load(&config_path, cli.format)?;

    match cli.command {
        Commands::List(args) => scenario::list(&ctx, args).await?,
        Commands::Show(args) => scenario::show(&ctx, args)?,
        Commands::Run(args) => run::execute(&ctx, args).await?,
        Commands::Hint(args) => mentor::hint(&ctx, args).await?,
        Commands::Verify(args) => mentor::verify(&ctx, args).await?,
        Commands::Progress(args) => progress::execute(&ctx, args).await?,
        Commands::Version => {}
    }

    Ok(())
}
