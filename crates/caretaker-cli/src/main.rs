use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod routes;

#[derive(Parser)]
#[command(name = "caretaker")]
#[command(about = "Caretaker - auth session tooling for the property maintenance client", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// User agent used to pick desktop or mobile timing
    #[arg(long, global = true)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile once and print the session
    Status,
    /// Sign in with email and password and print the session
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Run the navigation gate for a path and print the decision
    CheckRoute {
        /// Full path, query included (e.g. /tasks/42?tab=costs)
        path: String,
    },
    /// Keep the session in sync while reading lifecycle signals from stdin
    Watch,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let context = commands::Context::build(cli.config.as_deref(), cli.user_agent.as_deref())?;

    match cli.command {
        Commands::Status => commands::status::run(&context).await?,
        Commands::SignIn { email, password } => {
            commands::sign_in::run(&context, &email, &password).await?
        }
        Commands::CheckRoute { path } => commands::check_route::run(&context, &path).await?,
        Commands::Watch => commands::watch::run(&context).await?,
    }

    Ok(())
}
