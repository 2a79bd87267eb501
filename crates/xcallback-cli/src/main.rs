mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "xcallback",
    about = "Build, send and inspect x-callback-url requests",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest xcallback.yaml upward from the current directory)
    #[arg(long, global = true, env = "XCALLBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log protocol decisions to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask another application to perform an action (fire-and-forget)
    Perform {
        /// URL scheme of the target application
        scheme: String,
        /// Action to perform
        action: String,
        /// Action parameter, repeatable
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Print the request URL without opening it
        #[arg(long)]
        dry_run: bool,
    },

    /// Encode KEY=VALUE pairs as a query string
    Encode {
        #[arg(value_name = "KEY=VALUE")]
        pairs: Vec<String>,
    },

    /// Decode a query string into parameters
    Decode { query: String },

    /// Show how an inbound URL would be routed
    Inspect { url: String },

    /// Dispatch an inbound URL as if this process had been opened with it
    Handle {
        url: String,
        /// Print response URLs without opening them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show, validate or create the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = root::resolve_config_path(cli.config.as_deref());

    let result = match cli.command {
        Commands::Perform {
            scheme,
            action,
            params,
            dry_run,
        } => cmd::perform::run(&config_path, &scheme, &action, &params, dry_run, cli.json),
        Commands::Encode { pairs } => cmd::codec::encode(&pairs, cli.json),
        Commands::Decode { query } => cmd::codec::decode(&query, cli.json),
        Commands::Inspect { url } => cmd::inspect::run(&url, cli.json),
        Commands::Handle { url, dry_run } => cmd::handle::run(&config_path, &url, dry_run, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
