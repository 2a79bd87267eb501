use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use xcallback_core::config::{Config, WarnLevel};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a new config file
    Init {
        /// Scheme other applications use to call back into this one
        #[arg(long)]
        scheme: String,
        /// Sent as x-source with every request
        #[arg(long)]
        name: Option<String>,
        /// Deliver requests to our own scheme in-process
        #[arg(long)]
        loopback: bool,
        /// Drop pending requests older than this many seconds
        #[arg(long, value_name = "SECS")]
        ttl: Option<u64>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(path, json),
        ConfigSubcommand::Validate => validate(path, json),
        ConfigSubcommand::Init {
            scheme,
            name,
            loopback,
            ttl,
            force,
        } => init(path, scheme, name, loopback, ttl, force, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(path).context("failed to load config")?;

    if json {
        print_json(&config)?;
        return Ok(());
    }

    let source = if path.is_file() {
        path.display().to_string()
    } else {
        "(defaults)".to_string()
    };
    println!("source:           {source}");
    println!(
        "callback_scheme:  {}",
        config.callback_scheme.as_deref().unwrap_or("(none)")
    );
    println!(
        "app_name:         {}",
        config.app_name.as_deref().unwrap_or("(none)")
    );
    println!("loopback:         {}", config.loopback);
    match config.request_ttl_secs {
        Some(secs) => println!("request_ttl_secs: {secs}"),
        None => println!("request_ttl_secs: (never expire)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(
    path: &Path,
    scheme: String,
    name: Option<String>,
    loopback: bool,
    ttl: Option<u64>,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut config = Config::new()
        .with_callback_scheme(scheme)
        .with_loopback(loopback);
    if let Some(name) = name {
        config = config.with_app_name(name);
    }
    if let Some(secs) = ttl {
        config = config.with_request_ttl_secs(secs);
    }

    if let Some(err) = config
        .validate()
        .into_iter()
        .find(|w| w.level == WarnLevel::Error)
    {
        anyhow::bail!("refusing to write invalid config: {}", err.message);
    }

    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
