use crate::cmd::parse_pairs;
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use xcallback_core::{Callbacks, Config, Launcher, Manager, RecordingLauncher, SystemLauncher};

pub fn run(
    config_path: &Path,
    scheme: &str,
    action: &str,
    raw_params: &[String],
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;
    let params = parse_pairs(raw_params)?;

    let launcher: Arc<dyn Launcher> = if dry_run {
        Arc::new(RecordingLauncher::new())
    } else {
        Arc::new(SystemLauncher)
    };
    let manager = Manager::with_launcher(config, launcher);

    // A one-shot process cannot receive the answer, so no callbacks are attached.
    let url = manager
        .perform_action(action, scheme, params, Callbacks::new())
        .with_context(|| format!("failed to send '{action}' to {scheme}"))?;

    if json {
        print_json(&serde_json::json!({
            "url": url.as_str(),
            "request_id": url.request_id(),
            "opened": !dry_run,
        }))?;
    } else if dry_run {
        println!("{url}");
    } else {
        println!("Opened {url}");
    }
    Ok(())
}
