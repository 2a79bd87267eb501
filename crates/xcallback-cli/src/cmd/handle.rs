use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use xcallback_core::{
    Config, Dispatch, Launcher, Manager, Parameters, RecordingLauncher, Responder, SystemLauncher,
};

/// Actions this binary answers when invoked through `handle`.
fn register_builtin_actions(manager: &Manager) {
    manager.register_action("ping", |_params: Parameters, responder: Responder| {
        responder.succeed(None);
    });
}

pub fn run(config_path: &Path, url: &str, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;

    // Responses are collected first so they can be printed before being opened.
    let recorder = Arc::new(RecordingLauncher::new());
    let manager = Manager::with_launcher(config, recorder.clone());
    register_builtin_actions(&manager);

    let dispatch = manager.handle_open_url(url);
    let launched = recorder.take();

    if !dry_run {
        for target in &launched {
            SystemLauncher
                .open(target)
                .with_context(|| format!("failed to open {target}"))?;
        }
    }

    if json {
        let ignored = match &dispatch {
            Dispatch::Handled => None,
            Dispatch::Ignored(reason) => Some(reason),
        };
        print_json(&serde_json::json!({
            "handled": dispatch.is_handled(),
            "ignored": ignored,
            "launched": launched,
        }))?;
        return Ok(());
    }

    match &dispatch {
        Dispatch::Handled => println!("handled"),
        Dispatch::Ignored(reason) => println!("ignored: {reason}"),
    }
    for target in &launched {
        println!("  -> {target}");
    }
    Ok(())
}
