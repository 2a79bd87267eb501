use std::path::{Path, PathBuf};

use xcallback_core::config::DEFAULT_CONFIG_FILE;

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config` flag / `XCALLBACK_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `xcallback.yaml`
/// 3. Fall back to `cwd/xcallback.yaml`
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd).unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}
