use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("no application handles the '{scheme}' scheme")]
    TargetNotInstalled { scheme: String },
}

/// Opens a URL in another (or the same) process.
///
/// This is the only dependency the protocol layer has on the host platform.
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), LaunchError>;

    /// Whether some application is known to handle `scheme`.
    fn can_open(&self, _scheme: &str) -> bool {
        true
    }
}

/// Scheme of `url`, lowercased. Empty when `url` has no `:`.
pub fn scheme_of(url: &str) -> String {
    url.split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// SystemLauncher
// ---------------------------------------------------------------------------

/// Hands URLs to the desktop's URL handler via the `open` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        open::that(url).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "system launcher could not open URL");
            LaunchError::TargetNotInstalled {
                scheme: scheme_of(url),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingLauncher
// ---------------------------------------------------------------------------

/// Records every URL instead of opening it.
///
/// Hosts that deliver URLs themselves drain it with [`RecordingLauncher::take`].
/// Schemes marked unresolvable fail with [`LaunchError::TargetNotInstalled`].
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<String>>,
    unresolvable: Mutex<HashSet<String>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_unresolvable(&self, scheme: &str) {
        self.unresolvable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme.to_ascii_lowercase());
    }

    /// All URLs opened so far, oldest first.
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Drain the recorded URLs.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.opened.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        let scheme = scheme_of(url);
        if !self.can_open(&scheme) {
            return Err(LaunchError::TargetNotInstalled { scheme });
        }
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }

    fn can_open(&self, scheme: &str) -> bool {
        !self
            .unresolvable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&scheme.to_ascii_lowercase())
    }
}
