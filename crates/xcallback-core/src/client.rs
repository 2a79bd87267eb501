use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::manager::{Manager, PendingResponse};
use crate::pending::Callbacks;
use crate::request::{validate_scheme, RequestUrl};
use crate::types::Parameters;

/// A target application, addressed by its URL scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Client {
    pub fn new(scheme: impl Into<String>) -> Result<Self> {
        let scheme = scheme.into();
        validate_scheme(&scheme)?;
        Ok(Self { scheme, name: None })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for log lines and messages: the display name, else the scheme.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.scheme)
    }

    /// Whether the manager's launcher knows an application for this scheme.
    pub fn is_installed(&self, manager: &Manager) -> bool {
        manager.launcher().can_open(&self.scheme)
    }

    pub fn perform(
        &self,
        manager: &Manager,
        action: &str,
        params: Parameters,
        callbacks: Callbacks,
    ) -> Result<RequestUrl> {
        manager.perform_action(action, &self.scheme, params, callbacks)
    }

    pub fn request(
        &self,
        manager: &Manager,
        action: &str,
        params: Parameters,
    ) -> Result<PendingResponse> {
        manager.request(action, &self.scheme, params)
    }
}
