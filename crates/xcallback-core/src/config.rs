use crate::error::{Result, XCallbackError};
use crate::request::validate_scheme;
use crate::types::XCU_HOST;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "xcallback.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scheme other applications use to call back into this process.
    /// Required for any request that expects a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_scheme: Option<String>,

    /// Sent as `x-source` with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Deliver requests aimed at `callback_scheme` in-process instead of
    /// through the launcher.
    #[serde(default)]
    pub loopback: bool,

    /// Pending requests older than this are purged. Unset means never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_ttl_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.callback_scheme = Some(scheme.into());
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    pub fn with_request_ttl_secs(mut self, secs: u64) -> Self {
        self.request_ttl_secs = Some(secs);
        self
    }

    /// TTL as a duration. Values too large to represent mean no expiry.
    pub fn request_ttl(&self) -> Option<Duration> {
        self.request_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(XCallbackError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(XCallbackError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        match self.callback_scheme.as_deref() {
            Some(scheme) if validate_scheme(scheme).is_err() => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("callback_scheme '{scheme}' is not a valid URL scheme"),
                });
            }
            Some(scheme) if scheme.eq_ignore_ascii_case(XCU_HOST) => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("callback_scheme '{scheme}' is easily confused with the response host"),
                });
            }
            Some(_) => {}
            None => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "no callback_scheme: only fire-and-forget requests are possible"
                        .to_string(),
                });
                if self.loopback {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: "loopback has no effect without callback_scheme".to_string(),
                    });
                }
            }
        }

        if self.app_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "app_name is blank; x-source will be sent empty".to_string(),
            });
        }

        if self.request_ttl_secs == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "request_ttl_secs is 0: every pending request expires immediately"
                    .to_string(),
            });
        }

        warnings
    }
}
