use std::path::PathBuf;
use thiserror::Error;

use crate::launcher::LaunchError;

#[derive(Debug, Error)]
pub enum XCallbackError {
    #[error("no application is installed for the '{scheme}' scheme")]
    TargetNotInstalled { scheme: String },

    #[error("completion callbacks were supplied but no callback URL scheme is configured")]
    CallbackSchemeNotDefined,

    #[error("failed to build request URL '{url}': {source}")]
    RequestUrlConstructionFailed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid action '{0}': must be non-empty")]
    InvalidAction(String),

    #[error("invalid URL scheme '{0}': must start with a letter followed by letters, digits, '+', '-' or '.'")]
    InvalidScheme(String),

    #[error("unknown response type: {0}")]
    UnknownResponseType(String),

    #[error("request {request_id} was dropped before a response arrived")]
    ResponseDropped { request_id: String },

    #[error("config not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<LaunchError> for XCallbackError {
    fn from(e: LaunchError) -> Self {
        match e {
            LaunchError::TargetNotInstalled { scheme } => {
                XCallbackError::TargetNotInstalled { scheme }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, XCallbackError>;
