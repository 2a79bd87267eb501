use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat string-to-string mapping carried in URL queries.
///
/// Ordered so that encoding the same parameters always yields the same query.
pub type Parameters = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Host used by every response URL.
pub const XCU_HOST: &str = "x-callback-url";

/// Display name of the requesting application.
pub const KEY_SOURCE: &str = "x-source";
pub const KEY_SUCCESS: &str = "x-success";
pub const KEY_ERROR: &str = "x-error";
pub const KEY_CANCEL: &str = "x-cancel";

pub const KEY_ERROR_CODE: &str = "error-Code";
pub const KEY_ERROR_MESSAGE: &str = "errorMessage";

pub const KEY_REQUEST_ID: &str = "x-requestID";
pub const KEY_LEGACY_REQUEST_ID: &str = "requestID";
pub const KEY_RESPONSE: &str = "response";
pub const KEY_RESPONSE_TYPE: &str = "responseType";

/// Keys that never reach a handler or a success payload.
pub const PROTOCOL_KEYS: &[&str] = &[
    KEY_REQUEST_ID,
    KEY_LEGACY_REQUEST_ID,
    KEY_RESPONSE,
    KEY_RESPONSE_TYPE,
];

pub fn is_protocol_key(key: &str) -> bool {
    PROTOCOL_KEYS.contains(&key)
}

/// Copy of `params` without any protocol keys.
pub fn strip_protocol_keys(params: &Parameters) -> Parameters {
    params
        .iter()
        .filter(|(k, _)| !is_protocol_key(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// ResponseType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Success,
    Error,
    Cancel,
}

impl ResponseType {
    pub fn all() -> &'static [ResponseType] {
        &[
            ResponseType::Success,
            ResponseType::Error,
            ResponseType::Cancel,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Success => "success",
            ResponseType::Error => "error",
            ResponseType::Cancel => "cancel",
        }
    }

    /// Query key under which the callback URL for this outcome travels.
    pub fn callback_key(self) -> &'static str {
        match self {
            ResponseType::Success => KEY_SUCCESS,
            ResponseType::Error => KEY_ERROR,
            ResponseType::Cancel => KEY_CANCEL,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseType {
    type Err = crate::error::XCallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ResponseType::Success),
            "error" => Ok(ResponseType::Error),
            "cancel" => Ok(ResponseType::Cancel),
            _ => Err(crate::error::XCallbackError::UnknownResponseType(
                s.to_string(),
            )),
        }
    }
}
