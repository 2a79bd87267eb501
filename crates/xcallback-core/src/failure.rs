use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Parameters, KEY_ERROR_CODE, KEY_ERROR_MESSAGE};

// ---------------------------------------------------------------------------
// FailureInfo
// ---------------------------------------------------------------------------

/// Anything that can be reported back through an `x-error` callback.
pub trait FailureInfo {
    fn code(&self) -> i64;
    fn message(&self) -> String;

    /// The `error-Code` / `errorMessage` pair appended to an `x-error` URL.
    fn error_parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(KEY_ERROR_CODE.to_string(), self.code().to_string());
        params.insert(KEY_ERROR_MESSAGE.to_string(), self.message());
        params
    }
}

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Failure codes the framework itself produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target has no handler registered for the requested action.
    NotSupportedAction = 1,
    /// A handler rejected the request because a parameter was missing.
    MissingParameter = 2,
    /// An error response arrived without a usable `error-Code`.
    MissingErrorCode = 3,
}

impl FailureKind {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<FailureKind> {
        match code {
            1 => Some(FailureKind::NotSupportedAction),
            2 => Some(FailureKind::MissingParameter),
            3 => Some(FailureKind::MissingErrorCode),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Concrete failure value delivered to a requester's failure callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub code: i64,
    pub message: String,
}

impl Failure {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn with_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(kind.code(), message)
    }

    /// Adapt an arbitrary host error. Its `Display` output becomes the message.
    pub fn from_error(code: i64, err: &dyn std::error::Error) -> Self {
        Self::new(code, err.to_string())
    }

    pub fn kind(&self) -> Option<FailureKind> {
        FailureKind::from_code(self.code)
    }

    /// Rebuild a failure from the parameters of an error response.
    ///
    /// A missing or non-numeric `error-Code` yields a
    /// [`FailureKind::MissingErrorCode`] failure.
    pub fn from_parameters(params: &Parameters) -> Self {
        let code = params
            .get(KEY_ERROR_CODE)
            .and_then(|c| c.trim().parse::<i64>().ok());
        match code {
            Some(code) => Self::new(
                code,
                params.get(KEY_ERROR_MESSAGE).cloned().unwrap_or_default(),
            ),
            None => Self::with_kind(
                FailureKind::MissingErrorCode,
                format!("error response is missing a numeric '{KEY_ERROR_CODE}'"),
            ),
        }
    }
}

impl FailureInfo for Failure {
    fn code(&self) -> i64 {
        self.code
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Failure {}

impl From<std::io::Error> for Failure {
    fn from(e: std::io::Error) -> Self {
        let code = e.raw_os_error().map(i64::from).unwrap_or(0);
        Self::new(code, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_parameters_carry_code_and_message() {
        let f = Failure::with_kind(FailureKind::MissingParameter, "missing 'user'");
        let params = f.error_parameters();
        assert_eq!(params.get("error-Code").map(String::as_str), Some("2"));
        assert_eq!(
            params.get("errorMessage").map(String::as_str),
            Some("missing 'user'")
        );
    }

    #[test]
    fn from_parameters_reads_code() {
        let mut params = Parameters::new();
        params.insert("error-Code".into(), "42".into());
        params.insert("errorMessage".into(), "quota exceeded".into());
        let f = Failure::from_parameters(&params);
        assert_eq!(f, Failure::new(42, "quota exceeded"));
        assert_eq!(f.kind(), None);
    }

    #[test]
    fn from_parameters_without_code_is_missing_error_code() {
        let mut params = Parameters::new();
        params.insert("errorMessage".into(), "oops".into());
        let f = Failure::from_parameters(&params);
        assert_eq!(f.kind(), Some(FailureKind::MissingErrorCode));
        assert_eq!(f.code, 3);
    }

    #[test]
    fn from_parameters_with_garbage_code_is_missing_error_code() {
        let mut params = Parameters::new();
        params.insert("error-Code".into(), "abc".into());
        assert_eq!(
            Failure::from_parameters(&params).kind(),
            Some(FailureKind::MissingErrorCode)
        );
    }

    #[test]
    fn custom_failure_info_gets_error_parameters() {
        struct Quota;
        impl FailureInfo for Quota {
            fn code(&self) -> i64 {
                429
            }
            fn message(&self) -> String {
                "slow down".into()
            }
        }
        let params = Quota.error_parameters();
        assert_eq!(params.get("error-Code").map(String::as_str), Some("429"));
        assert_eq!(params.get("errorMessage").map(String::as_str), Some("slow down"));
    }

    #[test]
    fn adapts_host_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let f = Failure::from_error(7, &io);
        assert_eq!(f.code, 7);
        assert_eq!(f.message, "no such file");

        let f: Failure = std::io::Error::from_raw_os_error(2).into();
        assert_eq!(f.code, 2);
    }
}
