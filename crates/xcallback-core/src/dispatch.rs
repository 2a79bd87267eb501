//! Inbound URL handling.
//!
//! A URL whose host is `x-callback-url` is a response to one of our requests;
//! anything else is another application invoking one of our actions.
//! Nothing here returns an error: URLs that cannot be routed are dropped and
//! reported as [`Dispatch::Ignored`].

use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::failure::{Failure, FailureInfo, FailureKind};
use crate::manager::Manager;
use crate::pending::Outcome;
use crate::query;
use crate::types::{
    strip_protocol_keys, Parameters, ResponseType, KEY_CANCEL, KEY_ERROR, KEY_ERROR_CODE,
    KEY_LEGACY_REQUEST_ID, KEY_REQUEST_ID, KEY_RESPONSE_TYPE, KEY_SOURCE, KEY_SUCCESS, XCU_HOST,
};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    Response(InboundResponse),
    Request(ActionRequest),
}

/// A response to a request this process issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundResponse {
    pub request_id: String,
    pub response_type: ResponseType,
    /// Query parameters minus protocol keys.
    pub params: Parameters,
}

/// Another application invoking one of our actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub action: String,
    /// Query parameters minus protocol keys, callback URLs and `x-source`.
    pub params: Parameters,
    pub success: Option<String>,
    pub error: Option<String>,
    pub cancel: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum IgnoreReason {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL names no action")]
    MissingAction,

    #[error("unknown response type '{0}'")]
    UnknownResponseType(String),

    #[error("response carries no request identifier")]
    MissingRequestId,

    #[error("no pending request '{0}'")]
    UnknownRequest(String),

    #[error("action '{0}' is not registered and no x-error URL was supplied")]
    UnsupportedAction(String),
}

fn decode_segment(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse an inbound URL without touching any state.
pub fn classify(url: &str) -> Result<Inbound, IgnoreReason> {
    let parsed = Url::parse(url).map_err(|e| IgnoreReason::InvalidUrl(e.to_string()))?;
    let params = parsed.query().map(query::decode).unwrap_or_default();
    let host = parsed.host_str().map(decode_segment).unwrap_or_default();
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).map(decode_segment).collect())
        .unwrap_or_default();

    if host.eq_ignore_ascii_case(XCU_HOST) {
        let raw_type = params
            .get(KEY_RESPONSE_TYPE)
            .cloned()
            .or_else(|| segments.last().cloned())
            .unwrap_or_default();
        let response_type = raw_type
            .parse::<ResponseType>()
            .map_err(|_| IgnoreReason::UnknownResponseType(raw_type.clone()))?;
        let request_id = params
            .get(KEY_REQUEST_ID)
            .or_else(|| params.get(KEY_LEGACY_REQUEST_ID))
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or(IgnoreReason::MissingRequestId)?;
        return Ok(Inbound::Response(InboundResponse {
            request_id,
            response_type,
            params: strip_protocol_keys(&params),
        }));
    }

    let mut action = host;
    if !segments.is_empty() {
        if !action.is_empty() {
            action.push('/');
        }
        action.push_str(&segments.join("/"));
    }
    if action.is_empty() {
        return Err(IgnoreReason::MissingAction);
    }

    let mut params = strip_protocol_keys(&params);
    let success = params.remove(KEY_SUCCESS);
    let error = params.remove(KEY_ERROR);
    let cancel = params.remove(KEY_CANCEL);
    let source = params.remove(KEY_SOURCE);
    Ok(Inbound::Request(ActionRequest {
        action,
        params,
        success,
        error,
        cancel,
        source,
    }))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What happened to an inbound URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored(IgnoreReason),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}

pub(crate) fn dispatch(manager: &Manager, url: &str) -> Dispatch {
    let inbound = match classify(url) {
        Ok(inbound) => inbound,
        Err(reason) => {
            tracing::warn!(url = %url, reason = %reason, "dropping inbound URL");
            return Dispatch::Ignored(reason);
        }
    };
    match inbound {
        Inbound::Response(response) => dispatch_response(manager, response),
        Inbound::Request(request) => dispatch_request(manager, request),
    }
}

fn dispatch_response(manager: &Manager, response: InboundResponse) -> Dispatch {
    manager.purge_expired();
    let InboundResponse {
        request_id,
        response_type,
        params,
    } = response;

    // Removed before the callback runs; a replay of the same URL finds nothing.
    let Some(pending) = manager.pending().take(&request_id) else {
        tracing::debug!(request_id = %request_id, "no pending request for response");
        return Dispatch::Ignored(IgnoreReason::UnknownRequest(request_id));
    };

    let outcome = match response_type {
        ResponseType::Success => {
            Outcome::Success(if params.is_empty() { None } else { Some(params) })
        }
        ResponseType::Error => {
            let failure = Failure::from_parameters(&params);
            if failure.kind() == Some(FailureKind::MissingErrorCode)
                && !params.contains_key(KEY_ERROR_CODE)
            {
                tracing::warn!(request_id = %request_id, "error response without error code");
            }
            Outcome::Failure(failure)
        }
        ResponseType::Cancel => Outcome::Cancel,
    };

    tracing::info!(
        request_id = %request_id,
        action = %pending.action,
        response_type = %response_type,
        "delivering response"
    );
    pending.complete(outcome);
    Dispatch::Handled
}

fn dispatch_request(manager: &Manager, request: ActionRequest) -> Dispatch {
    let ActionRequest {
        action,
        params,
        success,
        error,
        cancel,
        source,
    } = request;
    let responder = Responder {
        manager: manager.clone(),
        action: action.clone(),
        source,
        success,
        error,
        cancel,
    };

    match manager.registry().lookup(&action) {
        Some(handler) => {
            tracing::info!(
                action = %action,
                source = responder.source().unwrap_or("-"),
                "invoking action handler"
            );
            handler.handle(params, responder);
            Dispatch::Handled
        }
        None if responder.error.is_some() => {
            let failure = Failure::with_kind(
                FailureKind::NotSupportedAction,
                format!(
                    "{action} not supported by {}",
                    manager.app_name().unwrap_or("this application")
                ),
            );
            tracing::info!(action = %action, "unsupported action, reporting through x-error");
            responder.fail(&failure);
            Dispatch::Handled
        }
        None => {
            tracing::debug!(action = %action, "unsupported action without x-error, dropping");
            Dispatch::Ignored(IgnoreReason::UnsupportedAction(action))
        }
    }
}

// ---------------------------------------------------------------------------
// Responder
// ---------------------------------------------------------------------------

/// Answers one inbound action request.
///
/// Each method consumes the responder, so a request is answered at most once.
/// When the requester supplied no URL for the chosen outcome, answering is a
/// no-op.
pub struct Responder {
    manager: Manager,
    action: String,
    source: Option<String>,
    success: Option<String>,
    error: Option<String>,
    cancel: Option<String>,
}

impl Responder {
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Display name the requester sent in `x-source`.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn succeed(self, params: Option<Parameters>) {
        let url = self.success.clone();
        self.open(url, params.unwrap_or_default());
    }

    pub fn fail(self, failure: &dyn FailureInfo) {
        let url = self.error.clone();
        self.open(url, failure.error_parameters());
    }

    pub fn cancel(self) {
        let url = self.cancel.clone();
        self.open(url, Parameters::new());
    }

    fn open(self, url: Option<String>, params: Parameters) {
        let Some(url) = url else {
            tracing::debug!(action = %self.action, "requester supplied no callback URL for this outcome");
            return;
        };
        if let Err(e) = Url::parse(&url) {
            tracing::warn!(action = %self.action, url = %url, error = %e, "invalid callback URL");
            return;
        }
        // The request id and response type on the callback URL are ours; a
        // reply may not override them.
        let params = strip_protocol_keys(&params);
        let full = query::append_to_url(&url, &params);
        if let Err(e) = self.manager.open_url(&full) {
            tracing::warn!(action = %self.action, error = %e, "could not deliver response");
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("action", &self.action)
            .field("source", &self.source)
            .field("success", &self.success)
            .field("error", &self.error)
            .field("cancel", &self.cancel)
            .finish()
    }
}
