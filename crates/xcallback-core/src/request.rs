//! Outbound request URLs.
//!
//! A request URL has the shape
//! `<scheme>://<action>?<params>&x-success=<url>&x-error=<url>&x-cancel=<url>&x-source=<name>`.
//! Each embedded callback URL points back at this process:
//! `<own-scheme>://x-callback-url/<action>/<success|error|cancel>?x-requestID=<id>`.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::error::{Result, XCallbackError};
use crate::query;
use crate::types::{
    Parameters, ResponseType, KEY_CANCEL, KEY_ERROR, KEY_REQUEST_ID, KEY_SOURCE, KEY_SUCCESS,
    XCU_HOST,
};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static SCHEME_RE: OnceLock<Regex> = OnceLock::new();

fn scheme_re() -> &'static Regex {
    SCHEME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").unwrap())
}

pub fn validate_scheme(scheme: &str) -> Result<()> {
    if !scheme_re().is_match(scheme) {
        return Err(XCallbackError::InvalidScheme(scheme.to_string()));
    }
    Ok(())
}

/// An action becomes the host (and path) of the request URL, so it may not
/// carry URL delimiters, escapes, whitespace or empty `/` segments.
pub fn validate_action(action: &str) -> Result<()> {
    let has_delimiter = action.chars().any(|c| {
        c.is_whitespace() || c.is_control() || matches!(c, '?' | '#' | '%' | '@' | ':' | '\\')
    });
    if action.trim().is_empty() || has_delimiter || action.split('/').any(str::is_empty) {
        return Err(XCallbackError::InvalidAction(action.to_string()));
    }
    Ok(())
}

/// The action a parsed request URL actually names: host plus path.
fn action_of(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

// ---------------------------------------------------------------------------
// RequestUrl
// ---------------------------------------------------------------------------

/// A validated outbound request URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    url: Url,
    request_id: String,
    action: String,
}

impl RequestUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Identifier embedded in the callback URLs (also generated when none are).
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn params(&self) -> Parameters {
        self.url.query().map(query::decode).unwrap_or_default()
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Callback URL for one outcome of request `request_id`.
pub fn callback_url(
    own_scheme: &str,
    action: &str,
    response_type: ResponseType,
    request_id: &str,
) -> String {
    let path = action
        .split('/')
        .filter(|s| !s.is_empty())
        .map(query::encode_component)
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{own_scheme}://{XCU_HOST}/{path}/{}?{}",
        response_type.as_str(),
        query::encode_pairs([(KEY_REQUEST_ID, request_id)])
    )
}

/// Everything needed to build one request URL.
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    pub action: &'a str,
    pub target_scheme: &'a str,
    pub params: &'a Parameters,
    pub request_id: &'a str,
    pub response_types: &'a [ResponseType],
    pub callback_scheme: Option<&'a str>,
    pub source: Option<&'a str>,
}

impl RequestSpec<'_> {
    /// Build the request URL.
    ///
    /// Caller parameters come first, then `x-success`, `x-error`, `x-cancel`
    /// and `x-source`. Caller-supplied values for those keys are replaced.
    pub fn build(&self) -> Result<RequestUrl> {
        validate_action(self.action)?;
        validate_scheme(self.target_scheme)?;
        if !self.response_types.is_empty() {
            let own = self
                .callback_scheme
                .ok_or(XCallbackError::CallbackSchemeNotDefined)?;
            validate_scheme(own)?;
        }

        let mut protocol: Vec<(&str, String)> = Vec::new();
        if let Some(own) = self.callback_scheme {
            for rt in [ResponseType::Success, ResponseType::Error, ResponseType::Cancel] {
                if self.response_types.contains(&rt) {
                    protocol.push((
                        rt.callback_key(),
                        callback_url(own, self.action, rt, self.request_id),
                    ));
                }
            }
        }
        if let Some(source) = self.source {
            protocol.push((KEY_SOURCE, source.to_string()));
        }

        let reserved = [KEY_SUCCESS, KEY_ERROR, KEY_CANCEL, KEY_SOURCE];
        let pairs = self
            .params
            .iter()
            .filter(|(k, _)| !reserved.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(protocol.iter().map(|(k, v)| (*k, v.as_str())));
        let query = query::encode_pairs(pairs);

        let raw = if query.is_empty() {
            format!("{}://{}", self.target_scheme, self.action)
        } else {
            format!("{}://{}?{query}", self.target_scheme, self.action)
        };
        let url = Url::parse(&raw).map_err(|source| XCallbackError::RequestUrlConstructionFailed {
            url: raw.clone(),
            source,
        })?;
        // The parser normalizes some paths; what it kept must be what we meant.
        if action_of(&url) != self.action {
            return Err(XCallbackError::InvalidAction(self.action.to_string()));
        }

        Ok(RequestUrl {
            url,
            request_id: self.request_id.to_string(),
            action: self.action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn spec<'a>(
        params: &'a Parameters,
        response_types: &'a [ResponseType],
        callback_scheme: Option<&'a str>,
    ) -> RequestSpec<'a> {
        RequestSpec {
            action: "auth",
            target_scheme: "target",
            params,
            request_id: "req-1",
            response_types,
            callback_scheme,
            source: Some("Me App"),
        }
    }

    #[test]
    fn scheme_validation() {
        for ok in ["target", "x-app", "com.example.app", "a+b"] {
            validate_scheme(ok).unwrap_or_else(|_| panic!("expected valid: {ok}"));
        }
        for bad in ["", "1app", "has space", "a/b", "a:b"] {
            assert!(validate_scheme(bad).is_err(), "expected invalid: {bad}");
        }
    }

    #[test]
    fn callback_url_shape() {
        assert_eq!(
            callback_url("me", "auth", ResponseType::Success, "abc"),
            "me://x-callback-url/auth/success?x-requestID=abc"
        );
    }

    #[test]
    fn builds_documented_wire_format() {
        let p = params(&[("user", "a b")]);
        let url = spec(&p, &[ResponseType::Success], Some("me")).build().unwrap();
        assert_eq!(
            url.as_str(),
            "target://auth?user=a%20b\
             &x-success=me%3A%2F%2Fx-callback-url%2Fauth%2Fsuccess%3Fx-requestID%3Dreq-1\
             &x-source=Me%20App"
        );
        assert_eq!(url.request_id(), "req-1");
        assert_eq!(url.action(), "auth");
        assert_eq!(url.scheme(), "target");
    }

    #[test]
    fn omits_unrequested_callback_slots() {
        let p = Parameters::new();
        let url = spec(&p, &[ResponseType::Error, ResponseType::Cancel], Some("me"))
            .build()
            .unwrap();
        let q = url.params();
        assert!(!q.contains_key("x-success"));
        assert_eq!(
            q.get("x-error").map(String::as_str),
            Some("me://x-callback-url/auth/error?x-requestID=req-1")
        );
        assert_eq!(
            q.get("x-cancel").map(String::as_str),
            Some("me://x-callback-url/auth/cancel?x-requestID=req-1")
        );
    }

    #[test]
    fn callbacks_without_own_scheme_fail() {
        let p = Parameters::new();
        let err = spec(&p, &[ResponseType::Success], None).build().unwrap_err();
        assert!(matches!(err, XCallbackError::CallbackSchemeNotDefined));
    }

    #[test]
    fn fire_and_forget_needs_no_own_scheme() {
        let p = Parameters::new();
        let mut s = spec(&p, &[], None);
        s.source = None;
        assert_eq!(s.build().unwrap().as_str(), "target://auth");
    }

    #[test]
    fn caller_cannot_spoof_protocol_keys() {
        let p = params(&[("x-success", "evil://steal"), ("x-source", "Evil")]);
        let url = spec(&p, &[ResponseType::Success], Some("me")).build().unwrap();
        let q = url.params();
        assert_eq!(q.get("x-source").map(String::as_str), Some("Me App"));
        assert!(q["x-success"].starts_with("me://"));
    }

    #[test]
    fn rejects_empty_action_and_bad_scheme() {
        let p = Parameters::new();
        let mut s = spec(&p, &[], None);
        s.action = "";
        assert!(matches!(s.build(), Err(XCallbackError::InvalidAction(_))));

        let mut s = spec(&p, &[], None);
        s.target_scheme = "not a scheme";
        assert!(matches!(s.build(), Err(XCallbackError::InvalidScheme(_))));
    }

    #[test]
    fn unparseable_action_is_construction_failure() {
        let p = Parameters::new();
        let mut s = spec(&p, &[], None);
        s.action = "a<b";
        assert!(matches!(
            s.build(),
            Err(XCallbackError::RequestUrlConstructionFailed { .. })
        ));
    }

    #[test]
    fn rejects_action_carrying_url_delimiters() {
        let p = Parameters::new();
        for action in [
            "find?q",
            "a#b",
            "50%",
            "has space",
            "user@host",
            "a:b",
            "tab\there",
            "/auth",
            "notes/",
            "a//b",
        ] {
            let mut s = spec(&p, &[ResponseType::Success], Some("me"));
            s.action = action;
            assert!(
                matches!(s.build(), Err(XCallbackError::InvalidAction(_))),
                "{action} accepted"
            );
        }
    }

    #[test]
    fn rejects_action_the_parser_would_rewrite() {
        let p = Parameters::new();
        for action in ["a/../b", "a/./b", "a/b<c"] {
            let mut s = spec(&p, &[], None);
            s.action = action;
            assert!(
                matches!(s.build(), Err(XCallbackError::InvalidAction(_))),
                "{action} accepted"
            );
        }
    }

    #[test]
    fn action_with_path_survives_intact() {
        let p = Parameters::new();
        let mut s = spec(&p, &[], None);
        s.action = "notes/create";
        let url = s.build().unwrap();
        assert_eq!(url.url().host_str(), Some("notes"));
        assert_eq!(url.url().path(), "/create");
    }

    #[test]
    fn invalid_own_scheme_fails_when_callbacks_requested() {
        let p = Parameters::new();
        let err = spec(&p, &[ResponseType::Success], Some("my app"))
            .build()
            .unwrap_err();
        assert!(matches!(err, XCallbackError::InvalidScheme(s) if s == "my app"));

        // Unused when nothing comes back.
        assert!(spec(&p, &[], Some("my app")).build().is_ok());
    }
}
