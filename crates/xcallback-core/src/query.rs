//! Query string codec for [`Parameters`].
//!
//! Keys and values are percent-encoded with everything except ASCII
//! alphanumerics and `-._~` escaped, so a callback URL nested inside another
//! URL's query survives intact. Decoding is lenient: pairs that cannot be
//! decoded are skipped rather than reported.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::Parameters;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT).to_string()
}

/// Encode `params` as `k1=v1&k2=v2`. Empty input yields an empty string.
pub fn encode(params: &Parameters) -> String {
    encode_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Encode pairs in the order given.
pub fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a query string (with or without the leading `?`).
///
/// Splits on `&`, then on the first `=`. A pair without `=` decodes to an empty
/// value. Pairs with an empty key or invalid UTF-8 after decoding are skipped.
/// Repeated keys keep the last value.
pub fn decode(query: &str) -> Parameters {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = Parameters::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let Ok(key) = percent_decode_str(raw_key).decode_utf8() else {
            continue;
        };
        let Ok(value) = percent_decode_str(raw_value).decode_utf8() else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        params.insert(key.into_owned(), value.into_owned());
    }
    params
}

/// Append `params` to the query of `url`, keeping any query already present.
///
/// A fragment, if any, stays at the end.
pub fn append_to_url(url: &str, params: &Parameters) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let sep = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    let mut out = format!("{base}{sep}{}", encode(params));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
