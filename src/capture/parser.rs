//! Structured-field reconstruction from a raw request frame.
//!
//! # Responsibilities
//! - Recover method, path, version, headers, query parameters, and body
//!   from one captured frame
//! - Never reject a frame for being short or sloppy: missing request-line
//!   tokens get defaults, separator-less header lines are skipped
//! - Surface only genuinely unstructurable input (a binary head) as an
//!   error, so the pipeline can fall back to a metadata-only record
//!
//! # Design Decisions
//! - Headers are an ordered pair list: duplicate keys accumulate, nothing
//!   is silently overwritten
//! - Query parameters always map to a list of values; repeated keys append
//! - A JSON body is additionally decoded; decode failure is swallowed

use std::collections::BTreeMap;

use crate::capture::frame::find_terminator;

pub const DEFAULT_METHOD: &str = "UNKNOWN";
pub const DEFAULT_PATH: &str = "/";
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

/// Why a frame could not be structured.
#[derive(Debug)]
pub enum ParseError {
    /// The request head is not valid UTF-8 (e.g. a TLS handshake or other
    /// binary probe hitting the listener).
    BinaryHead,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BinaryHead => write!(f, "request head is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Structured fields recovered from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    /// Ordered header list; keys are not unique.
    pub headers: Vec<(String, String)>,
    /// Query parameters; a repeated key accumulates values.
    pub query_params: BTreeMap<String, Vec<String>>,
    pub body: String,
    /// Present when the body decodes as JSON.
    pub body_json: Option<serde_json::Value>,
}

impl ParsedRequest {
    /// First value recorded for a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse one raw frame into structured fields.
pub fn parse(raw: &[u8]) -> Result<ParsedRequest, ParseError> {
    let (head, body_bytes) = match find_terminator(raw) {
        Some(end) => (&raw[..end], &raw[end + 4..]),
        None => (raw, &[][..]),
    };
    let head = std::str::from_utf8(head).map_err(|_| ParseError::BinaryHead)?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut tokens = request_line.split_whitespace();
    let method = tokens.next().unwrap_or(DEFAULT_METHOD).to_string();
    let target = tokens.next().unwrap_or(DEFAULT_PATH);
    let version = tokens.next().unwrap_or(DEFAULT_VERSION).to_string();

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        // Lines without a separator are ignored rather than rejected.
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        headers.push((key.to_string(), value.trim().to_string()));
    }

    let (path, query_params) = split_query(target);

    let body = String::from_utf8_lossy(body_bytes).into_owned();
    let body_json = if body.is_empty() {
        None
    } else {
        serde_json::from_str(&body).ok()
    };

    Ok(ParsedRequest {
        method,
        path,
        version,
        headers,
        query_params,
        body,
        body_json,
    })
}

/// Split a request target into its base path and accumulated query map.
pub fn split_query(target: &str) -> (String, BTreeMap<String, Vec<String>>) {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(query) = query {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.entry(key.to_string()).or_default().push(value.to_string());
        }
    }
    (path.to_string(), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_query_keys_accumulate() {
        let parsed = parse(b"GET /x?a=1&a=2&b=3 HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.path, "/x");
        assert_eq!(parsed.query_params["a"], vec!["1", "2"]);
        assert_eq!(parsed.query_params["b"], vec!["3"]);
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn empty_input_gets_defaults() {
        let parsed = parse(b"").unwrap();
        assert_eq!(parsed.method, "UNKNOWN");
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.version, "HTTP/1.1");
        assert!(parsed.headers.is_empty());
        assert!(parsed.query_params.is_empty());
    }

    #[test]
    fn short_request_line_gets_defaults() {
        let parsed = parse(b"GET\r\n\r\n").unwrap();
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.version, "HTTP/1.1");
    }

    #[test]
    fn duplicate_headers_are_kept_in_order() {
        let parsed =
            parse(b"GET / HTTP/1.1\r\nX-Tag: one\r\nX-Tag: two\r\nnonsense line\r\n\r\n").unwrap();
        assert_eq!(
            parsed.headers,
            vec![
                ("X-Tag".to_string(), "one".to_string()),
                ("X-Tag".to_string(), "two".to_string()),
            ]
        );
        assert_eq!(parsed.header("x-tag"), Some("one"));
    }

    #[test]
    fn binary_head_is_an_error() {
        let err = parse(&[0x16, 0x03, 0x01, 0x02, 0x00, 0xff, 0xfe]).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn json_body_is_decoded() {
        let parsed =
            parse(b"POST /ingest HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"a\": [1, 2]}").unwrap();
        assert_eq!(parsed.body, "{\"a\": [1, 2]}");
        assert_eq!(parsed.body_json, Some(serde_json::json!({"a": [1, 2]})));
    }

    #[test]
    fn non_json_body_is_kept_raw() {
        let parsed = parse(b"POST / HTTP/1.1\r\n\r\nplain text").unwrap();
        assert_eq!(parsed.body, "plain text");
        assert!(parsed.body_json.is_none());
    }

    #[test]
    fn binary_body_with_text_head_still_parses() {
        let mut raw = b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.method, "POST");
        assert!(!parsed.body.is_empty());
    }
}
