//! Captured-request records and their degraded fallback form.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::parser::{self, ParsedRequest};

/// Identity and provenance shared by both record forms.
///
/// The sequence number orders the request globally; the request id is a
/// fresh UUID independent of it. Together they name the storage leaf.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub sequence: u64,
    pub request_id: Uuid,
    pub captured_at: DateTime<Local>,
    pub peer: SocketAddr,
}

impl CaptureContext {
    pub fn new(sequence: u64, peer: SocketAddr) -> Self {
        Self {
            sequence,
            request_id: Uuid::new_v4(),
            captured_at: Local::now(),
            peer,
        }
    }

    /// Storage leaf name, unique for the lifetime of a db root.
    pub fn dir_name(&self) -> String {
        format!("{}:{}", self.sequence, self.request_id)
    }
}

/// Fully structured record of one inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub sequence: u64,
    pub request_id: Uuid,
    pub timestamp: String,
    pub client_address: String,
    pub client_port: u16,
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub query_params: BTreeMap<String, Vec<String>>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_json: Option<serde_json::Value>,
}

impl CapturedRequest {
    pub fn from_parsed(ctx: &CaptureContext, parsed: ParsedRequest) -> Self {
        Self {
            sequence: ctx.sequence,
            request_id: ctx.request_id,
            timestamp: ctx.captured_at.to_rfc3339(),
            client_address: ctx.peer.ip().to_string(),
            client_port: ctx.peer.port(),
            method: parsed.method,
            path: parsed.path,
            version: parsed.version,
            headers: parsed.headers,
            query_params: parsed.query_params,
            body: parsed.body,
            body_json: parsed.body_json,
        }
    }

    /// Build a record from fields an already-framed listener provides.
    ///
    /// Entry point for listeners that delegate request parsing to a
    /// framework and only hand over method, target, headers, body bytes,
    /// and the client address.
    pub fn from_parts(
        ctx: &CaptureContext,
        method: &str,
        target: &str,
        headers: Vec<(String, String)>,
        body: &[u8],
    ) -> Self {
        let (path, query_params) = parser::split_query(target);
        let body = String::from_utf8_lossy(body).into_owned();
        let body_json = if body.is_empty() {
            None
        } else {
            serde_json::from_str(&body).ok()
        };
        Self {
            sequence: ctx.sequence,
            request_id: ctx.request_id,
            timestamp: ctx.captured_at.to_rfc3339(),
            client_address: ctx.peer.ip().to_string(),
            client_port: ctx.peer.port(),
            method: method.to_string(),
            path,
            version: parser::DEFAULT_VERSION.to_string(),
            headers,
            query_params,
            body,
            body_json,
        }
    }
}

/// Metadata-only record written when parsing fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub sequence: u64,
    pub request_id: Uuid,
    pub timestamp: String,
    pub client_address: String,
    pub client_port: u16,
    pub raw_len: usize,
    pub error: String,
}

impl FallbackRecord {
    pub fn new(ctx: &CaptureContext, raw_len: usize, error: String) -> Self {
        Self {
            sequence: ctx.sequence,
            request_id: ctx.request_id,
            timestamp: ctx.captured_at.to_rfc3339(),
            client_address: ctx.peer.ip().to_string(),
            client_port: ctx.peer.port(),
            raw_len,
            error,
        }
    }
}

/// What the pipeline hands to the storage writer.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Parsed(CapturedRequest),
    Fallback(FallbackRecord),
}
