//! KV Wire Protocol
//!
//! The JSON reply shape shared by every endpoint, the replica-to-replica
//! transmit body, the client form bodies, and the payload cleaning applied at
//! the router boundary.

use serde::{Deserialize, Serialize};

use super::types::Version;

/// Union-shaped JSON reply for every endpoint. Absent fields are omitted
/// from the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MethodReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "isExists", skip_serializing_if = "Option::is_none")]
    pub is_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<String>,
    #[serde(rename = "Count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Reserved; populated as zero on search hits and otherwise omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<u32>,
}

/// Body replicas exchange when fanning out a client mutation. Deletes carry
/// only the payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaTransmit {
    #[serde(rename = "val", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Version>,
    #[serde(default)]
    pub payload: String,
}

/// Form body of client reads and deletes.
#[derive(Debug, Default, Deserialize)]
pub struct PayloadForm {
    #[serde(default)]
    pub payload: String,
}

/// Form body of client writes.
#[derive(Debug, Default, Deserialize)]
pub struct PutForm {
    #[serde(default)]
    pub val: String,
    #[serde(default)]
    pub payload: String,
}

/// Strips the quoting some client libraries wrap the payload field in: one
/// leading and one trailing double quote, then every `\"` becomes `"`.
///
/// Applied to client-sourced form payloads only; peer bodies are structured
/// JSON and never pass through here.
pub fn clean_payload(payload: &str) -> String {
    if payload.len() < 2 {
        return payload.to_string();
    }

    let mut cleaned = payload;
    if cleaned.starts_with('"') {
        cleaned = &cleaned[1..];
    }
    if cleaned.ends_with('"') {
        cleaned = &cleaned[..cleaned.len() - 1];
    }

    cleaned.replace("\\\"", "\"")
}
