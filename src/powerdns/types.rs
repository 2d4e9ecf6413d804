//! Wire types for the PowerDNS Authoritative HTTP API, mirrored field-for-
//! field from the upstream OpenAPI spec (server, zones, rrsets).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde_with::skip_serializing_none]
pub struct Server {
    #[serde(rename = "type")]
    pub type_field: String,
    pub id: String,
    pub daemon_type: String,
    pub version: String,
    pub url: String,
    pub config_url: String,
    pub zones_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ZoneKind {
    Native,
    Master,
    Slave,
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde_with::skip_serializing_none]
pub struct Zone {
    #[serde(rename = "type")]
    pub type_field: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub kind: Option<ZoneKind>,
    #[serde(default)]
    pub rrsets: Option<Vec<RRSet>>,
    pub serial: Option<i64>,
    pub notified_serial: Option<i64>,
    pub edited_serial: Option<i64>,
    #[serde(default)]
    pub masters: Option<Vec<String>>,
    pub dnssec: Option<bool>,
    pub nsec3param: Option<String>,
    pub nsec3narrow: Option<bool>,
    pub presigned: Option<bool>,
    pub soa_edit: Option<String>,
    pub soa_edit_api: Option<String>,
    pub api_rectify: Option<bool>,
    pub zone: Option<String>,
    pub account: Option<String>,
    #[serde(default)]
    pub nameservers: Option<Vec<String>>,
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Body for `POST /servers/{id}/zones`.
#[derive(Debug, Clone, Serialize)]
#[serde_with::skip_serializing_none]
pub struct CreateZone {
    pub name: String,
    pub kind: ZoneKind,
    pub nameservers: Vec<String>,
    pub dnssec: bool,
    pub soa_edit_api: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

/// Body for `PATCH /servers/{id}/zones/{name}` (scalar attribute change).
#[derive(Debug, Clone, Default, Serialize)]
#[serde_with::skip_serializing_none]
pub struct PatchZoneAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ZoneKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soa_edit_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
}

/// Body for `PATCH /servers/{id}/zones/{name}` when upserting rrsets.
#[derive(Debug, Clone, Serialize)]
pub struct PatchRRsets {
    pub rrsets: Vec<RRSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    #[serde(rename = "REPLACE")]
    Replace,
    #[serde(rename = "DELETE")]
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde_with::skip_serializing_none]
pub struct RRSet {
    pub name: String,
    #[serde(rename = "type")]
    pub type_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changetype: Option<ChangeType>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub content: String,
    #[serde(default)]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub content: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub modified_at: Option<i64>,
}
