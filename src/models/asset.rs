//! Asset model
//!
//! `RawAsset` is what an extractor prints; `AssetRecord` is what survives
//! validation and is sent to the dashboard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vulnerability reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CveRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Platform (CPE) reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpeRef {
    pub cpe_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One observed device, validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub protocol: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default)]
    pub cves: Vec<CveRef>,
    #[serde(default)]
    pub cpes: Vec<CpeRef>,
}

/// Document an extractor writes to stdout.
///
/// Records stay untyped here so one bad record cannot sink its siblings.
#[derive(Debug, Deserialize)]
pub struct ExtractorOutput {
    pub assets: Vec<serde_json::Value>,
}

/// Asset as emitted by an extractor, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAsset {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub cves: Option<Vec<RawCve>>,
    #[serde(default)]
    pub cpes: Option<Vec<RawCpe>>,
}

/// Lookup failures arrive as `{ "error": ... }` entries with no id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCve {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCpe {
    #[serde(default)]
    pub cpe_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Record-level rejection; the record is dropped, the extractor is not failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("asset has no protocol")]
    MissingProtocol,

    #[error("{protocol} asset has no address")]
    MissingAddress { protocol: String },

    #[error("asset does not decode: {0}")]
    Undecodable(String),
}

/// Protocol tag of a record that has not been decoded yet
pub fn protocol_tag_of(value: &serde_json::Value) -> Option<&str> {
    value
        .get("protocol")
        .and_then(serde_json::Value::as_str)
        .filter(|p| !p.trim().is_empty())
}

impl RawAsset {
    /// Decode one emitted record
    pub fn decode(value: serde_json::Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|e| RecordError::Undecodable(e.to_string()))
    }

    /// Protocol tag, if the record carries a usable one
    pub fn protocol_tag(&self) -> Option<&str> {
        self.protocol
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }

    /// Validate into an `AssetRecord`
    pub fn into_record(self) -> Result<AssetRecord, RecordError> {
        let protocol = match self.protocol_tag() {
            Some(p) => p.to_string(),
            None => return Err(RecordError::MissingProtocol),
        };

        let ip = match present(self.ip) {
            Some(ip) => ip,
            None => return Err(RecordError::MissingAddress { protocol }),
        };

        let cves = self
            .cves
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| match present(c.id) {
                Some(id) => Some(CveRef { id, description: present(c.description) }),
                None => {
                    tracing::debug!("Dropping CVE entry without id on {}", ip);
                    None
                }
            })
            .collect();

        let cpes = self
            .cpes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| match present(c.cpe_name) {
                Some(cpe_name) => Some(CpeRef { cpe_name, title: present(c.title) }),
                None => {
                    tracing::debug!("Dropping CPE entry without name on {}", ip);
                    None
                }
            })
            .collect();

        Ok(AssetRecord {
            protocol,
            ip,
            mac: present(self.mac),
            vendor: present(self.vendor),
            role: present(self.role),
            device: present(self.device),
            cves,
            cpes,
        })
    }
}

/// Blank strings mean "not determined"
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
