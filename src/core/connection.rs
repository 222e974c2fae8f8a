//! Connection data model: raw snapshot records, derived rows, and the two
//! route buckets they fold into.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::PROXY_HOP;

/// One connection as reported by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConnectionRecord {
    /// Stable for the connection's lifetime; the only join key across snapshots.
    pub id: String,
    /// Hop names the traffic traverses, in order.
    #[serde(default)]
    pub chains: Vec<String>,
    /// Cumulative bytes sent. `None` when the wire value is missing or not numeric.
    #[serde(default, deserialize_with = "lenient_counter")]
    pub upload: Option<u64>,
    /// Cumulative bytes received. `None` when the wire value is missing or not numeric.
    #[serde(default, deserialize_with = "lenient_counter")]
    pub download: Option<u64>,
    /// Everything else on the record, passed through unchanged.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Field names written by [`DerivedConnection`] next to the flattened record.
const DERIVED_FIELDS: [&str; 3] = ["uploadSpeed", "downloadSpeed", "preserve"];

impl RawConnectionRecord {
    /// Drop metadata keys that would shadow the derived fields on output.
    pub fn strip_derived_fields(&mut self) {
        for key in DERIVED_FIELDS {
            if self.metadata.remove(key).is_some() {
                tracing::debug!("Dropping upstream {key:?} on connection {}", self.id);
            }
        }
    }
}

/// A raw record enriched with per-interval speed and its bucket tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedConnection {
    #[serde(flatten)]
    pub record: RawConnectionRecord,
    /// Bytes sent since the previous snapshot.
    pub upload_speed: u64,
    /// Bytes received since the previous snapshot.
    pub download_speed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve: Option<Bucket>,
}

impl DerivedConnection {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Combined upload + download speed, used for ranking.
    pub fn total_speed(&self) -> u64 {
        self.upload_speed.saturating_add(self.download_speed)
    }
}

/// One periodic report from the upstream feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    /// Absent on keep-alive style messages; such messages are a no-op.
    #[serde(default)]
    pub connections: Option<Vec<RawConnectionRecord>>,
    /// Process-wide cumulative totals, passed through to the published views.
    /// Values that are not valid counters read as 0.
    #[serde(default, deserialize_with = "lenient_total")]
    pub upload_total: u64,
    #[serde(default, deserialize_with = "lenient_total")]
    pub download_total: u64,
}

/// Route class a connection is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    Proxy,
    Direct,
}

impl Bucket {
    /// A chain containing the literal [`PROXY_HOP`] is proxied; anything else is direct.
    pub fn classify(chains: &[String]) -> Self {
        if chains.iter().any(|hop| hop == PROXY_HOP) {
            Bucket::Proxy
        } else {
            Bucket::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Proxy => "Proxy",
            Bucket::Direct => "Direct",
        }
    }
}

/// Aggregate row for one bucket. Never destroyed once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualConnection {
    pub bucket: Bucket,
    /// Running total carried forward across snapshots.
    pub upload: u64,
    pub download: u64,
    /// Sum of the current members' speed.
    pub upload_speed: u64,
    pub download_speed: u64,
}

impl VirtualConnection {
    pub fn empty(bucket: Bucket) -> Self {
        Self {
            bucket,
            upload: 0,
            download: 0,
            upload_speed: 0,
            download_speed: 0,
        }
    }
}

/// Bucket rows keyed by bucket; holds a key only once that bucket has seen traffic.
pub type VirtualConnections = BTreeMap<Bucket, VirtualConnection>;

/// Immutable bundle handed to readers after each published recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionViews {
    pub active: Vec<DerivedConnection>,
    /// Most recent closures, oldest first.
    pub closed: Vec<DerivedConnection>,
    pub virtual_connections: VirtualConnections,
    pub upload_total: u64,
    pub download_total: u64,
}

/// Accept integers and finite non-negative floats; anything else is "no baseline".
fn lenient_counter<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(counter_from_value))
}

fn lenient_total<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_counter(deserializer)?.unwrap_or_default())
}

fn counter_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}
