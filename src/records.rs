//! Telemetry record types and payload decoding
//!
//! Records arrive from the broker as JSON. A payload may hold a single
//! record, an array of records, or an envelope object whose record-key field
//! carries the array (either inline or as a JSON-encoded string).

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{PipelineError, PipelineResult};

/// Entity key of a tracked object
pub type CatalogNumber = String;

/// Earth-centered position vector reported by the producer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A single decoded telemetry record
///
/// Immutable once decoded. Fields the pipeline does not interpret are kept in
/// `extra` so the entity's full record matches what the producer sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    #[serde(default, deserialize_with = "de_catalog_number")]
    pub catalog_number: Option<CatalogNumber>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tle: Option<Vec<String>>,
    #[serde(default)]
    pub intl_designator: Option<String>,
    #[serde(default)]
    pub orbital_period: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub rcs_size: Option<String>,
    #[serde(default)]
    pub revolutions_at_epoch: Option<i64>,
    #[serde(default)]
    pub launch_site_code: Option<String>,
    #[serde(default)]
    pub file: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TelemetryRecord {
    /// A record carrying no fields at all
    pub fn is_empty(&self) -> bool {
        self == &TelemetryRecord::default()
    }

    /// The entity key, if the record carries one
    pub fn key(&self) -> Option<&str> {
        self.catalog_number.as_deref()
    }
}

/// Accepts the catalog number as either a string or an integer
fn de_catalog_number<'de, D>(deserializer: D) -> Result<Option<CatalogNumber>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "catalogNumber must be a string or an integer, got {other}"
        ))),
    }
}

/// A single point of an entity's ground track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub timestamp_millis: i64,
    pub lat: f64,
    pub lng: f64,
}

/// Condensed projection of an entity, forwarded to the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub catalog_number: CatalogNumber,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub country_code: Option<String>,
    pub intl_designator: Option<String>,
    pub orbital_period: Option<f64>,
    pub tle: Option<Vec<String>>,
    pub position: Option<Position>,
    pub height: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rcs_size: Option<String>,
    pub revolutions_at_epoch: Option<i64>,
    pub launch_site_code: Option<String>,
    pub file: Option<i64>,
}

impl EntitySummary {
    pub fn from_record(catalog_number: CatalogNumber, record: &TelemetryRecord) -> Self {
        Self {
            catalog_number,
            name: record.name.clone(),
            object_type: record.object_type.clone(),
            country_code: record.country_code.clone(),
            intl_designator: record.intl_designator.clone(),
            orbital_period: record.orbital_period,
            tle: record.tle.clone(),
            position: record.position,
            height: record.height,
            latitude: record.latitude,
            longitude: record.longitude,
            rcs_size: record.rcs_size.clone(),
            revolutions_at_epoch: record.revolutions_at_epoch,
            launch_site_code: record.launch_site_code.clone(),
            file: record.file,
        }
    }
}

/// Outcome of decoding one raw broker payload
#[derive(Debug, Default)]
pub struct DecodedPayload {
    /// Records that decoded cleanly, in payload order
    pub records: Vec<TelemetryRecord>,

    /// Items of the payload that could not be decoded
    pub rejected: Vec<PipelineError>,
}

/// Decode a raw broker payload into telemetry records
///
/// Fails as a whole only when the payload is not JSON or has the wrong shape.
/// Individual array items that fail to decode are reported in `rejected`.
pub fn decode_payload(raw: &[u8], record_key: Option<&str>) -> PipelineResult<DecodedPayload> {
    let value: Value = serde_json::from_slice(raw)?;
    let value = unwrap_envelope(value, record_key)?;

    let mut decoded = DecodedPayload::default();

    match value {
        Value::Array(items) => {
            for item in items {
                match serde_json::from_value::<TelemetryRecord>(item) {
                    Ok(record) => decoded.records.push(record),
                    Err(e) => {
                        warn!("dropping undecodable record: {e}");
                        decoded.rejected.push(e.into());
                    }
                }
            }
        }
        Value::Object(record) => decoded
            .records
            .push(serde_json::from_value(Value::Object(record))?),
        other => {
            return Err(PipelineError::MalformedRecord(format!(
                "expected a record or a list of records, got {}",
                json_kind(&other)
            )));
        }
    }

    trace!(
        "decoded {} records ({} rejected)",
        decoded.records.len(),
        decoded.rejected.len()
    );

    Ok(decoded)
}

fn unwrap_envelope(value: Value, record_key: Option<&str>) -> PipelineResult<Value> {
    let Some(key) = record_key else {
        return Ok(value);
    };

    match value {
        Value::Object(mut envelope) if envelope.contains_key(key) => {
            match envelope.remove(key).unwrap_or(Value::Null) {
                Value::String(encoded) => Ok(serde_json::from_str(&encoded)?),
                Value::Null => Err(PipelineError::MalformedRecord(format!(
                    "envelope field '{key}' is null"
                ))),
                inline => Ok(inline),
            }
        }
        other => Ok(other),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
