//! Typed reply payloads.
//!
//! Tile38 answers every command (with `OUTPUT json`) with a JSON object that
//! carries `ok`, optionally `err`, and a command-specific body. The body is
//! validated here, at the transport boundary, into a `QueryResult`.

use serde::Deserialize;
use serde_json::Value;

use super::TransportError;

/// Which body shape a command answers with.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResultKind {
    Keys,
    Stats,
    Objects,
    Ack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Key names, in server order.
    Keys(Vec<String>),
    /// First stats record; `None` when the key matched nothing.
    Stats(Option<StatsRecord>),
    Objects(Vec<ObjectRecord>),
    /// Acknowledgement of a mutating command.
    Ack { elapsed: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatsRecord {
    #[serde(default)]
    pub in_memory_size: Option<u64>,
    #[serde(default)]
    pub num_objects: Option<u64>,
    #[serde(default)]
    pub num_points: Option<u64>,
    #[serde(default)]
    pub num_strings: Option<u64>,
}

/// An object id plus its point position `(lon, lat)` when it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub id: String,
    pub point: Option<(f64, f64)>,
}

/// Fields every reply carries.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub err: Option<String>,
    #[serde(default)]
    pub elapsed: Option<String>,
}

#[derive(Deserialize)]
struct KeysBody {
    #[serde(default)]
    keys: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct StatsBody {
    #[serde(default)]
    stats: Option<Vec<Option<StatsRecord>>>,
}

#[derive(Deserialize)]
struct ObjectsBody {
    #[serde(default)]
    objects: Option<Vec<RawObject>>,
}

#[derive(Deserialize)]
struct RawObject {
    id: String,
    #[serde(default)]
    object: Value,
}

impl QueryResult {
    /// Validate `raw` as a reply of the given kind.
    pub fn parse(kind: ResultKind, raw: &str) -> Result<Self, TransportError> {
        let envelope = check_envelope(raw)?;
        let result = match kind {
            ResultKind::Keys => {
                QueryResult::Keys(serde_json::from_str::<KeysBody>(raw)?.keys.unwrap_or_default())
            }
            ResultKind::Stats => {
                let stats = serde_json::from_str::<StatsBody>(raw)?.stats;
                QueryResult::Stats(stats.and_then(|s| s.into_iter().next().flatten()))
            }
            ResultKind::Objects => {
                let objects = serde_json::from_str::<ObjectsBody>(raw)?
                    .objects
                    .unwrap_or_default()
                    .into_iter()
                    .map(|o| ObjectRecord {
                        point: point_of(&o.object),
                        id: o.id,
                    })
                    .collect();
                QueryResult::Objects(objects)
            }
            ResultKind::Ack => QueryResult::Ack {
                elapsed: envelope.elapsed,
            },
        };
        Ok(result)
    }

    /// No keys, no objects, or no stats.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::Keys(k) => k.is_empty(),
            QueryResult::Stats(s) => s.is_none(),
            QueryResult::Objects(o) => o.is_empty(),
            QueryResult::Ack { .. } => false,
        }
    }
}

/// Reject replies with `"ok": false`, surfacing the server's `err` text.
pub fn check_envelope(raw: &str) -> Result<Envelope, TransportError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if !envelope.ok {
        let msg = envelope
            .err
            .clone()
            .unwrap_or_else(|| "server reported failure".to_string());
        return Err(TransportError::Server(msg));
    }
    Ok(envelope)
}

/// GeoJSON point coordinates (`[lon, lat, ...]`); anything else has no point.
fn point_of(object: &Value) -> Option<(f64, f64)> {
    let coords = object.get("coordinates")?.as_array()?;
    match coords.as_slice() {
        [lon, lat, ..] => Some((lon.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}
