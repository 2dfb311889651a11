//! Decoding recorded activities (FIT, GPX, Strava stream JSON) into [`Streams`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::source::Streams;
use crate::split::Seconds;
use crate::SplitError;

/// Streams plus whatever metadata the file carried.
#[derive(Clone, Debug, Default)]
pub struct ParsedActivity {
    pub streams: Streams,
    pub reported_total_distance: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub sport: Option<String>,
}

impl ParsedActivity {
    /// Reported total if the file had one, otherwise the last stream sample.
    pub fn total_distance(&self) -> f64 {
        self.reported_total_distance
            .or_else(|| self.streams.final_distance())
            .unwrap_or(0.0)
    }
}

/// Parse an activity using the provided format hint (extension or file name).
pub fn parse_activity(input: &[u8], format: &str) -> Result<ParsedActivity, SplitError> {
    let format_lc = format.to_ascii_lowercase();
    if format_lc.ends_with("fit") {
        parse_fit(input)
    } else if format_lc.ends_with("gpx") {
        parse_gpx(input)
    } else if format_lc.ends_with("json") {
        parse_stream_json(input)
    } else {
        Err(SplitError::UnsupportedFormat(format.to_string()))
    }
}

fn parse_fit(input: &[u8]) -> Result<ParsedActivity, SplitError> {
    use fitparser::de::from_bytes;
    use fitparser::profile::MesgNum;

    let records = from_bytes(input).map_err(|e| SplitError::FitParse(e.to_string()))?;
    let mut parsed = ParsedActivity::default();
    let mut t0: Option<DateTime<Utc>> = None;

    for record in records {
        match record.kind() {
            MesgNum::Record => {
                let mut timestamp: Option<DateTime<Utc>> = None;
                let mut distance: Option<f64> = None;
                for field in record.fields() {
                    match field.name() {
                        "timestamp" => {
                            if let fitparser::Value::Timestamp(ts) = field.value() {
                                timestamp = Some(ts.with_timezone(&Utc));
                            }
                        }
                        "distance" | "enhanced_distance" => {
                            if let Some(val) = fit_value_to_f64(field.value()) {
                                distance = Some(val);
                            }
                        }
                        _ => {}
                    }
                }
                // Samples without both channels cannot be placed on the curve.
                if let (Some(ts), Some(dist)) = (timestamp, distance) {
                    let base = *t0.get_or_insert(ts);
                    parsed.streams.time.push((ts - base).num_seconds());
                    parsed.streams.distance.push(dist);
                }
            }
            MesgNum::Session => {
                for field in record.fields() {
                    match field.name() {
                        "total_distance" => {
                            parsed.reported_total_distance = fit_value_to_f64(field.value());
                        }
                        "sport" => {
                            if let fitparser::Value::String(sport) = field.value() {
                                parsed.sport = Some(sport.clone());
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    parsed.start_time = t0;
    Ok(parsed)
}

fn fit_value_to_f64(value: &fitparser::Value) -> Option<f64> {
    match value {
        fitparser::Value::Float32(v) => Some(*v as f64),
        fitparser::Value::Float64(v) => Some(*v),
        fitparser::Value::UInt16(v) => Some(*v as f64),
        fitparser::Value::UInt32(v) => Some(*v as f64),
        fitparser::Value::UInt64(v) => Some(*v as f64),
        fitparser::Value::SInt32(v) => Some(*v as f64),
        fitparser::Value::SInt64(v) => Some(*v as f64),
        fitparser::Value::UInt32z(v) => Some(*v as f64),
        fitparser::Value::Array(values) => values.iter().find_map(fit_value_to_f64),
        _ => None,
    }
}

fn parse_gpx(input: &[u8]) -> Result<ParsedActivity, SplitError> {
    use gpx::read;
    use std::io::Cursor;

    let gpx = read(Cursor::new(input)).map_err(|e| SplitError::GpxParse(e.to_string()))?;
    let mut parsed = ParsedActivity::default();
    let mut base: Option<DateTime<Utc>> = None;
    let mut cumulative = 0.0;
    let mut last_lat_lon: Option<(f64, f64)> = None;

    for track in gpx.tracks {
        if parsed.sport.is_none() {
            parsed.sport = track.type_.clone();
        }
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time else {
                    continue;
                };
                let iso = time
                    .format()
                    .map_err(|e| SplitError::GpxParse(e.to_string()))?;
                let utc = DateTime::parse_from_rfc3339(&iso)
                    .map_err(|e| SplitError::GpxParse(e.to_string()))?
                    .with_timezone(&Utc);
                let start = *base.get_or_insert(utc);

                let geo = point.point();
                let (lat, lon) = (geo.y(), geo.x());
                if let Some((last_lat, last_lon)) = last_lat_lon {
                    cumulative += haversine_distance(last_lat, last_lon, lat, lon);
                }
                last_lat_lon = Some((lat, lon));

                parsed.streams.time.push((utc - start).num_seconds());
                parsed.streams.distance.push(cumulative);
            }
        }
    }

    parsed.start_time = base;
    Ok(parsed)
}

pub(crate) fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6_371_000.0_f64;
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    r * c
}

#[derive(Deserialize)]
struct StreamEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    data: Vec<JsonValue>,
}

/// Strava returns streams either keyed by type or as a list of typed entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum StreamSet {
    Keyed(std::collections::BTreeMap<String, StreamEntry>),
    Listed(Vec<StreamEntry>),
}

/// Decodes a Strava streams payload into time/distance streams.
pub fn parse_stream_json(input: &[u8]) -> Result<ParsedActivity, SplitError> {
    let set: StreamSet =
        serde_json::from_slice(input).map_err(|e| SplitError::JsonParse(e.to_string()))?;

    let mut time: Option<Vec<JsonValue>> = None;
    let mut distance: Option<Vec<JsonValue>> = None;
    let mut assign = |name: &str, entry: StreamEntry| match name {
        "time" => time = Some(entry.data),
        "distance" => distance = Some(entry.data),
        _ => {}
    };
    match set {
        StreamSet::Keyed(map) => {
            for (key, entry) in map {
                let name = entry.kind.clone().unwrap_or(key);
                assign(&name, entry);
            }
        }
        StreamSet::Listed(entries) => {
            for entry in entries {
                if let Some(name) = entry.kind.clone() {
                    assign(&name, entry);
                }
            }
        }
    }

    let time = time.ok_or_else(|| SplitError::JsonParse("missing time stream".into()))?;
    let distance =
        distance.ok_or_else(|| SplitError::JsonParse("missing distance stream".into()))?;

    let time = time
        .iter()
        .enumerate()
        .map(|(idx, v)| {
            v.as_i64()
                .or_else(|| {
                    v.as_f64()
                        .filter(|t| (i64::MIN as f64..i64::MAX as f64).contains(t))
                        .map(|t| t.round() as Seconds)
                })
                .ok_or_else(|| {
                    SplitError::JsonParse(format!("time sample {idx} is not a whole-second offset"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let distance = distance
        .iter()
        .enumerate()
        .map(|(idx, v)| {
            v.as_f64().ok_or_else(|| {
                SplitError::JsonParse(format!("distance sample {idx} is not a number"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedActivity {
        streams: Streams::new(time, distance),
        ..ParsedActivity::default()
    })
}
