use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pace_curve::ingest::parse_stream_json;
use pace_curve::{
    collect_activities, parse_activity, Activity, ActivitySource, ActivitySummary, SplitError,
    Streams,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A local mirror of a Strava account: `activities.json` plus `streams/<id>.json`.
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn open(root: &Path) -> Option<Self> {
        if root.is_dir() && root.join("activities.json").is_file() {
            Some(Self {
                root: root.to_path_buf(),
            })
        } else {
            None
        }
    }

    fn streams_path(&self, id: &str) -> PathBuf {
        self.root.join("streams").join(format!("{id}.json"))
    }
}

impl ActivitySource for CacheDir {
    type Error = SplitError;

    fn list_activities(&self) -> Result<Vec<ActivitySummary>, SplitError> {
        let path = self.root.join("activities.json");
        let text = fs::read_to_string(&path)
            .map_err(|e| SplitError::Source(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| SplitError::Source(format!("{}: {e}", path.display())))
    }

    fn streams(&self, id: &str) -> Result<Option<Streams>, SplitError> {
        let path = self.streams_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SplitError::Source(format!("{}: {err}", path.display()))),
        };
        Ok(Some(parse_stream_json(&bytes)?.streams))
    }
}

/// Parsed file contents as stored in the parse cache.
#[derive(Serialize, Deserialize)]
struct CachedActivity {
    streams: Streams,
    reported_total_distance: f64,
    start_time: Option<DateTime<Utc>>,
    sport: Option<String>,
}

/// Loads every input: cache directories through [`CacheDir`], anything else
/// as a single activity file. Input order is preserved.
pub fn load_inputs(inputs: &[PathBuf], use_cache: bool) -> Result<Vec<Activity>> {
    let mut activities = Vec::new();
    let mut files = Vec::new();
    for path in inputs {
        if let Some(cache) = CacheDir::open(path) {
            let listed = collect_activities(&cache)
                .with_context(|| format!("failed to read activity cache {}", path.display()))?;
            info!("Loaded {} activities from {}", listed.len(), path.display());
            activities.extend(listed);
        } else {
            files.push(path.clone());
        }
    }
    if !files.is_empty() {
        activities.extend(load_files(&files, use_cache)?);
    }
    Ok(activities)
}

fn load_files(files: &[PathBuf], use_cache: bool) -> Result<Vec<Activity>> {
    let cache_dir = PathBuf::from(".cache").join("parsed_activities");
    if use_cache {
        let _ = fs::create_dir_all(&cache_dir);
    }

    let ids = activity_ids(files);
    files
        .par_iter()
        .zip(ids.into_par_iter())
        .map(|(path, id)| -> Result<Activity> {
            let key = cache_key(path)?;
            let cached = if use_cache {
                read_cache(&cache_dir, &key)
            } else {
                None
            };
            let parsed = match cached {
                Some(hit) => {
                    debug!("parse cache hit: {}", path.display());
                    hit
                }
                None => {
                    let data = fs::read(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let hint = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .unwrap_or("fit");
                    let parsed = parse_activity(&data, hint)
                        .with_context(|| format!("failed to parse {}", path.display()))?;
                    let entry = CachedActivity {
                        reported_total_distance: parsed.total_distance(),
                        streams: parsed.streams,
                        start_time: parsed.start_time,
                        sport: parsed.sport,
                    };
                    if use_cache {
                        let _ = write_cache(&cache_dir, &key, &entry);
                    }
                    entry
                }
            };
            Ok(into_activity(path, id, parsed))
        })
        .collect()
}

/// File stems, widened with the parent directory (then the input position)
/// where two inputs would otherwise share an id.
fn activity_ids(files: &[PathBuf]) -> Vec<String> {
    let stem = |path: &PathBuf| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    };
    let stems: Vec<String> = files.iter().map(stem).collect();
    let mut ids: Vec<String> = files
        .iter()
        .zip(&stems)
        .map(|(path, stem)| {
            if stems.iter().filter(|other| *other == stem).count() < 2 {
                return stem.clone();
            }
            match path.parent().and_then(|p| p.file_name()) {
                Some(parent) => format!("{}/{}", parent.to_string_lossy(), stem),
                None => stem.clone(),
            }
        })
        .collect();
    let widened = ids.clone();
    for (idx, id) in ids.iter_mut().enumerate() {
        if widened.iter().filter(|other| other.as_str() == id.as_str()).count() > 1 {
            *id = format!("{id}#{}", idx + 1);
        }
    }
    ids
}

fn into_activity(path: &Path, id: String, parsed: CachedActivity) -> Activity {
    let mut summary = ActivitySummary::new(id, parsed.reported_total_distance);
    summary.name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    summary.start_date = parsed.start_time;
    summary.sport_type = parsed.sport;
    let streams = (!parsed.streams.is_empty()).then_some(parsed.streams);
    Activity::new(summary, streams)
}

fn cache_key(path: &Path) -> Result<String> {
    use std::time::SystemTime;
    let meta = fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let dur = modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    meta.len().hash(&mut hasher);
    (dur.as_secs(), dur.subsec_nanos()).hash(&mut hasher);
    Ok(format!("{:016x}", hasher.finish()))
}

fn read_cache(dir: &Path, key: &str) -> Option<CachedActivity> {
    let text = fs::read_to_string(dir.join(format!("{key}.json"))).ok()?;
    serde_json::from_str(&text).ok()
}

fn write_cache(dir: &Path, key: &str, entry: &CachedActivity) -> Result<()> {
    let path = dir.join(format!("{key}.json"));
    let text = serde_json::to_string(entry)?;
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
