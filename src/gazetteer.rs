use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::normalize::normalize;

/// One raw row of the gazetteer file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerRecord {
    pub comune: String,
    #[serde(alias = "province")]
    pub provincia: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
}

/// One reference locality, enriched with the normalized keys it is matched
/// under. Read-only after load.
#[derive(Debug, Clone, Serialize)]
pub struct GazetteerEntry {
    pub comune: String,
    pub provincia: String,
    pub norm_comune: String,
    pub norm_provincia: String,
    pub lat: f64,
    pub lon: f64,
}

/// The in-memory reference dataset: entries in load order (the deterministic
/// tie-break order for every downstream strategy) plus lookup indices keyed
/// by normalized comune and normalized province.
#[derive(Debug, Default)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
    by_norm_comune: HashMap<String, Vec<usize>>,
    by_norm_provincia: HashMap<String, Vec<usize>>,
}

impl Gazetteer {
    /// Loads a JSON array of `{comune, provincia, lat, lon}` objects. Any
    /// failure is fatal: a missing or malformed source must abort the run
    /// rather than degrade into a partial gazetteer.
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path).map_err(|err| {
            AppError::DataLoad(format!("gazetteer {}: {err}", path.display()))
        })?;
        let records: Vec<GazetteerRecord> = serde_json::from_slice(&bytes).map_err(|err| {
            AppError::DataLoad(format!("gazetteer {}: {err}", path.display()))
        })?;
        Self::from_records(records)
    }

    /// Builds the gazetteer from in-memory records, normalizing each name
    /// with the same function queries go through.
    pub fn from_records(records: Vec<GazetteerRecord>) -> AppResult<Self> {
        let mut entries = Vec::with_capacity(records.len());
        let mut by_norm_comune: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_norm_provincia: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let norm_comune = normalize(&record.comune);
            if norm_comune.is_empty() {
                return Err(AppError::DataLoad(format!(
                    "gazetteer row {index}: comune {:?} normalizes to an empty key",
                    record.comune
                )));
            }
            let norm_provincia = normalize(&record.provincia);

            by_norm_comune
                .entry(norm_comune.clone())
                .or_default()
                .push(index);
            if !norm_provincia.is_empty() {
                by_norm_provincia
                    .entry(norm_provincia.clone())
                    .or_default()
                    .push(index);
            }

            entries.push(GazetteerEntry {
                comune: record.comune,
                provincia: record.provincia,
                norm_comune,
                norm_provincia,
                lat: record.lat,
                lon: record.lon,
            });
        }

        debug!(
            entries = entries.len(),
            comuni = by_norm_comune.len(),
            provincie = by_norm_provincia.len(),
            "gazetteer indexed"
        );
        Ok(Self {
            entries,
            by_norm_comune,
            by_norm_provincia,
        })
    }

    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &GazetteerEntry {
        &self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry indices for a normalized comune key, in load order.
    pub fn comune_matches(&self, norm_comune: &str) -> &[usize] {
        self.by_norm_comune
            .get(norm_comune)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entry indices for a normalized province key, in load order.
    pub fn provincia_matches(&self, norm_provincia: &str) -> &[usize] {
        self.by_norm_provincia
            .get(norm_provincia)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first entry index for each distinct normalized province, in load
    /// order. Used by the province-level fuzzy fallback so its iteration
    /// order never depends on hash-map ordering.
    pub fn distinct_provincie(&self) -> Vec<usize> {
        let mut seen: HashMap<&str, ()> = HashMap::new();
        let mut representatives = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.norm_provincia.is_empty() {
                continue;
            }
            if seen.insert(entry.norm_provincia.as_str(), ()).is_none() {
                representatives.push(index);
            }
        }
        representatives
    }
}
