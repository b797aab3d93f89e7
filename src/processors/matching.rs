//! Candidate-to-station matching by normalized label.

use std::collections::HashMap;

use log::warn;

use crate::core::chunk::{normalize_label, Chunk};
use crate::core::loaders::ScanCandidate;

/// Index of TLS stations keyed by normalized label.
#[derive(Debug, Default)]
pub struct StationIndex {
    map: HashMap<String, u64>,
}

impl StationIndex {
    /// Station key for a normalized label, if one exists.
    pub fn get(&self, normalized: &str) -> Option<u64> {
        self.map.get(normalized).copied()
    }

    /// Number of indexed stations.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no station is indexed.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Index the chunk's laser-scan stations by normalized label.
///
/// Unlabeled stations are skipped. When two stations share a normalized
/// label, the first one wins and a warning is logged, mirroring how the
/// project itself resolves ambiguous labels.
pub fn index_laser_stations(chunk: &Chunk) -> StationIndex {
    let mut map = HashMap::new();

    for station in chunk.stations().iter().filter(|s| s.is_laser_scan) {
        let key = normalize_label(&station.label);
        if key.is_empty() {
            continue;
        }
        if map.contains_key(&key) {
            warn!(
                "Duplicate scan label '{}'; the first one will be used",
                station.label
            );
            continue;
        }
        map.insert(key, station.key);
    }

    StationIndex { map }
}

/// Resolve a scan candidate to the station it replaces, if any.
pub fn match_candidate(index: &StationIndex, candidate: &ScanCandidate) -> Option<u64> {
    index.get(&candidate.normalized())
}
