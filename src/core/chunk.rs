//! In-memory model of the host project's active chunk.
//!
//! The reconstruction application owns the real project; this module keeps
//! just enough of its object model to drive the replacement pipeline:
//! labeled point-cloud stations with pose transforms, their cameras, and
//! per-camera masks. Point data itself is never held here, only the
//! metadata the pipeline reads and mutates.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::LabelConfig;
use crate::core::transforms::{effective_transform, Mat4};

/// Normalize a label or base filename for matching (trim + lowercase).
pub fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Per-camera raster marking regions excluded from downstream processing.
///
/// Mask pixels are opaque bytes to this pipeline: they are copied between
/// cameras, never decoded or reprocessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    /// Raw mask bytes in whatever raster format the project stores.
    pub data: Vec<u8>,
    /// File the mask bytes were read from, when known.
    pub source: Option<PathBuf>,
}

impl Mask {
    /// Create a mask from raw bytes with no backing file.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, source: None }
    }
}

/// An image with known pose belonging to a station.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Chunk-unique camera key.
    pub key: u64,
    /// Camera label as shown in the project.
    pub label: String,
    /// Optional exclusion mask.
    pub mask: Option<Mask>,
}

/// A labeled TLS point-cloud group within the active chunk.
#[derive(Debug, Clone)]
pub struct Station {
    /// Chunk-unique station key.
    pub key: u64,
    /// Station label as shown in the project.
    pub label: String,
    /// Local transform of the point-cloud group.
    pub transform: Mat4,
    /// Transform of the enclosing group, if the station belongs to one.
    pub group_transform: Option<Mat4>,
    /// Whether this group is a terrestrial laser scan.
    pub is_laser_scan: bool,
    /// Whether the station is enabled in the project.
    pub enabled: bool,
    /// Number of point records, when known.
    pub points: u64,
    /// Cameras associated with this station.
    pub cameras: Vec<Camera>,
}

impl Station {
    /// The composed transform taking this station's local frame to the
    /// project reference frame (`group * local` when grouped).
    pub fn effective_transform(&self) -> Mat4 {
        effective_transform(self.group_transform.as_ref(), &self.transform)
    }

    /// Camera indices sorted by (label, key) for stable, deterministic
    /// pairing between stations.
    pub fn sorted_camera_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.cameras.len()).collect();
        indices.sort_by(|&a, &b| {
            let ca = &self.cameras[a];
            let cb = &self.cameras[b];
            (ca.label.as_str(), ca.key).cmp(&(cb.label.as_str(), cb.key))
        });
        indices
    }
}

/// The active chunk: a container of stations sharing one label namespace.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk label as shown in the project.
    pub label: String,
    stations: Vec<Station>,
    next_key: u64,
}

impl Chunk {
    /// Create an empty chunk.
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            stations: Vec::new(),
            next_key: 1,
        }
    }

    /// All stations in the chunk.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Look up a station by its key.
    pub fn station(&self, key: u64) -> Option<&Station> {
        self.stations.iter().find(|s| s.key == key)
    }

    /// Look up a station mutably by its key.
    pub fn station_mut(&mut self, key: u64) -> Option<&mut Station> {
        self.stations.iter_mut().find(|s| s.key == key)
    }

    /// Add a station, assigning fresh keys to it and its cameras.
    ///
    /// Returns the key the station was assigned.
    pub fn add_station(&mut self, mut station: Station) -> u64 {
        let key = self.next_key;
        station.key = key;
        self.next_key += 1;

        for camera in &mut station.cameras {
            camera.key = self.next_key;
            self.next_key += 1;
        }

        self.stations.push(station);
        key
    }

    /// Normalized labels of every station, for collision checks.
    pub fn labels_normalized(&self) -> HashSet<String> {
        self.stations
            .iter()
            .filter(|s| !s.label.trim().is_empty())
            .map(|s| normalize_label(&s.label))
            .collect()
    }
}

/// Ensure a label is unique against `taken` by appending `_02`, `_03`, ...
///
/// `taken` holds normalized labels; the returned label is the desired one
/// when free, otherwise the first suffixed candidate that does not collide.
pub fn unique_label(desired: &str, taken: &HashSet<String>, labels: &LabelConfig) -> String {
    if !taken.contains(&normalize_label(desired)) {
        return desired.to_string();
    }

    let mut i = labels.counter_start;
    loop {
        let candidate = format!("{}_{:0width$}", desired, i, width = labels.counter_width);
        if !taken.contains(&normalize_label(&candidate)) {
            return candidate;
        }
        i += 1;
    }
}
