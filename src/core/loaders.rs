//! Loaders for scan deliveries and project state.
//!
//! This module provides:
//! - Discovery of importable scan files in a delivery directory
//! - Loading the active chunk from a project manifest (YAML)
//! - The [`ScanImporter`] seam and its E57 implementation
//!
//! The import operation is the one genuinely external dependency of the
//! pipeline, so it sits behind a trait: production code reads real E57
//! files, tests substitute canned stations.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use e57::E57Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::chunk::{normalize_label, Camera, Chunk, Mask, Station};
use crate::core::transforms::{from_rotation_translation, Mat4};

/// Errors that can occur while loading scans or project state.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid project manifest '{path}': {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read mask '{path}': {source}")]
    MaskRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read scan '{path}': {message}")]
    Scan { path: PathBuf, message: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// An importable scan file identified by its base filename.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    /// Full path to the scan file.
    pub path: PathBuf,
    /// Filename without extension.
    pub base_name: String,
}

impl ScanCandidate {
    /// Normalized base name used for station matching.
    pub fn normalized(&self) -> String {
        normalize_label(&self.base_name)
    }
}

/// Enumerate importable scan files in a directory, sorted by path.
///
/// Extensions are compared case-insensitively against `extensions` (given
/// without the leading dot). Subdirectories are not descended into.
///
/// # Errors
///
/// Returns [`LoaderError::NotADirectory`] if `directory` does not exist or
/// is not a directory.
pub fn find_scan_candidates(directory: &Path, extensions: &[String]) -> Result<Vec<ScanCandidate>> {
    if !directory.is_dir() {
        return Err(LoaderError::NotADirectory(directory.to_path_buf()));
    }

    let mut candidates: Vec<ScanCandidate> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| {
                        extensions
                            .iter()
                            .any(|wanted| ext.eq_ignore_ascii_case(wanted.as_str()))
                    })
                    .unwrap_or(false)
        })
        .filter_map(|path| {
            let base_name = path.file_stem()?.to_string_lossy().into_owned();
            Some(ScanCandidate { path, base_name })
        })
        .collect();

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(candidates)
}

/// Serialized form of the active chunk, as stored in a project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkManifest {
    /// Chunk label.
    pub chunk: String,
    /// Stations in the chunk.
    #[serde(default)]
    pub stations: Vec<StationManifest>,
}

/// Serialized form of a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationManifest {
    pub label: String,
    /// Local transform as four row-major rows.
    pub transform: [[f64; 4]; 4],
    /// Transform of the enclosing group, if any.
    #[serde(default)]
    pub group_transform: Option<[[f64; 4]; 4]>,
    #[serde(default = "default_true")]
    pub laser_scan: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub points: u64,
    #[serde(default)]
    pub cameras: Vec<CameraManifest>,
}

/// Serialized form of a camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraManifest {
    pub label: String,
    /// Mask file path, relative to the manifest location.
    #[serde(default)]
    pub mask: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// Convert four row-major rows to a transform.
pub fn mat_from_rows(rows: &[[f64; 4]; 4]) -> Mat4 {
    Mat4::from_fn(|r, c| rows[r][c])
}

/// Convert a transform to four row-major rows.
pub fn mat_to_rows(m: &Mat4) -> [[f64; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

/// Load the active chunk from a project manifest.
///
/// Mask paths in the manifest are resolved relative to the manifest's
/// directory and read eagerly, so downstream mask copies work on bytes.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or parsed, or if a
/// referenced mask file cannot be read.
pub fn load_chunk(path: &Path) -> Result<Chunk> {
    let content = fs::read_to_string(path)?;
    let manifest: ChunkManifest = serde_yaml::from_str(&content).map_err(|e| LoaderError::Manifest {
        path: path.to_path_buf(),
        source: e,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut chunk = Chunk::new(manifest.chunk);

    for sm in manifest.stations {
        let mut cameras = Vec::with_capacity(sm.cameras.len());
        for cm in sm.cameras {
            let mask = match cm.mask {
                Some(rel) => {
                    let mask_path = base_dir.join(rel);
                    let data = fs::read(&mask_path).map_err(|e| LoaderError::MaskRead {
                        path: mask_path.clone(),
                        source: e,
                    })?;
                    Some(Mask {
                        data,
                        source: Some(mask_path),
                    })
                }
                None => None,
            };
            cameras.push(Camera {
                key: 0,
                label: cm.label,
                mask,
            });
        }

        chunk.add_station(Station {
            key: 0,
            label: sm.label,
            transform: mat_from_rows(&sm.transform),
            group_transform: sm.group_transform.as_ref().map(mat_from_rows),
            is_laser_scan: sm.laser_scan,
            enabled: sm.enabled,
            points: sm.points,
            cameras,
        });
    }

    Ok(chunk)
}

/// Imports a scan file as one or more new stations.
///
/// Implementations return stations with zero keys; [`Chunk::add_station`]
/// assigns real keys when the stations join the chunk.
pub trait ScanImporter {
    /// Import the file at `path` into new station objects.
    fn import(&self, path: &Path) -> Result<Vec<Station>>;
}

/// [`ScanImporter`] backed by the `e57` crate.
///
/// Reads per-pointcloud metadata only: guid, name, pose, and record count.
/// Embedded image entries become cameras of the station they reference, so
/// mask transfer has something to pair against.
#[derive(Debug, Default, Clone, Copy)]
pub struct E57Importer;

impl E57Importer {
    pub fn new() -> Self {
        Self
    }
}

impl ScanImporter for E57Importer {
    fn import(&self, path: &Path) -> Result<Vec<Station>> {
        let reader = E57Reader::from_file(path).map_err(|e| LoaderError::Scan {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let images = reader.images();
        let pointclouds = reader.pointclouds();
        let single = pointclouds.len() == 1;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());

        let mut stations = Vec::with_capacity(pointclouds.len());
        for pc in pointclouds {
            let label = pc.name.clone().unwrap_or_else(|| stem.clone());

            let transform = pc
                .transform
                .as_ref()
                .map(|t| {
                    from_rotation_translation(
                        t.rotation.w,
                        t.rotation.x,
                        t.rotation.y,
                        t.rotation.z,
                        [t.translation.x, t.translation.y, t.translation.z],
                    )
                })
                .unwrap_or_else(Mat4::identity);

            let cameras: Vec<Camera> = images
                .iter()
                .enumerate()
                .filter(|(_, img)| match (&img.pointcloud_guid, &pc.guid) {
                    (Some(img_guid), Some(pc_guid)) => img_guid == pc_guid,
                    _ => single,
                })
                .map(|(i, img)| Camera {
                    key: 0,
                    label: img
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("image_{:02}", i + 1)),
                    mask: None,
                })
                .collect();

            stations.push(Station {
                key: 0,
                label,
                transform,
                group_transform: None,
                is_laser_scan: true,
                enabled: true,
                points: pc.records,
                cameras,
            });
        }

        Ok(stations)
    }
}

/// Deduplicate normalized base names, reporting the labels seen twice.
///
/// A delivery folder containing `scan.e57` and `SCAN.E57` would race for
/// the same station; the caller logs these.
pub fn duplicate_base_names(candidates: &[ScanCandidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for candidate in candidates {
        let key = candidate.normalized();
        if !seen.insert(key.clone()) {
            duplicates.push(key);
        }
    }
    duplicates
}
