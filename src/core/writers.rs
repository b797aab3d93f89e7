//! Writer for the updated project manifest.
//!
//! The pipeline itself never persists anything; writing the mutated chunk
//! back out is a separate, explicit step, the analog of the host
//! application's own project-save mechanism.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::warn;
use thiserror::Error;

use crate::core::chunk::Chunk;
use crate::core::loaders::{mat_to_rows, CameraManifest, ChunkManifest, StationManifest};

/// Errors that can occur while saving the project manifest.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write the manifest file.
    #[error("failed to write manifest '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Manifest serialization error.
    #[error("failed to serialize manifest '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Build the serializable manifest form of a chunk.
///
/// Masks are written as references to their backing files; a mask that was
/// never loaded from disk has no representable path and is dropped with a
/// logged warning.
pub fn chunk_to_manifest(chunk: &Chunk) -> ChunkManifest {
    let stations = chunk
        .stations()
        .iter()
        .map(|station| StationManifest {
            label: station.label.clone(),
            transform: mat_to_rows(&station.transform),
            group_transform: station.group_transform.as_ref().map(mat_to_rows),
            laser_scan: station.is_laser_scan,
            enabled: station.enabled,
            points: station.points,
            cameras: station
                .cameras
                .iter()
                .map(|camera| {
                    let mask = match &camera.mask {
                        Some(mask) => {
                            if mask.source.is_none() {
                                warn!(
                                    "Camera '{}' carries a mask with no backing file; not saved",
                                    camera.label
                                );
                            }
                            mask.source.clone()
                        }
                        None => None,
                    };
                    CameraManifest {
                        label: camera.label.clone(),
                        mask,
                    }
                })
                .collect(),
        })
        .collect();

    ChunkManifest {
        chunk: chunk.label.clone(),
        stations,
    }
}

/// Write the chunk out as a YAML project manifest.
///
/// # Errors
///
/// Returns an error if parent directories cannot be created or the file
/// cannot be serialized or written.
pub fn save_chunk(path: &Path, chunk: &Chunk) -> Result<()> {
    ensure_parent_dirs(path)?;

    let manifest = chunk_to_manifest(chunk);
    let content = serde_yaml::to_string(&manifest).map_err(|e| WriteError::Serialize {
        path: path.display().to_string(),
        source: e,
    })?;

    let file = File::create(path).map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| WriteError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::{Camera, Mask, Station};
    use crate::core::loaders::load_chunk;
    use crate::core::transforms::Mat4;
    use nalgebra::Vector3;
    use tempfile::tempdir;

    fn sample_chunk(mask_source: Option<std::path::PathBuf>) -> Chunk {
        let mut chunk = Chunk::new("Yard");
        chunk.add_station(Station {
            key: 0,
            label: "StationA".to_string(),
            transform: Mat4::new_translation(&Vector3::new(1.0, 2.0, 3.0)),
            group_transform: Some(Mat4::identity()),
            is_laser_scan: true,
            enabled: false,
            points: 42,
            cameras: vec![Camera {
                key: 0,
                label: "cam_01".to_string(),
                mask: Some(Mask {
                    data: b"mask-bytes".to_vec(),
                    source: mask_source,
                }),
            }],
        });
        chunk
    }

    #[test]
    fn test_save_and_reload_chunk() {
        let dir = tempdir().unwrap();
        let mask_path = dir.path().join("cam_01_mask.png");
        fs::write(&mask_path, b"mask-bytes").unwrap();

        let chunk = sample_chunk(Some(mask_path));
        let manifest_path = dir.path().join("out").join("project.yaml");
        save_chunk(&manifest_path, &chunk).unwrap();

        let reloaded = load_chunk(&manifest_path).unwrap();
        assert_eq!(reloaded.label, "Yard");
        assert_eq!(reloaded.stations().len(), 1);

        let station = &reloaded.stations()[0];
        assert_eq!(station.label, "StationA");
        assert!(!station.enabled);
        assert_eq!(station.points, 42);
        assert_eq!(station.transform[(1, 3)], 2.0);
        assert!(station.group_transform.is_some());

        let mask = station.cameras[0].mask.as_ref().unwrap();
        assert_eq!(mask.data, b"mask-bytes");
    }

    #[test]
    fn test_sourceless_mask_is_dropped() {
        let chunk = sample_chunk(None);
        let manifest = chunk_to_manifest(&chunk);
        assert!(manifest.stations[0].cameras[0].mask.is_none());
    }
}
