//! The station replacement pipeline.
//!
//! One linear pass over the delivery directory: warn about vendor axis
//! conventions, enumerate scan candidates, match each against an existing
//! TLS station, import the matched file, re-label and re-align the new
//! station, and transfer masks. Per-file mismatches skip and continue;
//! only a missing or invalid input directory aborts the run.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use thiserror::Error;

use crate::config::ReplaceConfig;
use crate::core::chunk::{normalize_label, unique_label, Chunk, Station};
use crate::core::loaders::{self, LoaderError, ScanImporter};
use crate::core::transforms::format_matrix;
use crate::processors::alignment::align_to_source;
use crate::processors::masks::{transfer_masks, MaskTransferSummary};
use crate::processors::matching::{index_laser_stations, match_candidate};

/// Unrecoverable conditions that abort the run before or during the pass.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Why a candidate file was not processed. Never fatal.
#[derive(Debug, Clone)]
pub enum SkipReason {
    /// No station label matches the file's base name.
    NoMatchingStation,
    /// The importer failed on this file.
    ImportFailed(String),
    /// The importer returned no new assets.
    NoAssetsImported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatchingStation => write!(f, "no matching station label"),
            SkipReason::ImportFailed(message) => write!(f, "import failed: {}", message),
            SkipReason::NoAssetsImported => write!(f, "import produced no assets"),
        }
    }
}

/// A candidate file the run decided not to process.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file: String,
    pub reason: SkipReason,
}

/// One imported asset that replaced (part of) a station.
#[derive(Debug, Clone)]
pub struct ReplacedStation {
    /// Scan file the asset came from.
    pub file: String,
    /// Label of the station being replaced.
    pub source_label: String,
    /// Label assigned to the imported station.
    pub new_label: String,
    /// Whether the pose alignment succeeded.
    pub aligned: bool,
    /// Outcome of the mask transfer.
    pub masks: MaskTransferSummary,
}

/// Result of a full replacement pass.
#[derive(Debug, Clone)]
pub struct ReplaceReport {
    pub chunk_label: String,
    pub directory: PathBuf,
    /// Importable files found in the directory.
    pub candidates: usize,
    pub replaced: Vec<ReplacedStation>,
    pub skipped: Vec<SkippedFile>,
}

impl ReplaceReport {
    fn new(chunk_label: String, directory: PathBuf, candidates: usize) -> Self {
        Self {
            chunk_label,
            directory,
            candidates,
            replaced: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// True when every mask of every replaced station arrived intact.
    pub fn masks_complete(&self) -> bool {
        self.replaced.iter().all(|r| r.masks.complete())
    }
}

/// Run the replacement pipeline over a delivery directory.
///
/// With `dry_run` set, candidates are matched and reported but nothing is
/// imported and the chunk is left untouched.
///
/// # Errors
///
/// Returns an error if `directory` does not exist or is not a directory.
/// Everything else is a per-file skip or a per-camera partial failure,
/// recorded in the returned [`ReplaceReport`].
pub fn run_replace(
    chunk: &mut Chunk,
    directory: &Path,
    importer: &dyn ScanImporter,
    config: &ReplaceConfig,
    dry_run: bool,
) -> Result<ReplaceReport, ReplaceError> {
    warn!(
        "Input scans must come from the same software as the point clouds already \
         in the project; differing axis conventions (e.g. yaw) can produce \
         incorrect orientations"
    );

    let candidates = loaders::find_scan_candidates(directory, &config.import.extensions)?;
    let mut report = ReplaceReport::new(chunk.label.clone(), directory.to_path_buf(), candidates.len());

    if candidates.is_empty() {
        info!("No importable scans found in: {}", directory.display());
        return Ok(report);
    }

    for duplicate in loaders::duplicate_base_names(&candidates) {
        warn!("Multiple files share the base name '{}'", duplicate);
    }

    let index = index_laser_stations(chunk);
    if index.is_empty() {
        info!("No TLS laser scans found in chunk '{}'", chunk.label);
        return Ok(report);
    }

    info!("Chunk: '{}'", chunk.label);
    info!("Directory: {}", directory.display());
    info!("Scan files found: {}", candidates.len());
    info!("TLS stations in chunk: {}", index.len());

    let mut taken = chunk.labels_normalized();

    for candidate in candidates {
        let file = candidate
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| candidate.base_name.clone());

        let Some(source_key) = match_candidate(&index, &candidate) else {
            info!("SKIP '{}': no matching station label", file);
            report.skipped.push(SkippedFile {
                file,
                reason: SkipReason::NoMatchingStation,
            });
            continue;
        };

        // Clone so the source pose and cameras stay stable while the chunk
        // grows below.
        let source = chunk
            .station(source_key)
            .cloned()
            .expect("station index points at a live station");

        info!("MATCH: '{}' <-> '{}' (station key={})", file, source.label, source.key);
        info!(
            "Source effective transform:\n{}",
            format_matrix(&source.effective_transform())
        );

        if dry_run {
            report.replaced.push(ReplacedStation {
                file,
                source_label: source.label.clone(),
                new_label: format!("{}{}", candidate.base_name, config.labels.suffix),
                aligned: false,
                masks: MaskTransferSummary::default(),
            });
            continue;
        }

        let imported = match importer.import(&candidate.path) {
            Ok(stations) => stations,
            Err(e) => {
                error!("Import failed for '{}': {}", file, e);
                report.skipped.push(SkippedFile {
                    file,
                    reason: SkipReason::ImportFailed(e.to_string()),
                });
                continue;
            }
        };

        if imported.is_empty() {
            error!("No new point-cloud assets detected after importing '{}'", file);
            report.skipped.push(SkippedFile {
                file,
                reason: SkipReason::NoAssetsImported,
            });
            continue;
        }

        for (idx, station) in imported.into_iter().enumerate() {
            let replaced = adopt_imported(
                chunk,
                &source,
                station,
                &candidate.base_name,
                idx,
                &file,
                config,
                &mut taken,
            );
            report.replaced.push(replaced);
        }
    }

    Ok(report)
}

/// Re-label, re-align, and mask-transfer one imported asset, then add it to
/// the chunk.
fn adopt_imported(
    chunk: &mut Chunk,
    source: &Station,
    mut station: Station,
    base_name: &str,
    asset_index: usize,
    file: &str,
    config: &ReplaceConfig,
    taken: &mut HashSet<String>,
) -> ReplacedStation {
    let desired = if asset_index == 0 {
        format!("{}{}", base_name, config.labels.suffix)
    } else {
        format!(
            "{}{}_{:0width$}",
            base_name,
            config.labels.suffix,
            asset_index + 1,
            width = config.labels.counter_width
        )
    };

    station.label = unique_label(&desired, taken, &config.labels);
    taken.insert(normalize_label(&station.label));
    station.enabled = source.enabled;

    info!(
        "Imported effective transform (label='{}'):\n{}",
        station.label,
        format_matrix(&station.effective_transform())
    );

    let aligned = match align_to_source(source, &mut station) {
        Ok(alignment) => {
            info!("Delta applied:\n{}", format_matrix(&alignment.delta));
            info!(
                "Final effective transform:\n{}",
                format_matrix(&alignment.aligned)
            );
            true
        }
        Err(e) => {
            error!("Alignment failed for '{}': {}", station.label, e);
            false
        }
    };

    let masks = transfer_masks(source, &mut station, &config.masks);

    let new_label = station.label.clone();
    chunk.add_station(station);

    ReplacedStation {
        file: file.to_string(),
        source_label: source.label.clone(),
        new_label,
        aligned,
        masks,
    }
}
