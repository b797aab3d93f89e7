//! Mask transfer between the original and the imported station.
//!
//! Imported scans may carry spurious default masks, so every camera of the
//! new station is cleared first. Masks are then copied byte-for-byte from
//! the source station's cameras under the configured pairing rule. Pairing
//! failures are reported per camera and never abort the run.

use log::{info, warn};

use crate::config::{MaskConfig, PairingMode};
use crate::core::chunk::{normalize_label, Station};

/// Per-station outcome of the clear-and-copy mask transfer.
#[derive(Debug, Clone, Default)]
pub struct MaskTransferSummary {
    /// Cameras on the source station.
    pub source_cameras: usize,
    /// Cameras on the imported station.
    pub new_cameras: usize,
    /// Masks removed from the imported station before copying.
    pub cleared: usize,
    /// Masks copied onto the imported station.
    pub copied: usize,
    /// Source cameras with a mask that found no counterpart.
    pub unmatched: Vec<String>,
    /// True when the two stations disagree on camera count.
    pub count_mismatch: bool,
}

impl MaskTransferSummary {
    /// True when every source mask reached a counterpart camera.
    pub fn complete(&self) -> bool {
        self.unmatched.is_empty() && !self.count_mismatch
    }
}

/// Remove all masks from a station's cameras. Returns how many were cleared.
pub fn clear_masks(station: &mut Station) -> usize {
    let mut cleared = 0;
    for camera in &mut station.cameras {
        if camera.mask.take().is_some() {
            cleared += 1;
        }
    }
    cleared
}

/// Clear the imported station's masks, then copy masks from the source.
///
/// With [`PairingMode::ByIndex`] both camera lists are sorted by
/// (label, key) and paired positionally over the common prefix; a count
/// mismatch is flagged and the surplus is reported as unmatched. With
/// [`PairingMode::ByLabel`] each source camera is paired to the target
/// camera of equal normalized label.
pub fn transfer_masks(source: &Station, target: &mut Station, config: &MaskConfig) -> MaskTransferSummary {
    let mut summary = MaskTransferSummary {
        source_cameras: source.cameras.len(),
        new_cameras: target.cameras.len(),
        ..MaskTransferSummary::default()
    };

    info!(
        "Cameras attached | source: {} | new: {}",
        summary.source_cameras, summary.new_cameras
    );

    summary.cleared = clear_masks(target);
    if summary.new_cameras > 0 {
        info!(
            "Cleared masks on new cameras: {}/{}",
            summary.cleared, summary.new_cameras
        );
    }

    if source.cameras.is_empty() || target.cameras.is_empty() {
        warn!(
            "Cannot transfer masks between '{}' and '{}' (missing cameras)",
            source.label, target.label
        );
        summary.count_mismatch = summary.source_cameras != summary.new_cameras;
        summary.unmatched = source
            .cameras
            .iter()
            .filter(|c| c.mask.is_some())
            .map(|c| c.label.clone())
            .collect();
        return summary;
    }

    match config.pairing {
        PairingMode::ByIndex => transfer_by_index(source, target, &mut summary),
        PairingMode::ByLabel => transfer_by_label(source, target, &mut summary),
    }

    info!(
        "Masks copied to new cameras: {}/{}",
        summary.copied, summary.source_cameras
    );
    for label in &summary.unmatched {
        warn!("No counterpart for source camera '{}'; mask not copied", label);
    }

    summary
}

fn transfer_by_index(source: &Station, target: &mut Station, summary: &mut MaskTransferSummary) {
    let source_order = source.sorted_camera_indices();
    let target_order = target.sorted_camera_indices();

    let n = source_order.len().min(target_order.len());
    for i in 0..n {
        let src_cam = &source.cameras[source_order[i]];
        if let Some(mask) = &src_cam.mask {
            target.cameras[target_order[i]].mask = Some(mask.clone());
            summary.copied += 1;
        }
    }

    if source_order.len() != target_order.len() {
        summary.count_mismatch = true;
        warn!(
            "Camera count mismatch between '{}' ({}) and '{}' ({}); transferred masks for the first {} pairs",
            source.label,
            source_order.len(),
            target.label,
            target_order.len(),
            n
        );
        summary.unmatched = source_order[n..]
            .iter()
            .filter(|&&idx| source.cameras[idx].mask.is_some())
            .map(|&idx| source.cameras[idx].label.clone())
            .collect();
    }
}

fn transfer_by_label(source: &Station, target: &mut Station, summary: &mut MaskTransferSummary) {
    summary.count_mismatch = source.cameras.len() != target.cameras.len();

    for src_cam in &source.cameras {
        let Some(mask) = &src_cam.mask else {
            continue;
        };

        let wanted = normalize_label(&src_cam.label);
        match target
            .cameras
            .iter_mut()
            .find(|c| normalize_label(&c.label) == wanted)
        {
            Some(dst_cam) => {
                dst_cam.mask = Some(mask.clone());
                summary.copied += 1;
            }
            None => summary.unmatched.push(src_cam.label.clone()),
        }
    }
}
