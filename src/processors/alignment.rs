//! Pose alignment of imported stations onto the stations they replace.

use thiserror::Error;

use crate::core::chunk::Station;
use crate::core::transforms::{apply_delta, pose_delta, Mat4};

/// Errors that can occur during alignment.
#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("effective transform of imported station '{label}' is not invertible")]
    NonInvertible { label: String },
}

/// Transforms involved in one alignment, kept for the console log.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Effective transform of the imported station before alignment.
    pub imported: Mat4,
    /// Delta applied to the imported station's local transform.
    pub delta: Mat4,
    /// Effective transform after alignment; equals the source's.
    pub aligned: Mat4,
}

/// Move an imported station onto the pose of the station it replaces.
///
/// The imported station first adopts the source's group transform so both
/// effective transforms are expressed against the same parent frame. The
/// delta `source_effective * imported_effective⁻¹` is then applied to the
/// imported *effective* transform, and the group contribution is stripped
/// off to recover the local transform: `group * local` ends up equal to the
/// source's effective transform, exact up to floating point. Applying the
/// delta in local space instead would drift whenever the group carries a
/// rotation, since the group and the delta do not commute.
pub fn align_to_source(source: &Station, imported: &mut Station) -> Result<Alignment, AlignmentError> {
    imported.group_transform = source.group_transform;

    let source_effective = source.effective_transform();
    let imported_effective = imported.effective_transform();

    let delta = pose_delta(&source_effective, &imported_effective).ok_or_else(|| {
        AlignmentError::NonInvertible {
            label: imported.label.clone(),
        }
    })?;

    let aligned_effective = apply_delta(&delta, &imported_effective);
    imported.transform = match imported.group_transform.as_ref() {
        Some(group) => {
            // imported_effective == group * local, so the group is
            // invertible whenever the delta above exists.
            let group_inverse =
                group
                    .try_inverse()
                    .ok_or_else(|| AlignmentError::NonInvertible {
                        label: imported.label.clone(),
                    })?;
            group_inverse * aligned_effective
        }
        None => aligned_effective,
    };

    Ok(Alignment {
        imported: imported_effective,
        delta,
        aligned: imported.effective_transform(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transforms::{from_rotation_translation, transforms_close};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn station(label: &str, transform: Mat4, group: Option<Mat4>) -> Station {
        Station {
            key: 0,
            label: label.to_string(),
            transform,
            group_transform: group,
            is_laser_scan: true,
            enabled: true,
            points: 0,
            cameras: Vec::new(),
        }
    }

    #[test]
    fn test_aligned_effective_equals_source_effective() {
        let source_pose =
            from_rotation_translation(0.7071068, 0.0, 0.7071068, 0.0, [12.0, -3.0, 0.5]);
        let group = Mat4::new_translation(&Vector3::new(100.0, 0.0, 0.0));
        let source = station("StationA", source_pose, Some(group));

        let mut imported = station(
            "stationa_new",
            Mat4::new_translation(&Vector3::new(1.0, 1.0, 1.0)),
            None,
        );

        let alignment = align_to_source(&source, &mut imported).unwrap();

        assert!(transforms_close(
            &imported.effective_transform(),
            &source.effective_transform(),
            1e-9
        ));
        assert_relative_eq!(alignment.aligned, source.effective_transform(), epsilon = 1e-9);
        assert_eq!(imported.group_transform, source.group_transform);
    }

    #[test]
    fn test_identity_delta_when_poses_already_match() {
        let pose = Mat4::new_translation(&Vector3::new(4.0, 5.0, 6.0));
        let source = station("StationA", pose, None);
        let mut imported = station("stationa_new", pose, None);

        let alignment = align_to_source(&source, &mut imported).unwrap();
        assert_relative_eq!(alignment.delta, Mat4::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_non_invertible_imported_pose() {
        let source = station("StationA", Mat4::identity(), None);
        let mut imported = station("stationa_new", Mat4::zeros(), None);

        let result = align_to_source(&source, &mut imported);
        assert!(matches!(result, Err(AlignmentError::NonInvertible { .. })));
    }
}
