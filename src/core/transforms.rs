//! Rigid transform composition for station alignment.
//!
//! This module provides the 4x4 homogeneous transform operations the
//! pipeline needs: composing a group transform with a station-local
//! transform into an effective transform, computing the delta that moves an
//! imported scan onto the pose of the station it replaces, and applying
//! that delta multiplicatively. No iterative fitting happens anywhere; the
//! replacement scan corresponds to the same physical station, so pose
//! transfer is a closed-form composition.

use nalgebra::{Isometry3, Matrix4, Quaternion, Translation3, UnitQuaternion};

/// 4x4 homogeneous transform in double precision.
pub type Mat4 = Matrix4<f64>;

/// Compose the effective transform taking a station's local frame to the
/// project reference frame.
///
/// When the station belongs to a group, the effective transform is
/// `group * local`; otherwise it is the local transform alone.
pub fn effective_transform(group: Option<&Mat4>, local: &Mat4) -> Mat4 {
    match group {
        Some(g) => g * local,
        None => *local,
    }
}

/// Compute the delta that maps an imported station onto a source pose.
///
/// Solves `delta * imported_effective == source_effective`, i.e.
/// `delta = source_effective * imported_effective⁻¹`.
///
/// Returns `None` if the imported effective transform is not invertible.
pub fn pose_delta(source_effective: &Mat4, imported_effective: &Mat4) -> Option<Mat4> {
    imported_effective
        .try_inverse()
        .map(|inv| source_effective * inv)
}

/// Apply a delta on the left of a transform: `delta * transform`.
pub fn apply_delta(delta: &Mat4, transform: &Mat4) -> Mat4 {
    delta * transform
}

/// Compare two transforms entry-wise against a tolerance.
pub fn transforms_close(a: &Mat4, b: &Mat4, tolerance: f64) -> bool {
    (a - b).iter().all(|v| v.abs() <= tolerance)
}

/// Build a transform from a unit quaternion rotation and a translation.
///
/// This is the pose representation E57 scan headers carry.
pub fn from_rotation_translation(w: f64, x: f64, y: f64, z: f64, t: [f64; 3]) -> Mat4 {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
    let translation = Translation3::new(t[0], t[1], t[2]);
    Isometry3::from_parts(translation, rotation).to_homogeneous()
}

/// Pretty-print a transform as four bracketed rows for the console log.
pub fn format_matrix(m: &Mat4) -> String {
    let mut rows = Vec::with_capacity(4);
    for r in 0..4 {
        let row: Vec<String> = (0..4).map(|c| format!("{: .6}", m[(r, c)])).collect();
        rows.push(format!("[ {} ]", row.join("  ")));
    }
    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn translation(x: f64, y: f64, z: f64) -> Mat4 {
        Mat4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn test_effective_transform_without_group() {
        let local = translation(1.0, 2.0, 3.0);
        let eff = effective_transform(None, &local);
        assert_relative_eq!(eff, local);
    }

    #[test]
    fn test_effective_transform_with_group() {
        let group = translation(10.0, 0.0, 0.0);
        let local = translation(1.0, 2.0, 3.0);

        let eff = effective_transform(Some(&group), &local);
        assert_relative_eq!(eff, translation(11.0, 2.0, 3.0));
    }

    #[test]
    fn test_pose_delta_recovers_source_pose() {
        let source = from_rotation_translation(0.9238795, 0.0, 0.0, 0.3826834, [5.0, -2.0, 1.5]);
        let imported = translation(100.0, 200.0, 300.0);

        let delta = pose_delta(&source, &imported).unwrap();
        let aligned = apply_delta(&delta, &imported);

        assert_relative_eq!(aligned, source, epsilon = 1e-9);
    }

    #[test]
    fn test_pose_delta_identity_when_poses_match() {
        let pose = from_rotation_translation(1.0, 0.0, 0.0, 0.0, [3.0, 4.0, 5.0]);
        let delta = pose_delta(&pose, &pose).unwrap();
        assert_relative_eq!(delta, Mat4::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_pose_delta_singular_transform() {
        let source = Mat4::identity();
        let singular = Mat4::zeros();
        assert!(pose_delta(&source, &singular).is_none());
    }

    #[test]
    fn test_transforms_close() {
        let a = translation(1.0, 2.0, 3.0);
        let mut b = a;
        b[(0, 3)] += 1e-12;

        assert!(transforms_close(&a, &b, 1e-9));
        assert!(!transforms_close(&a, &translation(1.1, 2.0, 3.0), 1e-9));
    }

    #[test]
    fn test_from_rotation_translation_identity() {
        let m = from_rotation_translation(1.0, 0.0, 0.0, 0.0, [0.0, 0.0, 0.0]);
        assert_relative_eq!(m, Mat4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_format_matrix_shape() {
        let text = format_matrix(&Mat4::identity());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("[ "));
        assert!(lines[0].contains("1.000000"));
        assert!(lines[3].ends_with(" ]"));
    }
}
