//! End-to-end replacement flow against real E57 files on disk.

use e57::{E57Writer, Record, RecordValue};
use nalgebra::Vector3;
use std::fs;
use std::path::Path;

use station_replace::core::loaders::load_chunk;
use station_replace::core::transforms::{transforms_close, Mat4};
use station_replace::core::writers::save_chunk;
use station_replace::{run_replace, E57Importer, ReplaceConfig};

fn write_e57(path: &Path, file_guid: &str, scan_guid: &str, points: usize) {
    let mut writer = E57Writer::from_file(path, file_guid).unwrap();
    let prototype = vec![
        Record::CARTESIAN_X_F64,
        Record::CARTESIAN_Y_F64,
        Record::CARTESIAN_Z_F64,
    ];
    let mut pc_writer = writer.add_pointcloud(scan_guid, prototype).unwrap();
    for i in 0..points {
        let v = i as f64 * 0.1;
        pc_writer
            .add_point(vec![
                RecordValue::Double(v),
                RecordValue::Double(-v),
                RecordValue::Double(1.0 + v),
            ])
            .unwrap();
    }
    pc_writer.finalize().unwrap();
    writer.finalize().unwrap();
}

fn write_manifest(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("cam_01_mask.png"), b"mask-one").unwrap();
    fs::write(dir.join("cam_02_mask.png"), b"mask-two").unwrap();

    let manifest = "\
chunk: Yard
stations:
  - label: StationA
    transform:
      - [1.0, 0.0, 0.0, 12.5]
      - [0.0, 1.0, 0.0, -3.0]
      - [0.0, 0.0, 1.0, 0.75]
      - [0.0, 0.0, 0.0, 1.0]
    group_transform:
      - [1.0, 0.0, 0.0, 100.0]
      - [0.0, 1.0, 0.0, 0.0]
      - [0.0, 0.0, 1.0, 0.0]
      - [0.0, 0.0, 0.0, 1.0]
    cameras:
      - label: cam_01
        mask: cam_01_mask.png
      - label: cam_02
        mask: cam_02_mask.png
";
    let path = dir.join("project.yaml");
    fs::write(&path, manifest).unwrap();
    path
}

#[test]
fn replace_flow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();

    let scans = dir.path().join("scans");
    fs::create_dir(&scans).unwrap();
    // Case-mismatched delivery for StationA plus one scan nobody asked for.
    write_e57(
        &scans.join("stationa.e57"),
        "d4f8a1e2-9b35-4d63-8e41-2f60ac0d51b7",
        "7a2f3c44-1d9e-4a1b-9f25-63c8d0b7e9a1",
        4,
    );
    write_e57(
        &scans.join("StationZ.e57"),
        "0be07a64-5b8a-43d2-9a77-41c2f8d6e3b5",
        "c91d2e83-7f40-4b6a-b2d5-08a64f17c9e2",
        2,
    );

    let manifest_path = write_manifest(dir.path());
    let mut chunk = load_chunk(&manifest_path).unwrap();
    let source_effective = chunk.stations()[0].effective_transform();

    let config = ReplaceConfig::default();
    let report = run_replace(&mut chunk, &scans, &E57Importer::new(), &config, false).unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.replaced.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].file, "StationZ.e57");

    let replaced = &report.replaced[0];
    assert_eq!(replaced.source_label, "StationA");
    assert_eq!(replaced.new_label, "stationa_new");
    assert!(replaced.aligned);

    // The written E57 carries no embedded images, so the new station has no
    // cameras to receive masks; that is a flagged partial failure, not an
    // abort.
    assert!(replaced.masks.count_mismatch);
    assert_eq!(
        replaced.masks.unmatched,
        vec!["cam_01".to_string(), "cam_02".to_string()]
    );

    assert_eq!(chunk.stations().len(), 2);
    let imported = &chunk.stations()[1];
    assert_eq!(imported.label, "stationa_new");
    assert_eq!(imported.points, 4);
    assert!(transforms_close(
        &imported.effective_transform(),
        &source_effective,
        config.alignment.tolerance
    ));

    // Saving and reloading keeps the replacement.
    let out_path = dir.path().join("project_updated.yaml");
    save_chunk(&out_path, &chunk).unwrap();

    let reloaded = load_chunk(&out_path).unwrap();
    assert_eq!(reloaded.stations().len(), 2);

    let persisted = &reloaded.stations()[1];
    assert_eq!(persisted.label, "stationa_new");
    assert!(transforms_close(
        &persisted.effective_transform(),
        &source_effective,
        1e-6
    ));
    assert_eq!(
        reloaded.stations()[0].cameras[0].mask.as_ref().unwrap().data,
        b"mask-one"
    );
}

#[test]
fn replace_flow_no_matches_is_clean() {
    let dir = tempfile::tempdir().unwrap();

    let scans = dir.path().join("scans");
    fs::create_dir(&scans).unwrap();
    write_e57(
        &scans.join("StationZ.e57"),
        "5a1b9c2d-3e4f-4a5b-8c7d-6e5f4a3b2c1d",
        "8f7e6d5c-4b3a-4291-a0b1-c2d3e4f5a6b7",
        2,
    );

    let manifest_path = write_manifest(dir.path());
    let mut chunk = load_chunk(&manifest_path).unwrap();

    let config = ReplaceConfig::default();
    let report = run_replace(&mut chunk, &scans, &E57Importer::new(), &config, false).unwrap();

    assert!(report.replaced.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(chunk.stations().len(), 1);

    let source = &chunk.stations()[0];
    assert_eq!(source.cameras[0].mask.as_ref().unwrap().data, b"mask-one");
    assert_eq!(source.transform[(0, 3)], 12.5);
}

#[test]
fn group_transform_is_preserved_through_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(dir.path());

    let chunk = load_chunk(&manifest_path).unwrap();
    let station = &chunk.stations()[0];

    let expected = Mat4::new_translation(&Vector3::new(112.5, -3.0, 0.75));
    assert!(transforms_close(&station.effective_transform(), &expected, 1e-12));
}
