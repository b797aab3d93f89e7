//! TLS station replacement pipeline.
//!
//! This crate provides tools for:
//! - Discovering E57 scan deliveries and matching them case-insensitively
//!   to existing TLS stations in a project chunk
//! - Importing matched scans as new point-cloud stations
//! - Re-aligning each imported station onto the pose of the station it
//!   replaces (closed-form transform composition, no fitting)
//! - Transferring per-camera masks from the original to the imported station
//!
//! # Example
//!
//! ```no_run
//! use station_replace::{run_replace, E57Importer, ReplaceConfig};
//! use station_replace::core::loaders::load_chunk;
//! use std::path::Path;
//!
//! let mut chunk = load_chunk(Path::new("project.yaml")).unwrap();
//! let config = ReplaceConfig::default();
//! let report = run_replace(
//!     &mut chunk,
//!     Path::new("scans/"),
//!     &E57Importer::new(),
//!     &config,
//!     false,
//! )
//! .unwrap();
//! println!("replaced {} station(s)", report.replaced.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{AlignmentConfig, ImportConfig, LabelConfig, MaskConfig, PairingMode, ReplaceConfig};
pub use core::chunk::{Camera, Chunk, Mask, Station};
pub use core::loaders::{E57Importer, ScanImporter};
pub use processors::replace::{run_replace, ReplaceReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
