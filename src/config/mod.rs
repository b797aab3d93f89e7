//! Configuration types for the station replacement pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How cameras of the source and imported station are paired for mask copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMode {
    /// Pair cameras positionally after sorting both sides by (label, key).
    ByIndex,
    /// Pair cameras whose normalized labels are equal.
    ByLabel,
}

/// Configuration for scan file discovery and import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// File extensions recognized as importable scans (matched case-insensitively)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["e57".to_string()]
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

/// Configuration for labeling newly imported stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Suffix appended to the base filename for the first imported asset
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// First numeric value tried when de-duplicating a colliding label
    #[serde(default = "default_counter_start")]
    pub counter_start: usize,

    /// Zero-padded width of the numeric de-duplication suffix
    #[serde(default = "default_counter_width")]
    pub counter_width: usize,
}

fn default_suffix() -> String {
    "_new".to_string()
}

fn default_counter_start() -> usize {
    2
}

fn default_counter_width() -> usize {
    2
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            counter_start: default_counter_start(),
            counter_width: default_counter_width(),
        }
    }
}

/// Configuration for mask transfer between stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Camera pairing rule used when copying masks
    #[serde(default = "default_pairing")]
    pub pairing: PairingMode,
}

fn default_pairing() -> PairingMode {
    PairingMode::ByIndex
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            pairing: default_pairing(),
        }
    }
}

/// Configuration for pose alignment checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Maximum per-entry deviation tolerated when comparing transforms
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceConfig {
    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub labels: LabelConfig,

    #[serde(default)]
    pub masks: MaskConfig,

    #[serde(default)]
    pub alignment: AlignmentConfig,
}

impl ReplaceConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ReplaceConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
