//! Pipeline processing modules.

pub mod alignment;
pub mod masks;
pub mod matching;
pub mod replace;

// Re-export key types for convenience
pub use alignment::{align_to_source, Alignment, AlignmentError};
pub use masks::{clear_masks, transfer_masks, MaskTransferSummary};
pub use matching::{index_laser_stations, match_candidate, StationIndex};
pub use replace::{run_replace, ReplaceError, ReplaceReport, ReplacedStation, SkipReason, SkippedFile};
