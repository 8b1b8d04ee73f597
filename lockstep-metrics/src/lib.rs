#![warn(missing_docs)]
//! Exports of a rollout to the filesystem.
//!
//! A run directory holds two files:
//!
//! * `metrics.csv` - one row per logging window, written by [`CsvRecorder`]
//! * `metadata.yaml` - the shape of the run, written by [`RunMetadata`]
mod csv_recorder;
mod metadata;
pub use csv_recorder::{CsvRecorder, METRICS_FILE};
pub use metadata::{RunMetadata, METADATA_FILE};
