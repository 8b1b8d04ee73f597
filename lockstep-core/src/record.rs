//! Types and traits for recording metrics.
//!
//! * [`Record`] - a flat, sorted key-value container; the driver returns one in
//!   every step's info, filled with `category/name` scalars when slots are reset
//! * [`RecordValue`] - the value types a record can hold
//! * [`Recorder`] / [`AggregateRecorder`] - destinations for records
//! * [`RecordStorage`] - aggregation of the records of a logging window
//! * [`BufferedRecorder`] - keeps records in memory
//!
//! ```rust
//! use lockstep_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("Episode/length", RecordValue::Scalar(20.0));
//! record.insert("Task/distance", RecordValue::Scalar(1.5));
//! ```
mod base;
mod buffered_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
