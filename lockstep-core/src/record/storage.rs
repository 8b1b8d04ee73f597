//! Aggregation of the step logs of a logging window.
use super::{Record, RecordValue};
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

struct Entry {
    sum: f32,
    count: u32,
    latest: RecordValue,
}

/// Folds the records of a logging window into one.
///
/// Step logs are sparse: a key appears only at the steps where some slot
/// finished an episode. Aggregation therefore works per key over the records
/// that contain it:
///
/// * if the last value of a key is a scalar, the scalars of that key are averaged,
/// * otherwise the last value is kept.
#[derive(Default)]
pub struct RecordStorage {
    records: usize,
    entries: HashMap<String, Entry, Xxh3Builder>,
}

impl RecordStorage {
    /// An empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `record` into the window.
    pub fn store(&mut self, record: Record) {
        for (k, v) in record.iter() {
            let entry = self.entries.entry(k.clone()).or_insert_with(|| Entry {
                sum: 0.0,
                count: 0,
                latest: v.clone(),
            });
            if let RecordValue::Scalar(x) = v {
                entry.sum += x;
                entry.count += 1;
            }
            entry.latest = v.clone();
        }
        self.records += 1;
    }

    /// Number of records stored since the last aggregation.
    pub fn len(&self) -> usize {
        self.records
    }

    /// `true` if nothing was stored since the last aggregation.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Returns the aggregate of the window and starts a new one.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();
        for (k, entry) in self.entries.drain() {
            let value = match entry.latest {
                RecordValue::Scalar(_) => RecordValue::Scalar(entry.sum / entry.count as f32),
                other => other,
            };
            record.insert(k, value);
        }
        self.records = 0;
        record
    }
}
