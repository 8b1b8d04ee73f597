//! Step logs.
//!
//! A [`Record`] is the flat, string-keyed mapping the driver hands to its caller
//! whenever slots are reset (the `log` entry of a step's info), and the unit that
//! recorders store and aggregate.
use crate::error::LockstepError;
use std::collections::{
    btree_map::{Iter, Keys},
    BTreeMap,
};

/// Value of a [`Record`] entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A metric, finalized over one or more episodes.
    Scalar(f32),

    /// Per-slot or per-goal values.
    Array1(Vec<f32>),

    /// Free text, e.g. a plugin tag.
    String(String),
}

/// Log entries keyed by `category/name`.
///
/// Keys are kept sorted, so iterating over a record is deterministic.
///
/// ```rust
/// use lockstep_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("Task/distance", 0.5);
/// record.insert("Robot/action_rate", RecordValue::Scalar(0.1));
///
/// assert_eq!(record.get_scalar("Task/distance").unwrap(), 0.5);
/// assert_eq!(record.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, RecordValue>);

impl Record {
    /// A record without entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A record with the single metric `key`.
    pub fn from_scalar(key: impl Into<String>, value: f32) -> Self {
        let mut record = Self::empty();
        record.insert(key, RecordValue::Scalar(value));
        record
    }

    /// Builds a record from `(key, value)` pairs; later pairs win.
    pub fn from_slice<K: Into<String> + Clone>(entries: &[(K, RecordValue)]) -> Self {
        let mut record = Self::empty();
        for (k, v) in entries {
            record.insert(k.clone(), v.clone());
        }
        record
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Sets `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: RecordValue) {
        self.0.insert(key.into(), value);
    }

    /// Entries in key order.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.0.get(key)
    }

    /// Moves the entries of `other` into this record. On a shared key the value
    /// of `other` is kept.
    pub fn merge(&mut self, other: Record) {
        self.0.extend(other.0);
    }

    /// Metric stored under `key`.
    pub fn get_scalar(&self, key: &str) -> Result<f32, LockstepError> {
        match self.0.get(key) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(LockstepError::RecordValueTypeError("Scalar".to_string())),
            None => Err(LockstepError::RecordKeyError(key.to_string())),
        }
    }

    /// Text stored under `key`.
    pub fn get_string(&self, key: &str) -> Result<String, LockstepError> {
        match self.0.get(key) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(LockstepError::RecordValueTypeError("String".to_string())),
            None => Err(LockstepError::RecordKeyError(key.to_string())),
        }
    }

    /// Whether the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` unless some metric or array element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.0.values().all(|v| match v {
            RecordValue::Scalar(x) => x.is_finite(),
            RecordValue::Array1(xs) => xs.iter().all(|x| x.is_finite()),
            RecordValue::String(_) => true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_keeps_incoming_values() {
        let mut r = Record::from_slice(&[
            ("a", RecordValue::Scalar(1.0)),
            ("b", RecordValue::Scalar(2.0)),
        ]);
        r.merge(Record::from_scalar("b", 3.0));

        assert_eq!(r.get_scalar("a").unwrap(), 1.0);
        assert_eq!(r.get_scalar("b").unwrap(), 3.0);
        assert_eq!(r.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_typed_getters() {
        let mut r = Record::empty();
        r.insert("name", RecordValue::String("jetbot".into()));
        r.insert("xs", RecordValue::Array1(vec![1.0, f32::NAN]));

        assert_eq!(r.get_string("name").unwrap(), "jetbot");
        assert_eq!(
            r.get_scalar("name"),
            Err(LockstepError::RecordValueTypeError("Scalar".into()))
        );
        assert_eq!(
            r.get_scalar("missing"),
            Err(LockstepError::RecordKeyError("missing".into()))
        );
        assert!(!r.is_finite());
    }
}
