use super::Record;

/// Destination of finished records, e.g. a table on disk.
pub trait Recorder {
    /// Writes one record.
    fn write(&mut self, record: Record);
}

/// Collects step logs over a logging window and writes their aggregate when
/// the window closes.
pub trait AggregateRecorder {
    /// Adds the log of one step to the current window.
    fn store(&mut self, record: Record);

    /// Closes window number `window`.
    fn flush(&mut self, window: i64);
}
