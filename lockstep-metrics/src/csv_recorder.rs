use anyhow::{anyhow, Result};
use csv::WriterBuilder;
use lockstep_core::record::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use log::{trace, warn};
use std::{
    fs::{create_dir_all, File},
    io::Write,
    path::{Path, PathBuf},
};

/// Name of the metrics table in a run directory.
pub const METRICS_FILE: &str = "metrics.csv";

const WINDOW: &str = "window";

/// Writes aggregated step logs as rows of a CSV table.
///
/// The columns are `window` followed by the sorted scalar keys of the first
/// written row. They do not change afterwards: keys that appear later are
/// dropped with a warning and keys missing from a row are left empty.
///
/// A row is written with a single write to the output. A failed write leaves
/// the table as it was; the first failure is kept and returned by
/// [`CsvRecorder::finish`].
pub struct CsvRecorder<W: Write = File> {
    path: PathBuf,
    out: W,
    storage: RecordStorage,
    columns: Option<Vec<String>>,
    error: Option<anyhow::Error>,
}

impl CsvRecorder<File> {
    /// Creates `metrics.csv` in `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(METRICS_FILE);
        let out = File::create(&path)?;
        Ok(Self::from_writer(out, path))
    }
}

impl<W: Write> CsvRecorder<W> {
    /// Writes the table to `out`; `path` names it in messages.
    pub fn from_writer(out: W, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            out,
            storage: RecordStorage::new(),
            columns: None,
            error: None,
        }
    }

    /// Path of the metrics table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Columns of the table, fixed once the first row has been written.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Flushes the output and returns the first write failure, if any.
    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        match self.error.take() {
            Some(e) => Err(e.context(format!("writing {:?}", self.path))),
            None => Ok(()),
        }
    }

    fn header(record: &Record) -> Vec<String> {
        let mut columns = vec![WINDOW.to_string()];
        columns.extend(
            record
                .iter()
                .filter(|(k, v)| k.as_str() != WINDOW && matches!(v, RecordValue::Scalar(_)))
                .map(|(k, _)| k.clone()),
        );
        columns
    }

    fn write_row(&mut self, record: &Record) -> Result<()> {
        let is_new = self.columns.is_none();
        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => Self::header(record),
        };

        for k in record.keys().filter(|k| !columns.contains(k)) {
            warn!("Metric {} is not a column of {:?}, dropped", k, self.path);
        }
        let row: Vec<String> = columns
            .iter()
            .map(|k| match record.get(k) {
                Some(RecordValue::Scalar(v)) => v.to_string(),
                Some(RecordValue::String(s)) => s.clone(),
                _ => String::new(),
            })
            .collect();

        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(vec![]);
        if is_new {
            wtr.write_record(&columns)?;
        }
        wtr.write_record(&row)?;
        let bytes = wtr.into_inner().map_err(|e| anyhow!("{}", e.error()))?;

        self.out.write_all(&bytes)?;
        self.out.flush()?;
        if is_new {
            self.columns = Some(columns);
        }
        Ok(())
    }
}

impl<W: Write> Recorder for CsvRecorder<W> {
    fn write(&mut self, record: Record) {
        if let Err(e) = self.write_row(&record) {
            warn!("Failed to write a row to {:?}: {}", self.path, e);
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }
}

impl<W: Write> AggregateRecorder for CsvRecorder<W> {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, window: i64) {
        trace!("CsvRecorder::flush()");
        if self.storage.is_empty() {
            return;
        }
        let mut record = self.storage.aggregate();
        record.insert(WINDOW, RecordValue::Scalar(window as f32));
        self.write(record);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use csv::ReaderBuilder;
    use std::{
        cell::{Cell, RefCell},
        io,
        rc::Rc,
    };
    use tempdir::TempDir;

    fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut rdr = ReaderBuilder::new().has_headers(false).from_path(path)?;
        let mut rows = vec![];
        for row in rdr.records() {
            rows.push(row?.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    #[test]
    fn test_columns_are_stable_across_flushes() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let mut recorder = CsvRecorder::new(dir.path())?;

        recorder.store(Record::from_scalar("Task/distance", 1.0));
        recorder.store(Record::from_slice(&[
            ("Task/distance", RecordValue::Scalar(3.0)),
            ("Episode/length", RecordValue::Scalar(5.0)),
        ]));
        recorder.flush(0);

        // a new key is dropped, a known one is missing
        recorder.store(Record::from_scalar("Task/distance", 0.5));
        recorder.store(Record::from_scalar("Task/goals_reached", 2.0));
        recorder.flush(1);

        // nothing stored, nothing written
        recorder.flush(2);

        assert_eq!(
            recorder.columns(),
            Some(&["window".to_string(), "Episode/length".into(), "Task/distance".into()][..])
        );
        let rows = read_rows(recorder.path())?;
        assert_eq!(
            rows,
            vec![
                vec!["window", "Episode/length", "Task/distance"],
                vec!["0", "5", "2"],
                vec!["1", "", "0.5"],
            ]
        );
        Ok(())
    }

    #[test]
    fn test_non_scalar_values_do_not_become_columns() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let mut recorder = CsvRecorder::new(dir.path().join("run"))?;
        recorder.write(Record::from_slice(&[
            ("Task/alive", RecordValue::Scalar(1.0)),
            ("Task/trace", RecordValue::Array1(vec![1.0, 2.0])),
        ]));

        assert_eq!(
            read_rows(&dir.path().join("run").join(METRICS_FILE))?,
            vec![vec!["window", "Task/alive"], vec!["", "1"]]
        );
        Ok(())
    }

    #[derive(Clone, Default)]
    struct FlakyWriter {
        buf: Rc<RefCell<Vec<u8>>>,
        failures: Rc<Cell<usize>>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.buf.borrow_mut().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_leaves_table_unchanged() {
        let out = FlakyWriter::default();
        out.failures.set(1);
        let mut recorder = CsvRecorder::from_writer(out.clone(), "metrics.csv");

        recorder.write(Record::from_scalar("Task/alive", 1.0));
        assert_eq!(recorder.columns(), None);
        assert!(out.buf.borrow().is_empty());

        recorder.write(Record::from_scalar("Task/alive", 2.0));
        recorder.write(Record::from_scalar("Task/alive", 3.0));
        let text = String::from_utf8(out.buf.borrow().clone()).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["window,Task/alive", ",2", ",3"]
        );

        let err = recorder.finish().unwrap_err();
        assert!(format!("{:?}", err).contains("disk full"));
    }

    #[test]
    fn test_finish_without_failure() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let mut recorder = CsvRecorder::new(dir.path())?;
        recorder.write(Record::from_scalar("Task/alive", 1.0));
        recorder.finish()
    }
}
