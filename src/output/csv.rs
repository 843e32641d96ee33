//! CSV record sink
//!
//! Writes one file per profile, `{dir}/{handle}.csv`, with a header row and
//! every field double-quoted.

use crate::harvest::HarvestOutcome;
use crate::item::RECORD_COLUMNS;
use crate::output::traits::{OutputResult, RecordSink};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes a single row, quoting every cell and doubling embedded quotes.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        write!(w, "\"{}\"", cell.as_ref().replace('"', "\"\""))?;
    }
    writeln!(w)
}

/// CSV file sink for one profile
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing `{dir}/{handle}.csv`
    pub fn new(dir: &Path, handle: &str) -> Self {
        Self {
            path: dir.join(format!("{}.csv", handle)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn write_outcome(&mut self, outcome: &HarvestOutcome) -> OutputResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        write_row(&mut writer, &RECORD_COLUMNS)?;
        for record in &outcome.records {
            write_row(&mut writer, &record.to_row())?;
        }
        writer.flush()?;

        info!(
            "Wrote {} records to {}",
            outcome.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
