//! JSON sweep report.
//!
//! Values are stored column-major as `f64` so each labelled column is a
//! contiguous run of `rows` values. NaN cells are written as `null`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use nanosweep::{BackendKind, DType};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sweep::SweepOutput;

/// A completed sweep as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub kind: String,
    pub backend: BackendKind,
    pub dtype: DType,
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl Report {
    pub fn from_output(output: SweepOutput) -> Self {
        let (rows, cols) = output.buffer.shape();
        let dtype = output.buffer.dtype();
        let values = output
            .buffer
            .into_f64()
            .t()
            .iter()
            .map(|v| (!v.is_nan()).then_some(*v))
            .collect();
        Self {
            generated_at: Utc::now(),
            kind: output.kind.to_string(),
            backend: output.backend,
            dtype,
            rows,
            cols,
            columns: output.columns,
            values,
        }
    }

    /// Column `j` by position, or `None` if out of range.
    pub fn column(&self, j: usize) -> Option<&[Option<f64>]> {
        (j < self.cols).then(|| &self.values[j * self.rows..(j + 1) * self.rows])
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| Error::ReportWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        writer.flush().map_err(write_err)?;
        Ok(())
    }

    /// Read a report written by [`Report::write`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::ReportRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::ReportParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
