use crate::drivers::PlotterError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends accepted samples to a CSV file, one row per sample.
pub struct CsvRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    rows: u64,
}

impl CsvRecorder {
    pub fn new() -> Self {
        Self { writer: None, path: None, rows: 0 }
    }

    /// Open `path` in append mode, closing any file that was already open.
    pub fn start(&mut self, path: &Path) -> Result<(), PlotterError> {
        self.stop();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PlotterError::CsvOpen {
                path: path.display().to_string(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| PlotterError::CsvOpen {
                path: path.display().to_string(),
                source,
            })?;
        self.writer = Some(BufWriter::new(file));
        self.path = Some(path.to_path_buf());
        self.rows = 0;
        log::info!("💾 Recording to {}", path.display());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut w) = self.writer.take() {
            if let Err(err) = w.flush() {
                log::warn!("failed to flush csv file: {err}");
            }
            log::info!("💾 Recording closed ({} rows).", self.rows);
        }
        self.path = None;
    }

    /// Write one row and flush it; a no-op when no file is open.
    pub fn write_record(&mut self, data: &[f64]) -> Result<(), PlotterError> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        let mut row = String::with_capacity(data.len() * 8);
        for (i, val) in data.iter().enumerate() {
            if i > 0 {
                row.push(',');
            }
            row.push_str(&format!("{val:?}"));
        }
        row.push('\n');
        w.write_all(row.as_bytes())
            .and_then(|_| w.flush())
            .map_err(PlotterError::CsvWrite)?;
        self.rows += 1;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for CsvRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CsvRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
