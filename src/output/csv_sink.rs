//! Consolidated CSV dataset
//!
//! All workers append into one file through a single lock. Each batch is
//! serialized in memory first and lands with one write, so a failed or
//! interrupted append never leaves half a batch behind a later one.

use crate::output::traits::{ResultRow, ResultSink, SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only CSV sink with a fixed column list
pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
    file: Mutex<Option<File>>,
}

impl CsvSink {
    /// Prepares a sink for `path`
    ///
    /// The file is created on the first non-empty append. An existing file
    /// must carry exactly the same header.
    ///
    /// # Errors
    ///
    /// * `HeaderMismatch` - the existing dataset was written with other columns
    pub fn open(path: impl Into<PathBuf>, columns: &[&str]) -> SinkResult<Self> {
        let path = path.into();
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();

        if let Some(found) = read_header(&path)? {
            if found != columns {
                return Err(SinkError::HeaderMismatch {
                    path: path.display().to_string(),
                    found: found.join(","),
                    expected: columns.join(","),
                });
            }
            tracing::debug!("Appending to existing dataset {}", path.display());
        }

        Ok(Self {
            path,
            columns,
            file: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, rows: &[ResultRow], with_header: bool) -> SinkResult<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut buffer);
            if with_header {
                writer.write_record(&self.columns)?;
            }
            for row in rows {
                writer.write_record(row.to_record(&self.columns))?;
            }
            writer.flush()?;
        }
        Ok(buffer)
    }
}

impl ResultSink for CsvSink {
    fn append(&self, rows: &[ResultRow]) -> SinkResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut guard = self.file.lock().map_err(|_| SinkError::Poisoned)?;
        if guard.is_none() {
            *guard = Some(open_for_append(&self.path)?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(SinkError::Poisoned);
        };

        let with_header = file.metadata()?.len() == 0;
        let buffer = self.encode(rows, with_header)?;
        file.write_all(&buffer)?;
        file.flush()?;

        tracing::trace!("Appended {} rows to {}", rows.len(), self.path.display());
        Ok(rows.len())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Reads the header record of an existing, non-empty dataset
fn read_header(path: &Path) -> SinkResult<Option<Vec<String>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    match reader.records().next() {
        Some(record) => Ok(Some(record?.iter().map(|f| f.to_string()).collect())),
        None => Ok(None),
    }
}

/// Opens the dataset for appending, terminating a torn final row first
fn open_for_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            tracing::warn!("Dataset {} ends with a partial row", path.display());
            file.write_all(b"\n")?;
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    const COLUMNS: &[&str] = &["city", "country", "page", "name"];

    fn row(city: &str, page: u32, name: &str) -> ResultRow {
        ResultRow::new()
            .with("city", city)
            .with("page", page.to_string())
            .with("name", name)
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");

        let sink = CsvSink::open(&path, COLUMNS).unwrap();
        sink.append(&[row("Lyon", 0, "Jazz, live")]).unwrap();
        drop(sink);

        let sink = CsvSink::open(&path, COLUMNS).unwrap();
        sink.append(&[row("Lyon", 1, "Opera")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "city,country,page,name\nLyon,,0,\"Jazz, live\"\nLyon,,1,Opera\n"
        );
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");

        let sink = CsvSink::open(&path, COLUMNS).unwrap();
        assert_eq!(sink.append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_header_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "eventId,categoryId\n1,2\n").unwrap();

        let result = CsvSink::open(&path, COLUMNS);
        assert!(matches!(result, Err(SinkError::HeaderMismatch { .. })));
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "").unwrap();

        let sink = CsvSink::open(&path, COLUMNS).unwrap();
        sink.append(&[row("Kyoto", 0, "Noh")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("city,country,page,name\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_concurrent_appends_keep_whole_rows() {
        const WORKERS: usize = 8;
        const ROWS: usize = 25;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        let sink = Arc::new(CsvSink::open(&path, COLUMNS).unwrap());

        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..ROWS {
                        let name = format!("worker {} row {}, with comma", worker, i);
                        sink.append(&[row("Paris", i as u32, &name)]).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());

        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), WORKERS * ROWS);
        assert!(records.iter().all(|r| r.len() == COLUMNS.len()));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("city,country,page,name").count(), 1);
    }

    #[test]
    fn test_torn_row_terminated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "city,country,page,name\nNice,FR,0,Ba").unwrap();

        let sink = CsvSink::open(&path, COLUMNS).unwrap();
        sink.append(&[row("Nice", 1, "Ballet")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("\nNice,,1,Ballet\n"));
    }
}
