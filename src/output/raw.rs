//! Raw per-page artifacts
//!
//! Diagnostic copies of every fetched body, named `{label}_p{page}.json`.

use std::path::{Path, PathBuf};

/// Writes raw response bodies into one directory
#[derive(Debug, Clone)]
pub struct RawArtifactWriter {
    dir: PathBuf,
}

impl RawArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic artifact path for a unit label and page
    pub fn artifact_path(&self, label: &str, page: u32) -> PathBuf {
        self.dir.join(format!("{}_p{}.json", label, page))
    }

    /// Writes one body, creating the directory if needed
    pub fn write(&self, label: &str, page: u32, body: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.artifact_path(label, page);
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directory() {
        let dir = TempDir::new().unwrap();
        let writer = RawArtifactWriter::new(dir.path().join("raw"));

        let path = writer.write("new_york", 3, r#"{"events":[]}"#).unwrap();

        assert_eq!(path, dir.path().join("raw").join("new_york_p3.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), r#"{"events":[]}"#);
    }

    #[test]
    fn test_rewrite_same_page_overwrites() {
        let dir = TempDir::new().unwrap();
        let writer = RawArtifactWriter::new(dir.path());

        writer.write("oslo", 0, "first").unwrap();
        let path = writer.write("oslo", 0, "second").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }
}
