//! Append-only text checkpoint
//!
//! One entry per line: `primary,secondary,cursor_or_done`. The last numeric
//! entry of a unit is authoritative; a `done` entry is sticky. Entries are
//! never rewritten, so a write torn by a crash can only damage the final
//! line, which `load` skips.

use crate::checkpoint::traits::{ProgressMap, ProgressStore, StoreError, StoreResult};
use crate::state::ResumeState;
use crate::unit::UnitKey;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File-backed progress store
pub struct FileProgressStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Lazily opened append handle
    file: Option<File>,

    /// Last known state of every unit, kept in step with the file
    states: ProgressMap,
}

impl FileProgressStore {
    /// Creates a store for the given checkpoint path
    ///
    /// Nothing is read or created until `load` or the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(Inner {
                file: None,
                states: ProgressMap::new(),
            }),
        }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Appends one entry and updates the in-memory state
    fn append(&self, inner: &mut Inner, key: &UnitKey, state: ResumeState) -> StoreResult<()> {
        if inner.file.is_none() {
            inner.file = Some(open_for_append(&self.path)?);
        }

        let line = format!("{},{}\n", key, state.to_checkpoint_field());
        if let Some(file) = inner.file.as_mut() {
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }

        inner.states.insert(key.clone(), state);
        Ok(())
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> StoreResult<ProgressMap> {
        let mut inner = self.lock()?;

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}, starting fresh", self.path.display());
                inner.states.clear();
                return Ok(ProgressMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let progress = parse_checkpoint(&content);
        inner.states = progress.clone();

        let complete = progress.values().filter(|s| s.is_complete()).count();
        tracing::info!(
            "Loaded checkpoint {}: {} pending, {} complete",
            self.path.display(),
            progress.len() - complete,
            complete
        );

        Ok(progress)
    }

    fn record(&self, key: &UnitKey, next_page: u32) -> StoreResult<()> {
        if !key.is_storable() {
            return Err(StoreError::InvalidKey(key.clone()));
        }

        let mut inner = self.lock()?;
        match inner.states.get(key) {
            Some(ResumeState::Complete) => return Err(StoreError::AlreadyComplete(key.clone())),
            Some(ResumeState::Pending(current)) if next_page < *current => {
                return Err(StoreError::CursorRegression {
                    key: key.clone(),
                    current: *current,
                    requested: next_page,
                });
            }
            _ => {}
        }

        self.append(&mut inner, key, ResumeState::Pending(next_page))
    }

    fn complete(&self, key: &UnitKey) -> StoreResult<()> {
        if !key.is_storable() {
            return Err(StoreError::InvalidKey(key.clone()));
        }

        let mut inner = self.lock()?;
        if inner.states.get(key) == Some(&ResumeState::Complete) {
            return Ok(());
        }

        self.append(&mut inner, key, ResumeState::Complete)
    }

    fn state(&self, key: &UnitKey) -> ResumeState {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.states.get(key).copied())
            .unwrap_or(ResumeState::START)
    }

    fn clear(&self) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.file = None;
        inner.states.clear();

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parses checkpoint content, skipping malformed lines
///
/// Every append ends with a newline, so text after the last newline is a
/// torn write and is ignored even when it happens to parse.
fn parse_checkpoint(content: &str) -> ProgressMap {
    let mut progress = ProgressMap::new();

    let content = if content.is_empty() || content.ends_with('\n') {
        content
    } else {
        let end = content.rfind('\n').map_or(0, |i| i + 1);
        tracing::warn!("Ignoring torn checkpoint entry: {}", &content[end..]);
        &content[..end]
    };

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 3 || parts[0].is_empty() || parts[1].is_empty() {
            tracing::warn!("Invalid checkpoint entry at line {}: {}", line_num + 1, line);
            continue;
        }

        let Some(state) = ResumeState::from_checkpoint_field(parts[2]) else {
            tracing::warn!("Invalid checkpoint cursor at line {}: {}", line_num + 1, line);
            continue;
        };

        let key = UnitKey::new(parts[0], parts[1]);
        match progress.get(&key) {
            Some(ResumeState::Complete) => {}
            _ => {
                progress.insert(key, state);
            }
        }
    }

    progress
}

/// Opens the checkpoint for appending, terminating a torn final line first
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
            file.write_all(b"\n")?;
        }
    }

    Ok(file)
}
