//! Filesystem entry storage.
//!
//! Each entry is two files in the storage root:
//! - body at `{root}/{id}.txt`
//! - metadata sidecar at `{root}/{id}.meta.json`
//!
//! Only names that parse as `{EntryId}.txt` count as entries. Anything else in the
//! directory (credential files, stray editor backups) is left alone.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::entries::id::{EntryId, EntryIdGenerator};
use crate::entries::metadata::EntryMetadata;

pub const BODY_SUFFIX: &str = ".txt";
pub const METADATA_SUFFIX: &str = ".meta.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry body is empty")]
    EmptyBody,

    #[error("entry not found: {0}")]
    NotFound(EntryId),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Entry repository rooted at one directory.
#[derive(Debug)]
pub struct EntryStore {
    root: PathBuf,
    ids: EntryIdGenerator,
    /// Shared by in-flight stores, exclusive for trim. A trim never runs
    /// between a store's body and sidecar writes.
    writes: RwLock<()>,
}

impl EntryStore {
    /// Open (creating if needed) the storage root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            ids: EntryIdGenerator::new(),
            writes: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn body_path(&self, id: &EntryId) -> PathBuf {
        self.root.join(format!("{id}{BODY_SUFFIX}"))
    }

    pub fn metadata_path(&self, id: &EntryId) -> PathBuf {
        self.root.join(format!("{id}{METADATA_SUFFIX}"))
    }

    /// Persist a new entry: body first, then the sidecar. The sidecar's
    /// timestamp is set to the id's.
    ///
    /// If the sidecar cannot be written the body is removed again, so a failed
    /// store never leaves a body without metadata behind.
    pub fn store(&self, body: &[u8], mut metadata: EntryMetadata) -> Result<EntryId, StoreError> {
        if body.is_empty() {
            return Err(StoreError::EmptyBody);
        }

        let _guard = self.writes.read().unwrap_or_else(PoisonError::into_inner);
        let id = self.ids.next();
        metadata.timestamp = id.timestamp();
        self.store_as(id, body, &metadata)?;
        tracing::debug!("Stored entry {} ({} bytes)", id, body.len());
        Ok(id)
    }

    fn store_as(&self, id: EntryId, body: &[u8], metadata: &EntryMetadata) -> Result<(), StoreError> {
        let sidecar = serde_json::to_vec_pretty(metadata)?;
        let body_path = self.body_path(&id);

        if let Err(e) = write_new_file(&body_path, body) {
            // An existing file under this name belongs to someone else.
            if e.kind() != io::ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&body_path);
            }
            return Err(StoreError::io(&body_path, e));
        }

        let metadata_path = self.metadata_path(&id);
        if let Err(e) = write_via_rename(&metadata_path, &sidecar) {
            if let Err(cleanup) = fs::remove_file(&body_path) {
                tracing::error!(
                    "Failed to remove body {} after sidecar failure: {}",
                    body_path.display(),
                    cleanup
                );
            }
            return Err(StoreError::io(&metadata_path, e));
        }
        Ok(())
    }

    /// All entries, newest first.
    ///
    /// Ordered by body mtime descending; equal mtimes fall back to the id, whose
    /// sequence is monotonic.
    pub fn list(&self) -> Result<Vec<EntryId>, StoreError> {
        let dir = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut entries: Vec<(SystemTime, EntryId)> = Vec::new();
        for dirent in dir {
            let dirent = dirent.map_err(|e| StoreError::io(&self.root, e))?;
            let name = dirent.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_suffix(BODY_SUFFIX))
                .and_then(|stem| stem.parse::<EntryId>().ok())
            else {
                continue;
            };

            let modified = match dirent.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                // Removed between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(&dirent.path(), e)),
            };
            entries.push((modified, id));
        }

        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries.into_iter().map(|(_, id)| id).collect())
    }

    /// Delete the oldest entries until at most `max_entries` remain.
    ///
    /// Returns the number of entries removed. A sidecar that is already gone is
    /// skipped; the body is what makes an entry count.
    pub fn trim(&self, max_entries: usize) -> Result<usize, StoreError> {
        let _guard = self.writes.write().unwrap_or_else(PoisonError::into_inner);

        let ids = self.list()?;
        if ids.len() <= max_entries {
            return Ok(0);
        }

        let mut removed = 0;
        for id in &ids[max_entries..] {
            let body_path = self.body_path(id);
            match fs::remove_file(&body_path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&body_path, e)),
            }

            let metadata_path = self.metadata_path(id);
            match fs::remove_file(&metadata_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&metadata_path, e)),
            }
        }

        Ok(removed)
    }

    /// Raw body and last-modified time of an entry.
    pub fn read(&self, id: &EntryId) -> Result<(Vec<u8>, DateTime<Utc>), StoreError> {
        let path = self.body_path(id);
        let not_found = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(*id)
            } else {
                StoreError::io(&path, e)
            }
        };

        let body = fs::read(&path).map_err(not_found)?;
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(not_found)?;
        Ok((body, DateTime::<Utc>::from(modified)))
    }

    /// Sidecar of an entry, `None` when it is missing.
    pub fn read_metadata(&self, id: &EntryId) -> Result<Option<EntryMetadata>, StoreError> {
        let path = self.metadata_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

/// Write `data` to a file that must not exist yet.
fn write_new_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Write to a dot-prefixed temporary name, then rename into place, so readers
/// never see a partially written file under the final name.
fn write_via_rename(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid file name"))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = write_new_file(&tmp, data).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
