//! JSON-backed group store with atomic writes
//!
//! The store owns every [`Group`] by name. Mutations build the next document,
//! write it to a temp file in the target directory, fsync, and rename it
//! over the target. The in-memory copy is only replaced once the rename has
//! succeeded, so a failed write leaves both the file and memory untouched.

use crate::error::{PermissionError, Result};
use crate::group::{Group, GroupMap, PermissionDocument};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// In-memory groups plus their backing file
#[derive(Debug)]
pub struct GroupStore {
    path: PathBuf,
    document: PermissionDocument,
    bootstrap_defaults: bool,
}

impl GroupStore {
    /// Open the document at `path`, creating it if missing
    ///
    /// A missing document is written with the default hierarchy when
    /// `bootstrap_defaults` is set, and as an empty document otherwise.
    pub fn open(path: impl Into<PathBuf>, bootstrap_defaults: bool) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            document: PermissionDocument::default(),
            bootstrap_defaults,
        };
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory document with the file contents
    pub fn load(&mut self) -> Result<()> {
        match read_document(&self.path)? {
            Some(document) => {
                debug!(
                    "Loaded {} groups from {}",
                    document.groups.len(),
                    self.path.display()
                );
                self.document = document;
            }
            None => {
                let document = if self.bootstrap_defaults {
                    PermissionDocument::bootstrap()
                } else {
                    PermissionDocument::default()
                };

                if let Some(parent) = parent_dir(&self.path) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| PermissionError::storage(parent, e))?;
                }

                self.stage(&document)?.commit()?;
                info!(
                    "Created permission document at {} ({} groups)",
                    self.path.display(),
                    document.groups.len()
                );
                self.document = document;
            }
        }
        Ok(())
    }

    /// Write the current document
    pub fn save(&self) -> Result<()> {
        self.stage(&self.document)?.commit()
    }

    /// Serialize `document` to a temp file next to the target
    ///
    /// Nothing is visible at the target path until [`StagedWrite::commit`].
    pub fn stage(&self, document: &PermissionDocument) -> Result<StagedWrite> {
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let mut temp =
            NamedTempFile::new_in(dir).map_err(|e| PermissionError::storage(dir, e))?;

        let temp_path = temp.path().to_path_buf();
        write_document(&mut temp, &temp_path, document)?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PermissionError::storage(temp.path(), e))?;

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }

    /// Persist `groups` and make them current
    pub fn replace(&mut self, groups: GroupMap) -> Result<()> {
        let next = PermissionDocument { groups };
        self.stage(&next)?.commit()?;
        self.document = next;
        Ok(())
    }

    /// Insert or overwrite a group and persist
    ///
    /// Callers check graph invariants before calling.
    pub fn put(&mut self, name: impl Into<String>, group: Group) -> Result<()> {
        let mut groups = self.document.groups.clone();
        groups.insert(name.into(), group);
        self.replace(groups)
    }

    /// Remove a group and persist; returns the removed group
    ///
    /// Callers check for dependents before calling.
    pub fn remove(&mut self, name: &str) -> Result<Option<Group>> {
        let mut groups = self.document.groups.clone();
        let removed = groups.remove(name);
        if removed.is_some() {
            self.replace(groups)?;
        }
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.document.groups.get(name)
    }

    pub fn all(&self) -> &GroupMap {
        &self.document.groups
    }

    pub fn exists(&self, name: &str) -> bool {
        self.document.groups.contains_key(name)
    }

    pub fn document(&self) -> &PermissionDocument {
        &self.document
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A fully written temp file waiting to be renamed over the target
///
/// Dropping it without committing deletes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Temp file location
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically rename the temp file over the target
    ///
    /// The rename is made durable by syncing the parent directory. A failed
    /// directory sync is only logged: the new document is already in place.
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| PermissionError::storage(&target, e.error))?;

        let dir = parent_dir(&target).unwrap_or_else(|| Path::new("."));
        if let Err(e) = sync_dir(dir) {
            warn!("Failed to sync directory {}: {}", dir.display(), e);
        }
        Ok(())
    }
}

/// Write `document` as pretty JSON plus a trailing newline
///
/// Encoding happens in memory, so write failures surface as `StorageIo`.
fn write_document<W: Write>(
    writer: &mut W,
    path: &Path,
    document: &PermissionDocument,
) -> Result<()> {
    let mut bytes =
        serde_json::to_vec_pretty(document).map_err(|e| PermissionError::malformed(path, e))?;
    bytes.push(b'\n');

    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| PermissionError::storage(path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// `None` when the file does not exist
fn read_document(path: &Path) -> Result<Option<PermissionDocument>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PermissionError::storage(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PermissionError::malformed(path, e))
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
