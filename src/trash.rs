//! Core trash operations implementation

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::error::{Result, TrashError};
use crate::metadata::TrashInfo;
use crate::store::{StoredItem, TrashEntry, TrashStore};

/// Flags accepted by [`trash_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOptions {
    /// Skip missing paths silently.
    pub force: bool,
    /// Allow directories.
    pub recursive: bool,
}

/// An item that was moved into the trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trashed {
    pub original_path: PathBuf,
    pub name: OsString,
}

/// How an item reached its destination.
#[derive(Debug)]
enum Relocation {
    Renamed,
    /// Copied across filesystems, source removed.
    Copied,
    /// Copied completely, but the source could not be fully removed.
    SourceLeftBehind(TrashError),
}

type Mover = fn(&Path, &Path) -> Result<Relocation>;

/// Outcome of emptying the trash.
#[derive(Debug, Default)]
pub struct EmptyReport {
    pub removed: usize,
    pub failures: Vec<TrashError>,
}

/// Move a file or directory to trash
///
/// The metadata record is written before the move and removed again if the
/// move fails. Returns `Ok(None)` when a missing path is skipped under `force`.
pub fn trash_path(store: &TrashStore, path: &Path, options: MoveOptions) -> Result<Option<Trashed>> {
    trash_path_with(store, path, options, move_path)
}

fn trash_path_with(
    store: &TrashStore,
    path: &Path,
    options: MoveOptions,
    mover: Mover,
) -> Result<Option<Trashed>> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if options.force {
                debug!(path = %path.display(), "skipping missing path");
                return Ok(None);
            }
            return Err(TrashError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(TrashError::io(path, e)),
    };
    if metadata.is_dir() && !options.recursive {
        return Err(TrashError::IsDirectory(path.to_path_buf()));
    }

    let original_path = absolute_path(path)?;
    let store_root = store
        .root()
        .canonicalize()
        .map_err(|e| TrashError::io(store.root(), e))?;
    if original_path.starts_with(&store_root) || store_root.starts_with(&original_path) {
        return Err(TrashError::Refused(path.to_path_buf()));
    }

    let base = original_path
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| TrashError::Refused(path.to_path_buf()))?;
    let name = store.reserve(&base, &TrashInfo::now(&original_path))?;

    match mover(&original_path, &store.file_path(&name)) {
        Ok(Relocation::SourceLeftBehind(e)) => {
            // The trashed copy is whole, so its record stays.
            warn!(path = %original_path.display(), error = %e, "trashed a full copy but part of the original remains");
        }
        Ok(_) => {}
        Err(e) => {
            let info_path = store.info_path(&name);
            if let Err(rollback) = fs::remove_file(&info_path) {
                warn!(path = %info_path.display(), error = %rollback, "could not roll back trash info");
            }
            return Err(e);
        }
    }
    debug!(from = %original_path.display(), name = %name.to_string_lossy(), "moved to trash");
    Ok(Some(Trashed { original_path, name }))
}

/// Trash every path independently, collecting one result per path.
pub fn trash_paths<P: AsRef<Path>>(
    store: &TrashStore,
    paths: &[P],
    options: MoveOptions,
) -> Vec<Result<Option<Trashed>>> {
    paths
        .iter()
        .map(|path| trash_path(store, path.as_ref(), options))
        .collect()
}

/// Current trash contents, re-read from disk on every call.
pub fn list(store: &TrashStore) -> Result<impl Iterator<Item = TrashEntry>> {
    store.entries()
}

/// Restore named items to their original locations.
///
/// Never overwrites an existing path and never creates missing parent
/// directories. Each name gets its own result.
pub fn restore<S: AsRef<OsStr>>(
    store: &TrashStore,
    names: &[S],
) -> Result<Vec<(OsString, Result<PathBuf>)>> {
    let mut items = store.lookup()?;
    Ok(names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            (name.to_os_string(), restore_one(&mut items, name, move_path))
        })
        .collect())
}

fn restore_one(items: &mut BTreeMap<OsString, StoredItem>, name: &OsStr, mover: Mover) -> Result<PathBuf> {
    let display_name = name.to_string_lossy().into_owned();
    let item = items
        .get(name)
        .cloned()
        .ok_or_else(|| TrashError::UnknownItem(display_name.clone()))?;
    let destination = item.original_path;

    let parent = destination.parent().unwrap_or(Path::new(""));
    if !parent.is_dir() {
        return Err(TrashError::MissingParent {
            name: display_name,
            parent: parent.to_path_buf(),
        });
    }
    // TODO: rename(2) with RENAME_NOREPLACE would close the gap between this
    // check and the move below.
    if fs::symlink_metadata(&destination).is_ok() {
        return Err(TrashError::DestinationExists {
            name: display_name,
            destination,
        });
    }
    if fs::symlink_metadata(&item.file_path).is_err() {
        return Err(TrashError::MissingTrashedFile(display_name));
    }

    if let Relocation::SourceLeftBehind(e) = mover(&item.file_path, &destination)? {
        // Restored in full; what is left in files/ goes with the next empty.
        warn!(name = %display_name, error = %e, "restored, but part of the trashed copy remains");
    }
    if let Err(e) = fs::remove_file(&item.info_path) {
        warn!(path = %item.info_path.display(), error = %e, "restored item left its trash info behind");
    }
    items.remove(name);
    debug!(name = %display_name, to = %destination.display(), "restored from trash");
    Ok(destination)
}

/// Empty trash folder permanently
///
/// Every entry under `files/` and `info/` is removed on its own; failures are
/// logged and collected rather than stopping the rest.
pub fn empty(store: &TrashStore) -> Result<EmptyReport> {
    let (files, infos) = store.contents()?;
    let mut report = EmptyReport::default();

    let pb = ProgressBar::new((files.len() + infos.len()) as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.red/yellow}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("Emptying Trash...");

    for path in files.into_iter().chain(infos) {
        match remove_path(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                report.removed += 1;
            }
            Err(e) => {
                warn!(error = %e, "could not remove trash entry");
                report.failures.push(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(report)
}

/// Absolute path of `path` with its parent resolved, leaving the last
/// component alone so a symlink is trashed rather than its target.
fn absolute_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| TrashError::Refused(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = parent.canonicalize().map_err(|e| TrashError::io(parent, e))?;
    Ok(parent.join(name))
}

/// Rename `from` to `to`, copying then deleting when they sit on different
/// filesystems.
fn move_path(from: &Path, to: &Path) -> Result<Relocation> {
    match fs::rename(from, to) {
        Ok(()) => Ok(Relocation::Renamed),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "crossing filesystems, copying");
            copy_then_remove(from, to, remove_path)
        }
        Err(e) => Err(TrashError::io(from, e)),
    }
}

/// Only a failed copy is an error; a partial copy is cleaned up and the
/// source is untouched. Failing to remove the source afterwards is reported
/// as [`Relocation::SourceLeftBehind`].
fn copy_then_remove(from: &Path, to: &Path, remove_source: fn(&Path) -> Result<()>) -> Result<Relocation> {
    if let Err(e) = copy_recursive(from, to) {
        if fs::symlink_metadata(to).is_ok() {
            if let Err(cleanup) = remove_path(to) {
                warn!(path = %to.display(), error = %cleanup, "could not remove partial copy");
            }
        }
        return Err(e);
    }
    match remove_source(from) {
        Ok(()) => Ok(Relocation::Copied),
        Err(e) => Ok(Relocation::SourceLeftBehind(e)),
    }
}

fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(from).map_err(|e| TrashError::io(from, e))?;
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        copy_symlink(from, to)
    } else if file_type.is_dir() {
        fs::create_dir(to).map_err(|e| TrashError::io(to, e))?;
        for entry in fs::read_dir(from).map_err(|e| TrashError::io(from, e))? {
            let entry = entry.map_err(|e| TrashError::io(from, e))?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        fs::set_permissions(to, metadata.permissions()).map_err(|e| TrashError::io(to, e))
    } else {
        fs::copy(from, to).map(drop).map_err(|e| TrashError::io(from, e))
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from).map_err(|e| TrashError::io(from, e))?;
    std::os::unix::fs::symlink(target, to).map_err(|e| TrashError::io(to, e))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map(drop).map_err(|e| TrashError::io(from, e))
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| TrashError::io(path, e))?;
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| TrashError::io(path, e))
}
