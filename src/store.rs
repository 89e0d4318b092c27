//! On-disk trash store: the `files/` and `info/` directory pair

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::config::TrashConfig;
use crate::error::{Result, TrashError};
use crate::metadata::{TRASHINFO_EXTENSION, TrashInfo, os_bytes, os_from_bytes};

/// A trash directory with its `files/` and `info/` children.
#[derive(Debug, Clone)]
pub struct TrashStore {
    root: PathBuf,
    files_dir: PathBuf,
    info_dir: PathBuf,
}

/// One metadata record as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    pub name: OsString,
    pub original_path: Option<PathBuf>,
    pub deletion_date: Option<NaiveDateTime>,
}

/// Location of a restorable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub original_path: PathBuf,
    pub file_path: PathBuf,
    pub info_path: PathBuf,
}

impl TrashStore {
    /// Open the store described by `config`, creating it on first use.
    pub fn open(config: &TrashConfig) -> Result<Self> {
        Self::at(config.trash_dir())
    }

    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let store = Self {
            files_dir: root.join("files"),
            info_dir: root.join("info"),
            root,
        };
        for dir in [&store.files_dir, &store.info_dir] {
            fs::create_dir_all(dir).map_err(|e| TrashError::io(dir, e))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    pub fn file_path(&self, name: impl AsRef<OsStr>) -> PathBuf {
        self.files_dir.join(name.as_ref())
    }

    pub fn info_path(&self, name: impl AsRef<OsStr>) -> PathBuf {
        let mut file_name = name.as_ref().to_os_string();
        file_name.push(".");
        file_name.push(TRASHINFO_EXTENSION);
        self.info_dir.join(file_name)
    }

    /// Pick a free trashed name derived from `base` and write its metadata.
    ///
    /// The metadata file is created exclusively, so two writers can never
    /// claim the same name. The `files/` side is still only checked for
    /// existence before the caller moves the item in.
    pub fn reserve(&self, base: &OsStr, info: &TrashInfo) -> Result<OsString> {
        let mut counter = 1u32;
        loop {
            let name = disambiguate(base, counter);
            counter += 1;

            if fs::symlink_metadata(self.file_path(&name)).is_ok() {
                continue;
            }
            let info_path = self.info_path(&name);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&info_path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(TrashError::io(info_path, e)),
            };
            if let Err(e) = file.write_all(info.to_ini().as_bytes()) {
                if let Err(cleanup) = fs::remove_file(&info_path) {
                    warn!(path = %info_path.display(), error = %cleanup, "could not remove partial trash info");
                }
                return Err(TrashError::io(info_path, e));
            }
            debug!(name = %name.to_string_lossy(), path = %info_path.display(), "wrote trash info");
            return Ok(name);
        }
    }

    /// Every metadata record, sorted by trashed name. Records are read
    /// lazily and damaged ones come back with empty fields.
    pub fn entries(&self) -> Result<impl Iterator<Item = TrashEntry>> {
        Ok(self.info_names()?.into_iter().map(|(name, path)| {
            let parsed = match fs::read_to_string(&path) {
                Ok(text) => TrashInfo::parse(&text),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable trash info");
                    Default::default()
                }
            };
            TrashEntry {
                name,
                original_path: parsed.original_path,
                deletion_date: parsed.deletion_date,
            }
        }))
    }

    /// Map of trashed name to item location, built from one scan of `info/`.
    /// Records without a usable original path cannot be restored and are left out.
    pub fn lookup(&self) -> Result<BTreeMap<OsString, StoredItem>> {
        let mut items = BTreeMap::new();
        for entry in self.entries()? {
            let Some(original_path) = entry.original_path else {
                warn!(name = %entry.name.to_string_lossy(), "trash info has no usable Path");
                continue;
            };
            let item = StoredItem {
                original_path,
                file_path: self.file_path(&entry.name),
                info_path: self.info_path(&entry.name),
            };
            items.insert(entry.name, item);
        }
        Ok(items)
    }

    /// Paths of everything directly under `files/` and `info/`.
    pub fn contents(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        Ok((list_dir(&self.files_dir)?, list_dir(&self.info_dir)?))
    }

    fn info_names(&self) -> Result<Vec<(OsString, PathBuf)>> {
        let suffix = format!(".{TRASHINFO_EXTENSION}");
        let mut names = list_dir(&self.info_dir)?
            .into_iter()
            .filter_map(|path| {
                let file_name = os_bytes(path.file_name()?);
                let name = file_name.strip_suffix(suffix.as_bytes())?;
                (!name.is_empty()).then(|| (os_from_bytes(name.to_vec()), path.clone()))
            })
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::read_dir(dir)
        .map_err(|e| TrashError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| TrashError::io(dir, e))
}

/// `name.ext` for the first attempt, then `name (2).ext`, `name (3).ext`, ...
fn disambiguate(base: &OsStr, counter: u32) -> OsString {
    if counter < 2 {
        return base.to_os_string();
    }
    let path = Path::new(base);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let mut name = stem.to_os_string();
            name.push(format!(" ({counter})."));
            name.push(ext);
            name
        }
        _ => {
            let mut name = base.to_os_string();
            name.push(format!(" ({counter})"));
            name
        }
    }
}
