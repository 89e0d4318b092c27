//! `.trashinfo` metadata records
//!
//! The format is shared with every other freedesktop.org trash implementation,
//! so key names, the group header and the percent-encoding must not change.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

pub const TRASHINFO_EXTENSION: &str = "trashinfo";
pub const TRASHINFO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const GROUP_HEADER: &str = "[Trash Info]";

/// Metadata written alongside every trashed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashInfo {
    pub original_path: PathBuf,
    pub deletion_date: NaiveDateTime,
}

/// Fields recovered from a metadata file that may be damaged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInfo {
    pub original_path: Option<PathBuf>,
    pub deletion_date: Option<NaiveDateTime>,
}

impl TrashInfo {
    /// Record for an item deleted now, in local time.
    pub fn now(original_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            deletion_date: Local::now().naive_local(),
        }
    }

    pub fn to_ini(&self) -> String {
        format!(
            "{GROUP_HEADER}\nPath={}\nDeletionDate={}\n",
            encode_path(&self.original_path),
            self.deletion_date.format(TRASHINFO_TIME_FORMAT),
        )
    }

    /// Parse a metadata file leniently. Keys outside the `[Trash Info]` group
    /// and unknown keys are ignored; bad values come back as `None`.
    pub fn parse(text: &str) -> ParsedInfo {
        let mut parsed = ParsedInfo::default();
        let mut in_group = false;

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_group = line == GROUP_HEADER;
                continue;
            }
            if !in_group {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "Path" if parsed.original_path.is_none() => {
                    parsed.original_path = decode_path(value.trim());
                }
                "DeletionDate" if parsed.deletion_date.is_none() => {
                    parsed.deletion_date =
                        NaiveDateTime::parse_from_str(value.trim(), TRASHINFO_TIME_FORMAT).ok();
                }
                _ => {}
            }
        }
        parsed
    }
}

/// Percent-encode each path component, keeping `/` separators as they are.
/// Works on raw bytes so names that are not valid UTF-8 survive.
pub fn encode_path(path: &Path) -> String {
    os_bytes(path.as_os_str())
        .split(|&b| b == b'/')
        .map(|component| urlencoding::encode_binary(component).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn decode_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        return None;
    }
    let bytes = urlencoding::decode_binary(value.as_bytes()).into_owned();
    Some(PathBuf::from(os_from_bytes(bytes)))
}

#[cfg(unix)]
pub(crate) fn os_bytes(os: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(os.as_bytes())
}

#[cfg(unix)]
pub(crate) fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
pub(crate) fn os_bytes(os: &OsStr) -> Cow<'_, [u8]> {
    match os.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(not(unix))]
pub(crate) fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}
