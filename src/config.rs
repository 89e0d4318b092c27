//! Trash location configuration

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrashError};

/// Where the trash store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashConfig {
    data_home: PathBuf,
}

impl TrashConfig {
    pub fn new(data_home: impl Into<PathBuf>) -> Self {
        Self {
            data_home: data_home.into(),
        }
    }

    /// Resolve the data home from `XDG_DATA_HOME`, falling back to
    /// `~/.local/share`.
    pub fn from_env() -> Result<Self> {
        let xdg = env::var_os("XDG_DATA_HOME").map(PathBuf::from);
        Self::resolve(xdg, dirs::home_dir())
    }

    fn resolve(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> Result<Self> {
        // Relative or empty values are invalid per the XDG base directory rules.
        if let Some(xdg) = xdg_data_home.filter(|p| p.is_absolute()) {
            return Ok(Self::new(xdg));
        }
        let home = home.ok_or(TrashError::NoHomeDirectory)?;
        Ok(Self::new(home.join(".local").join("share")))
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.data_home.join("Trash")
    }

    pub fn data_home(&self) -> &Path {
        &self.data_home
    }
}
