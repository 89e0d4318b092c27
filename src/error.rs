//! Errors reported by trash operations

use std::io;
use std::path::PathBuf;

/// Failure of a single trash operation.
///
/// Most variants describe one item of a batch and are reported without
/// aborting the rest of the batch.
#[derive(thiserror::Error, Debug)]
pub enum TrashError {
    #[error("cannot trash '{}': no such file or directory", .0.display())]
    NotFound(PathBuf),

    #[error("cannot trash '{}': is a directory (use -r)", .0.display())]
    IsDirectory(PathBuf),

    #[error("refusing to trash '{}'", .0.display())]
    Refused(PathBuf),

    #[error("'{0}' is not in the trash")]
    UnknownItem(String),

    #[error("cannot restore '{name}': original directory does not exist: {}", .parent.display())]
    MissingParent { name: String, parent: PathBuf },

    #[error("cannot restore '{name}': destination already exists: {}", .destination.display())]
    DestinationExists { name: String, destination: PathBuf },

    #[error("cannot restore '{0}': trashed file is missing")]
    MissingTrashedFile(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine the home directory")]
    NoHomeDirectory,

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl TrashError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrashError>;
