//! Move files to a freedesktop.org-compatible trash, list them, restore them,
//! or empty the trash for good.

pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod store;
pub mod trash;

pub use cli::run;
pub use config::TrashConfig;
pub use error::{Result, TrashError};
pub use metadata::TrashInfo;
pub use store::{StoredItem, TrashEntry, TrashStore};
pub use trash::{EmptyReport, MoveOptions, Trashed, empty, list, restore, trash_path, trash_paths};
