//! Document tree records and their persistence.

mod model;
mod sqlite;
mod store;

pub use model::{FileEntry, FileId, Folder, FolderId, NewFile, NewFolder};
pub use sqlite::SqliteTreeStore;
pub use store::TreeStore;
