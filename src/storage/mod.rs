//! File system storage management
//!
//! Path confinement plus the create-folder, rename and delete operations.

pub mod filesystem;
pub mod operations;
pub mod permissions;
pub mod results;
pub mod validation;

pub use operations::{create_folder, delete_entry, rename_entry};
pub use results::{DeleteFailure, DeleteReport, MutationResult};
pub use validation::{EntryName, ResolvedPath, Root};
