//! Navigate module
//!
//! Handles directory listing for clients: enumeration, classification,
//! ordering and the breadcrumb trail.

mod classify;
mod operations;
mod results;
mod sort;

// Re-export public types and functions
pub use classify::{classify, extension_of};
pub use operations::{build_breadcrumbs, list_directory};
pub use results::{Breadcrumb, Entry, EntryKind, Listing};
pub use sort::natural_cmp;
