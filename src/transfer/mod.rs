//! Transfer module
//!
//! Upload placement and ranged download streaming.

pub mod file_ops;
pub mod range;
pub mod results;

// Re-export key types and functions
pub use file_ops::{candidate_name, place_uploads, sanitize_filename};
pub use range::{ByteSpan, DEFAULT_CHUNK_SIZE, StreamPlan, parse_range, prepare_stream};
pub use results::{UploadFailure, UploadItem, UploadReport};
