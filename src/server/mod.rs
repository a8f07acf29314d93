//! Server core functionality
//!
//! This module contains the HTTP server, its routes and the request
//! handlers that bridge into the file manager components.

pub mod core;
pub mod handlers;

pub use core::{AppState, Server, router};
