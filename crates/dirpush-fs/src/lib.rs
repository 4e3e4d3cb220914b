//! Filesystem layer for dirpush
//!
//! Provides forward-slash path handling for transfer endpoints, atomic
//! artifact writes, recursive directory copies and format-agnostic
//! configuration storage.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
