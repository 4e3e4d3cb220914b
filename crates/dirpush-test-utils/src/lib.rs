//! Shared test utilities for the dirpush workspace.
//!
//! This crate provides standardised fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`project`]: [`project::TestProject`] builder laying out a source
//!   directory, a fake remote directory and an invocation working directory

pub mod project;
