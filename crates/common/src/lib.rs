//! Common utilities used across the meridian workspace.
//!
//! This crate provides the word, address and hex conversions shared by the trie, the virtual
//! machine and the command line interface, together with a few file helpers.

/// General utility functions and types for common tasks.
pub mod utils;
