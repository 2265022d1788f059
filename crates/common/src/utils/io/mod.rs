/// File reading, writing and deletion helpers.
pub mod file;
