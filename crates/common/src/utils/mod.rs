/// Input/output utilities for file manipulation.
pub mod io;

/// Hex encoding and decoding utilities.
pub mod strings;

/// Conversions between 256-bit words, addresses and byte slices.
pub mod words;
