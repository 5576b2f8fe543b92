//! Batch input and output formats used by the command-line tool.

pub mod csv;
