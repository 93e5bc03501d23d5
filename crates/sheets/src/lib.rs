//! Append-only row logging against a remote spreadsheet.

pub mod http;
pub mod sink;
