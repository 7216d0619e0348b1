//! Personnel spreadsheet import

pub mod spreadsheet;

pub use spreadsheet::{from_json_rows, read_csv, ImportRow};
