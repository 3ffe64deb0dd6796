//! Tabulation module.
//!
//! - Schema: column union and CSV emission
//! - Pipeline: the `convert` entry points

pub mod pipeline;
pub mod schema;

pub use pipeline::*;
pub use schema::{column_schema, write_csv, write_csv_file};
