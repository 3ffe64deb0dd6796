//! High-level conversion API: LDIF in, CSV out.
//!
//! Two phases, both synchronous: the whole input is parsed into memory,
//! then the schema is computed and the CSV written.
//!
//! # Example
//!
//! ```rust,ignore
//! use ldif2csv::{convert, ConvertOptions};
//! use std::path::Path;
//!
//! let result = convert(
//!     Path::new("export.ldif"),
//!     Path::new("export.csv"),
//!     &ConvertOptions::default(),
//! )?;
//! println!("Converted {} records", result.record_count);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::schema::write_csv_file;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::ConvertError;
use crate::models::SuffixPolicy;
use crate::parser::{parse_ldif_bytes, parse_ldif_file, ParseResult};

/// Options for a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ConvertOptions {
    /// How repeated attribute keys are numbered
    #[serde(default)]
    pub suffix_policy: SuffixPolicy,
}

/// Result of a completed conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    /// Number of records written as rows
    pub record_count: usize,

    /// Where the CSV was written
    pub output_path: PathBuf,

    /// CSV header, sorted
    pub columns: Vec<String>,

    /// Encoding the input was decoded from
    pub encoding: String,
}

/// Convert an LDIF file to CSV at `output`.
///
/// The output file is created or truncated. Callers handling concurrent
/// requests must give each one its own `output` path.
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    log_info(format!("📖 Reading LDIF file: {}", input.display()));
    let parsed = parse_ldif_file(input, options.suffix_policy)?;
    write_parsed(parsed, output)
}

/// Convert in-memory LDIF bytes to CSV at `output`.
pub fn convert_bytes(
    bytes: &[u8],
    output: &Path,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    log_info(format!("📖 Reading {} bytes of LDIF", bytes.len()));
    let parsed = parse_ldif_bytes(bytes, options.suffix_policy)?;
    write_parsed(parsed, output)
}

fn write_parsed(parsed: ParseResult, output: &Path) -> Result<Conversion, ConvertError> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Parsed {} records", parsed.records.len()));
    if parsed.ignored_lines > 0 {
        log_warning(format!("{} lines ignored", parsed.ignored_lines));
    }

    log_info(format!("📝 Writing CSV: {}", output.display()));
    let columns = write_csv_file(&parsed.records, output)?;
    log_success(format!("{} columns, {} rows", columns.len(), parsed.records.len()));
    for (i, column) in columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, column), 1);
    }

    Ok(Conversion {
        record_count: parsed.records.len(),
        output_path: output.to_path_buf(),
        columns,
        encoding: parsed.encoding,
    })
}
