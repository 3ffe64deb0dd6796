//! Column schema and CSV emission.
//!
//! The header is the sorted union of every column any record carries.
//! Rows follow record order; absent columns are written as empty strings.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::ConvertError;
use crate::models::FlatRecord;

/// Sorted union of all column names across `records`.
pub fn column_schema(records: &[FlatRecord]) -> Vec<String> {
    let columns: BTreeSet<&str> = records.iter().flat_map(|r| r.columns()).collect();
    columns.into_iter().map(String::from).collect()
}

/// Write `records` as CSV to `writer` and return the header used.
///
/// An empty record set produces a single empty header line.
pub fn write_csv<W: Write>(records: &[FlatRecord], mut writer: W) -> Result<Vec<String>, csv::Error> {
    let header = column_schema(records);

    if header.is_empty() {
        writer.write_all(b"\r\n")?;
        writer.flush()?;
        return Ok(header);
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    csv_writer.write_record(&header)?;
    for record in records {
        csv_writer.write_record(header.iter().map(|column| record.get_or(column, "")))?;
    }
    csv_writer.flush()?;

    Ok(header)
}

/// Write `records` to `path`, truncating any previous file there.
///
/// Any IO failure, at open time or mid-write, is reported as
/// [`ConvertError::Io`] for `path`.
pub fn write_csv_file(records: &[FlatRecord], path: &Path) -> Result<Vec<String>, ConvertError> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    write_csv(records, file).map_err(|e| output_error(path, e))
}

fn output_error(path: &Path, err: csv::Error) -> ConvertError {
    if !err.is_io_error() {
        return ConvertError::Csv(err);
    }
    let source = match err.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
    };
    ConvertError::io(path, source)
}
