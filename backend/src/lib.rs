//! # ldif2csv - flatten LDIF directory exports into CSV
//!
//! Every directory entry becomes one CSV row. Repeated attributes, in the DN
//! or in the body, get numbered columns (`cn1`, `cn2`, `mail1`, ...), and the
//! header is the sorted union of the columns seen in any entry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  LDIF File  │────▶│   Parser    │────▶│   Schema    │────▶│  CSV File   │
//! │ (auto-enc)  │     │ (DN + attrs)│     │   (union)   │     │   (UTF-8)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ldif2csv::{convert, ConvertOptions};
//! use std::path::Path;
//!
//! let result = convert(Path::new("export.ldif"), Path::new("export.csv"), &ConvertOptions::default())?;
//! println!("Converted {} records", result.record_count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - DN groups and flat records
//! - [`parser`] - LDIF record builder with encoding detection
//! - [`transform`] - Column schema, CSV emission and the conversion pipeline
//! - [`config`] - Service configuration
//! - [`api`] - HTTP upload service

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Tabulation
pub mod transform;

// Service
pub mod config;
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConvertError, ConvertResult, ParseError, ServerError, ServerResult};

pub use models::{DnComponents, FlatRecord, SuffixPolicy};

pub use parser::{
    decode_content,
    detect_encoding,
    parse_dn,
    parse_ldif,
    parse_ldif_bytes,
    parse_ldif_file,
    ParseResult,
    RecordBuilder,
};

pub use transform::{
    column_schema,
    convert,
    convert_bytes,
    write_csv,
    write_csv_file,
    Conversion,
    ConvertOptions,
};

pub use config::ServerConfig;

// Server
pub mod server {
    pub use crate::api::server::{build_router, start_server};
}
