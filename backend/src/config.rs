//! Service configuration.
//!
//! Values come from the environment, with defaults suitable for local use.
//! `main` loads any `.env` file before reading them; CLI flags override them.

use std::env;
use std::path::PathBuf;

use crate::models::SuffixPolicy;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Maximum accepted upload size (50 MB).
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Name given to the CSV returned by the upload endpoint.
pub const DOWNLOAD_NAME: &str = "converted_output.csv";

/// Upload service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Where uploaded LDIF files are stored
    pub upload_dir: PathBuf,
    /// Where per-request CSV files are written
    pub output_dir: PathBuf,
    /// Directory holding `index.html`
    pub static_dir: PathBuf,
    /// Numbering of repeated attribute keys
    pub suffix_policy: SuffixPolicy,
    /// Keep uploaded files after conversion
    pub keep_uploads: bool,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            static_dir: PathBuf::from("static"),
            suffix_policy: SuffixPolicy::default(),
            keep_uploads: true,
            max_upload_bytes: MAX_FILE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `LDIF2CSV_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("LDIF2CSV_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| format!("Invalid LDIF2CSV_PORT: {}", port))?;
        }
        if let Some(dir) = lookup("LDIF2CSV_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LDIF2CSV_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LDIF2CSV_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(policy) = lookup("LDIF2CSV_SUFFIX_POLICY") {
            config.suffix_policy = policy.parse()?;
        }
        if let Some(keep) = lookup("LDIF2CSV_KEEP_UPLOADS") {
            config.keep_uploads = parse_bool(&keep)
                .ok_or_else(|| format!("Invalid LDIF2CSV_KEEP_UPLOADS: {}", keep))?;
        }
        if let Some(limit) = lookup("LDIF2CSV_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = limit
                .trim()
                .parse()
                .map_err(|_| format!("Invalid LDIF2CSV_MAX_UPLOAD_BYTES: {}", limit))?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
