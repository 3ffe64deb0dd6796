//! ldif2csv CLI - Convert LDIF exports to CSV
//!
//! ```bash
//! ldif2csv convert export.ldif             # Write export.csv
//! ldif2csv convert export.ldif -o out.csv  # Explicit output path
//! ldif2csv parse export.ldif               # Dump flat records as JSON
//! ldif2csv schema export.ldif              # Print the CSV header
//! ldif2csv serve                           # Start upload server (port 5000)
//! ```

use clap::{Parser, Subcommand};
use ldif2csv::{
    column_schema, convert, parse_ldif_file, ConvertOptions, ServerConfig, SuffixPolicy,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ldif2csv")]
#[command(about = "Flatten LDIF directory exports into CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an LDIF file to CSV
    Convert {
        /// Input LDIF file
        input: PathBuf,

        /// Output CSV file (default: input with .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Numbering of repeated keys: exact-key or legacy-prefix
        #[arg(long, default_value = "exact-key")]
        suffix_policy: SuffixPolicy,
    },

    /// Parse an LDIF file and output its flat records as JSON
    Parse {
        /// Input LDIF file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Numbering of repeated keys: exact-key or legacy-prefix
        #[arg(long, default_value = "exact-key")]
        suffix_policy: SuffixPolicy,
    },

    /// Print the CSV header an LDIF file would produce
    Schema {
        /// Input LDIF file
        input: PathBuf,

        /// Numbering of repeated keys: exact-key or legacy-prefix
        #[arg(long, default_value = "exact-key")]
        suffix_policy: SuffixPolicy,
    },

    /// Start HTTP upload server
    Serve {
        /// Port to listen on (default: LDIF2CSV_PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for uploaded files
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// Directory for converted files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Directory holding index.html
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            suffix_policy,
        } => cmd_convert(&input, output.as_deref(), suffix_policy),

        Commands::Parse {
            input,
            output,
            suffix_policy,
        } => cmd_parse(&input, output.as_deref(), suffix_policy),

        Commands::Schema {
            input,
            suffix_policy,
        } => cmd_schema(&input, suffix_policy),

        Commands::Serve {
            port,
            upload_dir,
            output_dir,
            static_dir,
        } => cmd_serve(port, upload_dir, output_dir, static_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    suffix_policy: SuffixPolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("csv"));
    let options = ConvertOptions { suffix_policy };

    let result = convert(input, &output, &options)?;

    eprintln!("   Columns: {}", result.columns.join(", "));
    eprintln!(
        "✅ Converted {} records to {}",
        result.record_count,
        result.output_path.display()
    );
    Ok(())
}

fn cmd_parse(
    input: &Path,
    output: Option<&Path>,
    suffix_policy: SuffixPolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing LDIF: {}", input.display());

    let result = parse_ldif_file(input, suffix_policy)?;
    eprintln!("   Encoding: {}", result.encoding);
    if result.ignored_lines > 0 {
        eprintln!("   Ignored lines: {}", result.ignored_lines);
    }
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_schema(input: &Path, suffix_policy: SuffixPolicy) -> Result<(), Box<dyn std::error::Error>> {
    let result = parse_ldif_file(input, suffix_policy)?;
    for column in column_schema(&result.records) {
        println!("{}", column);
    }
    Ok(())
}

async fn cmd_serve(
    port: Option<u16>,
    upload_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = upload_dir {
        config.upload_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = static_dir {
        config.static_dir = dir;
    }

    ldif2csv::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
