//! CLI argument definitions for ratebench.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `build` | Ingest spreadsheet rate tables into the store |
//! | `serve` | Run the HTTP lookup service |
//! | `lookup` | Resolve codes once and print the result |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Reference-rate lookup service: benchmark allowed amounts by geozip,
/// procedure code, modifier, and product line.
#[derive(Debug, Parser)]
#[command(name = "ratebench", author, version, about)]
pub struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rebuild the rate store from a directory of source spreadsheets.
    Build(BuildArgs),
    /// Serve the lookup API and UI over HTTP.
    Serve(ServeArgs),
    /// Resolve one lookup against the store and print the matches.
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Directory containing *.csv / *.xlsx rate tables.
    #[arg(long, default_value = "data/source")]
    pub source_dir: PathBuf,

    /// Database file to (re)build.
    #[arg(long, default_value = "data/allowed_amounts.duckdb")]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Database file built by `ratebench build`.
    #[arg(long, default_value = "data/allowed_amounts.duckdb")]
    pub db: PathBuf,

    /// UI document served at /.
    #[arg(long, default_value = "frontend/index.html")]
    pub ui: PathBuf,

    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub addr: String,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Database file built by `ratebench build`.
    #[arg(long, default_value = "data/allowed_amounts.duckdb")]
    pub db: PathBuf,

    /// Geographic pricing zone.
    #[arg(long)]
    pub geozip: i64,

    /// Procedure code; repeat for a batch lookup.
    #[arg(long = "code", required = true)]
    pub codes: Vec<String>,

    /// Billing modifier.
    #[arg(long)]
    pub modifier: Option<String>,

    /// Product line filter.
    #[arg(long)]
    pub product: Option<String>,
}
