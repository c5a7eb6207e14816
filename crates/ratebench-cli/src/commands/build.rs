use ratebench_ingest::build_store;
use ratebench_store::{Store, StoreConfig};

use crate::cli::BuildArgs;
use crate::error::CliError;

use super::render_json;

pub fn run(args: &BuildArgs, pretty: bool) -> Result<(), CliError> {
    if !args.source_dir.is_dir() {
        return Err(CliError::Configuration(format!(
            "source directory not found: {}",
            args.source_dir.display()
        )));
    }

    let store = Store::create(StoreConfig::at(&args.db))?;
    let report = build_store(&store, &args.source_dir)?;

    println!("{}", render_json(&report, pretty)?);
    Ok(())
}
