use ratebench_core::{resolve_lookup, LookupKey};
use ratebench_store::{Store, StoreConfig};

use crate::cli::LookupArgs;
use crate::error::CliError;

use super::render_json;

pub fn run(args: &LookupArgs, pretty: bool) -> Result<(), CliError> {
    let key = LookupKey::new(
        args.geozip,
        args.codes.clone(),
        args.modifier.clone(),
        args.product.clone(),
    )?;

    let store = Store::open(StoreConfig::at(&args.db))?;
    let outcome = resolve_lookup(&store, &key)?;

    // One-off lookups append synchronously; there is no server to hand the
    // entries to.
    store.append_log(&outcome.log)?;

    println!("{}", render_json(&outcome.matches, pretty)?);
    Ok(())
}
