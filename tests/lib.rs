// Shared fixtures for ratebench behavior tests.
pub use ratebench_core::{
    resolve_lookup, LookupKey, LookupOutcome, MatchType, Percentiles, RateRow, RateStore,
};
pub use ratebench_ingest::{build_store, IngestError};
pub use ratebench_store::{Store, StoreConfig};

use std::fs;
use std::path::Path;

/// Build a store from CSV text fixtures written under `<root>/source`.
pub fn store_from_csv(root: &Path, files: &[(&str, &str)]) -> Store {
    let source_dir = root.join("source");
    fs::create_dir_all(&source_dir).expect("create source dir");
    for (name, contents) in files {
        fs::write(source_dir.join(name), contents).expect("write fixture");
    }

    let store = Store::create(StoreConfig::at(root.join("rates.duckdb"))).expect("create store");
    build_store(&store, &source_dir).expect("build store");
    store
}

pub fn key(geozip: i64, codes: &[&str], modifier: Option<&str>, product: Option<&str>) -> LookupKey {
    LookupKey::new(
        geozip,
        codes.iter().map(|code| code.to_string()).collect(),
        modifier.map(String::from),
        product.map(String::from),
    )
    .expect("valid lookup key")
}
