use std::net::SocketAddr;
use std::sync::Arc;

use ratebench_core::StoreError;
use ratebench_store::{Store, StoreConfig};
use ratebench_web::{serve, AppState};

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(args: &ServeArgs) -> Result<(), CliError> {
    let addr: SocketAddr = args
        .addr
        .parse()
        .map_err(|_| CliError::Configuration(format!("invalid listen address '{}'", args.addr)))?;

    if !args.ui.is_file() {
        return Err(CliError::Configuration(format!(
            "UI document not found at {}",
            args.ui.display()
        )));
    }

    // A missing store is a configuration failure, not a lookup miss.
    let store = match Store::open(StoreConfig::at(&args.db)) {
        Ok(store) => Arc::new(store),
        Err(StoreError::Unavailable(message)) => return Err(CliError::Configuration(message)),
        Err(error) => return Err(error.into()),
    };

    let state = AppState::new(store, args.ui.clone());
    serve(addr, state)
        .await
        .map_err(|error| CliError::Configuration(error.to_string()))
}
