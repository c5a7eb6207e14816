mod build;
mod lookup;
mod serve;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Build(args) => build::run(args, cli.pretty),
        Command::Serve(args) => serve::run(args).await,
        Command::Lookup(args) => lookup::run(args, cli.pretty),
    }
}

/// Render a serializable value the way the HTTP endpoints would.
pub fn render_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}
