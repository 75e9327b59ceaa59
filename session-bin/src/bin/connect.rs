//! Connect to the server and report whether it worked.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_lib::{logging::set_up_logging, Config};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "redis-connect", version, author, about = "Connect to a Redis server")]
struct CliCommand {
    #[command(flatten)]
    config: Config,
}

/// `flavor = "current_thread"` is used here to make the programs lighter instead of multi-threads.
#[tokio::main(flavor = "current_thread")]
async fn main() -> session_bin::Result<ExitCode> {
    // Enable logging
    set_up_logging()?;
    let cmd = CliCommand::parse();

    match session_bin::connect(cmd.config).await {
        Some(session) => {
            session.disconnect(true).await;
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}
