//! Print every message on the school channel until the sentinel arrives.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_bin::CHANNEL;
use session_lib::{logging::set_up_logging, pubsub, Config};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "redis-subscriber", version, author, about = "Listen on the school channel")]
struct CliCommand {
    #[command(flatten)]
    config: Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> session_bin::Result<ExitCode> {
    // Enable logging
    set_up_logging()?;
    let cmd = CliCommand::parse();

    let Some(session) = session_bin::connect(cmd.config).await else {
        return Ok(ExitCode::FAILURE);
    };

    if let Err(err) = session.subscribe(CHANNEL).await {
        println!("Error: {err}");
        return Ok(ExitCode::FAILURE);
    }

    // Runs until the sentinel shuts the session down.
    if let Err(err) = pubsub::listen(&session, |message| println!("{}", message.payload)).await {
        println!("Error: {err}");
    }

    Ok(ExitCode::SUCCESS)
}
