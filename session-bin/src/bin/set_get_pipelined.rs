//! The same reads and write as `redis-set-get`, issued all at once.
//!
//! Requests on one session are pipelined and answered in the order they were
//! issued, so the second read always observes the write.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_bin::{print_reply, print_value};
use session_lib::{logging::set_up_logging, Config};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "redis-set-get-pipelined",
    version,
    author,
    about = "Set and get school values in one pipeline"
)]
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

    let (before, written, after) = tokio::join!(
        session.get("Holberton"),
        session.set("HolbertonSanFrancisco", "100"),
        session.get("HolbertonSanFrancisco"),
    );

    print_value(&before);
    print_reply(&written.map(|()| "OK"));
    print_value(&after);

    session.disconnect(true).await;
    Ok(ExitCode::SUCCESS)
}
