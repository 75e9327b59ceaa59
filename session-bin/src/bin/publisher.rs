//! Publish a short schedule of messages, the sentinel among them.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_bin::CHANNEL;
use session_lib::pubsub::SHUTDOWN_SENTINEL;
use session_lib::{logging::set_up_logging, Config};
use std::process::ExitCode;
use std::time::Duration;
use tokio::time;
use tracing::debug;

/// Each message and the delay, in milliseconds from start, before it is sent.
const SCHEDULE: [(&str, u64); 4] = [
    ("Holberton Student #1 starts course", 100),
    ("Holberton Student #2 starts course", 200),
    (SHUTDOWN_SENTINEL, 300),
    ("Holberton Student #3 starts course", 400),
];

#[derive(Parser, Debug)]
#[command(name = "redis-publisher", version, author, about = "Publish school messages")]
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

    let start = time::Instant::now();
    for (message, at) in SCHEDULE {
        time::sleep_until(start + Duration::from_millis(at)).await;

        println!("About to send {message}");
        match session.publish(CHANNEL, message).await {
            Ok(receivers) => debug!(receivers, "published"),
            Err(err) => println!("Error: {err}"),
        }
    }

    session.disconnect(true).await;
    Ok(ExitCode::SUCCESS)
}
