//! Read a key, write another, read it back. Each request is awaited before
//! the next one is issued.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_bin::{print_reply, print_value};
use session_lib::{logging::set_up_logging, Config, Session};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "redis-set-get", version, author, about = "Set and get school values")]
struct CliCommand {
    #[command(flatten)]
    config: Config,
}

async fn set_new_school(session: &Session, school_name: &str, value: &str) {
    print_reply(&session.set(school_name, value).await.map(|()| "OK"));
}

async fn display_school_value(session: &Session, school_name: &str) {
    print_value(&session.get(school_name).await);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> session_bin::Result<ExitCode> {
    // Enable logging
    set_up_logging()?;
    let cmd = CliCommand::parse();

    let Some(session) = session_bin::connect(cmd.config).await else {
        return Ok(ExitCode::FAILURE);
    };

    display_school_value(&session, "Holberton").await;
    set_new_school(&session, "HolbertonSanFrancisco", "100").await;
    display_school_value(&session, "HolbertonSanFrancisco").await;

    session.disconnect(true).await;
    Ok(ExitCode::SUCCESS)
}
