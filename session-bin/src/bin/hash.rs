//! Store the school hash field by field, then display it.

#![warn(clippy::pedantic)]

use clap::Parser;
use session_bin::print_reply;
use session_lib::{logging::set_up_logging, Config};
use std::process::ExitCode;

const HASH_KEY: &str = "HolbertonSchools";

const SCHOOLS: [(&str, &str); 6] = [
    ("Portland", "50"),
    ("Seattle", "80"),
    ("New York", "20"),
    ("Bogota", "20"),
    ("Cali", "40"),
    ("Paris", "2"),
];

#[derive(Parser, Debug)]
#[command(name = "redis-hash", version, author, about = "Create and display a hash")]
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

    for (field, value) in SCHOOLS {
        let added = session.hset(HASH_KEY, field, value).await;
        print_reply(&added.map(u8::from));
    }

    match session.hgetall(HASH_KEY).await {
        Ok(fields) => {
            let mut fields: Vec<_> = fields.into_iter().collect();
            fields.sort();

            for (field, value) in fields {
                println!("{field}: {value}");
            }
        }
        Err(err) => println!("Error: {err}"),
    }

    session.disconnect(true).await;
    Ok(ExitCode::SUCCESS)
}
