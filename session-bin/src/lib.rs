//! Pieces shared by the tutorial programs.

#![warn(clippy::pedantic)]

use session_lib::{Config, Session};
use std::fmt::Display;

/// Error type returned by the programs' `main`.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// The channel the publisher and subscriber programs talk over.
pub const CHANNEL: &str = "holberton school channel";

/// Connect and report the outcome on stdout.
pub async fn connect(config: Config) -> Option<Session> {
    let session = Session::new(config);

    match session.connect().await {
        Ok(()) => {
            println!("Redis client connected to the server");
            Some(session)
        }
        Err(err) => {
            println!("Redis client not connected to the server: {err}");
            None
        }
    }
}

/// Print the reply of a write, or the reason it failed.
pub fn print_reply<T: Display>(reply: &session_lib::Result<T>) {
    match reply {
        Ok(value) => println!("Reply: {value}"),
        Err(err) => println!("Error: {err}"),
    }
}

/// Print the outcome of a read: the value, `(nil)` when absent, or the error.
pub fn print_value(value: &session_lib::Result<Option<String>>) {
    match value {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => println!("(nil)"),
        Err(err) => println!("Error: {err}"),
    }
}
