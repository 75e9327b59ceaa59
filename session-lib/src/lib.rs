//! The major components are:
//! * `session`:  one client connection, its lifecycle and its commands.
//! * `driver`:   the background task that pipelines requests and routes
//!   pushed pub/sub messages.
//! * `cmd`:      the supported Redis commands, encoding and reply decoding.
//! * `frame`:    a single Redis protocol frame.
//! * `pubsub`:   the subscriber loop that stops on a sentinel message.

#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]

pub mod cmd;
pub use cmd::Protocol;

mod config;
pub use config::Config;

mod connection;
pub use connection::Connection;

mod driver;

mod error;
pub use error::{CommunicationError, Error};

pub mod frame;
pub use frame::Frame;

pub mod logging;

mod parse;

pub mod pubsub;

mod session;
pub use session::{Message, Session, SessionState};

mod shutdown;

/// Default port that a redis server listens on.
pub const DEFAULT_PORT: u16 = 6379;

pub type Result<T> = std::result::Result<T, Error>;
