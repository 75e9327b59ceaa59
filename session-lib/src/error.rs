use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Everything a `Session` operation can fail with.
///
/// Errors are cheap to clone so that a single transport failure can be handed
/// to every request still waiting for a reply.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The connection could not be established, or the session is in the
    /// terminal `Failed` state.
    #[error("not connected to the server: {0}")]
    Connection(Arc<io::Error>),

    /// A round trip failed after the connection was established.
    #[error(transparent)]
    Communication(#[from] CommunicationError),

    /// The server sent something that does not fit the request it answers.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

#[derive(Debug, Clone, Error)]
pub enum CommunicationError {
    #[error("session is not connected")]
    NotConnected,

    #[error("session closed before the response arrived")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Io(Arc<io::Error>),

    /// The server answered with an error reply, e.g. `-ERR ...`.
    #[error("server rejected the request: {0}")]
    Rejected(String),
}

impl Error {
    pub(crate) fn connection(err: io::Error) -> Error {
        Error::Connection(Arc::new(err))
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Error {
        Error::ProtocolViolation(msg.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        CommunicationError::Io(Arc::new(err)).into()
    }
}
