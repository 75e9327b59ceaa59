//! The commands a `Session` can issue.
//!
//! Each command knows how to encode itself as a request frame and how to
//! decode the reply the server sends back for it.

mod get;
pub use get::Get;

mod hash;
pub use hash::{HGet, HGetAll, HSet};

mod publish;
pub use publish::Publish;

mod set;
pub use set::Set;

mod subscribe;
pub(crate) use subscribe::{is_message, parse_message, Confirmation};
pub use subscribe::{Subscribe, Unsubscribe};

use crate::Frame;
use bytes::Bytes;

/// A request/response command of the Redis protocol.
pub trait Protocol {
    /// What a successful reply decodes to.
    type Output;

    /// Encode the command as the array frame sent to the server.
    fn to_frame(&self) -> Frame;

    /// Decode the server's reply to this command.
    ///
    /// Error replies never get here, the session turns them into
    /// `CommunicationError::Rejected` first.
    fn read_response(self, frame: Frame) -> crate::Result<Self::Output>;
}

/// A bulk or simple string reply, where the null bulk means "absent".
fn optional_string(frame: Frame) -> crate::Result<Option<String>> {
    match frame {
        Frame::Simple(value) => Ok(Some(value)),
        Frame::Bulk(value) => into_string(value).map(Some),
        Frame::Null => Ok(None),
        frame => Err(frame.to_error()),
    }
}

fn into_string(data: Bytes) -> crate::Result<String> {
    String::from_utf8(data.to_vec())
        .map_err(|_| crate::Error::protocol("protocol error; reply is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn empty_string_is_not_absent() {
        let value = optional_string(Frame::Bulk(Bytes::new())).unwrap();
        assert_eq!(value.as_deref(), Some(""));

        assert_eq!(optional_string(Frame::Null).unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_a_protocol_violation() {
        let res = optional_string(Frame::Bulk(Bytes::from_static(&[0xff, 0xfe])));
        assert!(matches!(res, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn integer_for_string_reply_is_a_protocol_violation() {
        let res = optional_string(Frame::Integer(1));
        assert!(matches!(res, Err(Error::ProtocolViolation(_))));
    }
}
