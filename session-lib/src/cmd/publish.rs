use crate::cmd::Protocol;
use crate::frame::PushFrame;
use crate::Frame;
use bytes::Bytes;

/// Send a message into a specific channel.
/// Consumers may subscribe to channels in order to receive the messages.
#[derive(Debug)]
pub struct Publish {
    channel: String,
    message: String,
}

impl Publish {
    pub fn new(channel: impl ToString, message: impl ToString) -> Publish {
        Publish {
            channel: channel.to_string(),
            message: message.to_string(),
        }
    }
}

impl Protocol for Publish {
    /// Number of subscribers that received the message.
    type Output = u64;

    /// ```text
    /// PUBLISH channel message
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"publish"));
        frame.push_bulk(Bytes::from(self.channel.clone()));
        frame.push_bulk(Bytes::from(self.message.clone()));

        frame.into()
    }

    fn read_response(self, frame: Frame) -> crate::Result<u64> {
        match frame {
            Frame::Integer(num) => u64::try_from(num).map_err(|_| frame.to_error()),
            _ => Err(frame.to_error()),
        }
    }
}
