use crate::cmd::{optional_string, Protocol};
use crate::frame::PushFrame;
use crate::Frame;
use bytes::Bytes;

/// Get the value of key.
///
/// If the key does not exist the special value nil is returned, which decodes
/// to `None`. An empty string is a present value.
#[derive(Debug)]
pub struct Get {
    key: String,
}

impl Get {
    pub fn new(key: impl ToString) -> Get {
        Get {
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Protocol for Get {
    type Output = Option<String>;

    /// ```text
    /// GET key
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"get"));
        frame.push_bulk(Bytes::from(self.key.clone()));

        frame.into()
    }

    fn read_response(self, frame: Frame) -> crate::Result<Option<String>> {
        optional_string(frame)
    }
}
