use crate::cmd::Protocol;
use crate::frame::PushFrame;
use crate::Frame;
use bytes::Bytes;

/// Set `key` to hold the string `value`.
///
/// If `key` already holds a value, it is overwritten, regardless of its type.
#[derive(Debug)]
pub struct Set {
    key: String,
    value: String,
}

impl Set {
    pub fn new(key: impl ToString, value: impl ToString) -> Set {
        Set {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Protocol for Set {
    type Output = ();

    /// ```text
    /// SET key value
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"set"));
        frame.push_bulk(Bytes::from(self.key.clone()));
        frame.push_bulk(Bytes::from(self.value.clone()));

        frame.into()
    }

    fn read_response(self, frame: Frame) -> crate::Result<()> {
        match frame {
            Frame::Simple(s) if s == "OK" => Ok(()),
            other => Err(other.to_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ok_acknowledges_a_write() {
        assert!(Set::new("k", "v").read_response(Frame::Simple("OK".into())).is_ok());
        assert!(Set::new("k", "v").read_response(Frame::Simple("QUEUED".into())).is_err());
        assert!(Set::new("k", "v").read_response(Frame::Null).is_err());
    }

    #[test]
    fn encodes_as_bulk_array() {
        let frame = Set::new("HolbertonSanFrancisco", "100").to_frame();

        assert_eq!(frame.to_string(), "set HolbertonSanFrancisco 100");
    }
}
