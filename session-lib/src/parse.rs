//!
//! Cursor over the entries of an array reply
//!

use crate::Frame;

use std::{fmt, str, vec};

/// Pub/sub replies and pushed messages are array frames whose entries are
/// read one "token" at a time. A `Parse` is initialized with the array frame
/// and hands the entries out in order.
#[derive(Debug)]
pub(crate) struct Parse {
    frames: vec::IntoIter<Frame>,
}

#[derive(Debug)]
pub(crate) enum ParseError {
    /// The array ran out of entries.
    EndOfStream,

    Other(String),
}

impl Parse {
    /// Returns `Err` if `frame` is not an array frame.
    pub(crate) fn new(frame: Frame) -> Result<Parse, ParseError> {
        let array = match frame {
            Frame::Array(array) => array,
            other => return Err(format!("protocol error; expected array, got {other:?}").into()),
        };

        Ok(Parse {
            frames: array.into_iter(),
        })
    }

    fn next(&mut self) -> Result<Frame, ParseError> {
        self.frames.next().ok_or(ParseError::EndOfStream)
    }

    /// Return the next entry as a string. Both `Simple` and `Bulk` frames
    /// qualify; a bulk must hold valid UTF-8.
    pub(crate) fn next_string(&mut self) -> Result<String, ParseError> {
        match self.next()? {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(data) => str::from_utf8(&data[..])
                .map(ToString::to_string)
                .map_err(|_| "protocol error; invalid string".into()),
            other => Err(format!(
                "protocol error; expected simple frame or bulk frame, got {other:?}"
            )
            .into()),
        }
    }

    /// Return the next entry as an integer.
    pub(crate) fn next_int(&mut self) -> Result<i64, ParseError> {
        use atoi::atoi;

        const MSG: &str = "protocol error; invalid number";

        match self.next()? {
            Frame::Integer(v) => Ok(v),
            Frame::Simple(data) => atoi::<i64>(data.as_bytes()).ok_or_else(|| MSG.into()),
            Frame::Bulk(data) => atoi::<i64>(&data).ok_or_else(|| MSG.into()),
            frame => Err(format!("protocol error; expected int frame but got {frame:?}").into()),
        }
    }

    /// Ensure there are no more entries in the array
    pub(crate) fn finish(&mut self) -> Result<(), ParseError> {
        if self.frames.next().is_none() {
            Ok(())
        } else {
            Err("protocol error; expected end of frame, but there was more".into())
        }
    }
}

impl From<String> for ParseError {
    fn from(src: String) -> ParseError {
        ParseError::Other(src)
    }
}

impl From<&str> for ParseError {
    fn from(src: &str) -> ParseError {
        src.to_string().into()
    }
}

impl From<ParseError> for crate::Error {
    fn from(src: ParseError) -> crate::Error {
        crate::Error::protocol(src.to_string())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EndOfStream => "protocol error; unexpected end of stream".fmt(f),
            ParseError::Other(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ParseError {}
