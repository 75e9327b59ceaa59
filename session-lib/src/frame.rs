//! RESP2 frames and the incremental parser used by `Connection`.

use bytes::{Buf, Bytes};
use std::fmt;
use std::io::Cursor;
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

/// A frame in the Redis serialization protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

#[derive(Debug)]
pub enum Error {
    /// Not enough data is available to parse a message
    Incomplete,

    /// Invalid message encoding
    Other(String),
}

/// Helpers for building the array frames that carry commands.
pub trait PushFrame {
    fn push_bulk(&mut self, bytes: Bytes);

    fn push_int(&mut self, value: i64);
}

impl PushFrame for Vec<Frame> {
    fn push_bulk(&mut self, bytes: Bytes) {
        self.push(Frame::Bulk(bytes));
    }

    fn push_int(&mut self, value: i64) {
        self.push(Frame::Integer(value));
    }
}

impl From<Vec<Frame>> for Frame {
    fn from(frames: Vec<Frame>) -> Frame {
        Frame::Array(frames)
    }
}

impl Frame {
    /// Checks if an entire frame can be decoded from `src`. On success the
    /// cursor sits just past the end of the frame.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), Error> {
        match get_u8(src)? {
            b'+' | b'-' => {
                get_line(src)?;
                Ok(())
            }
            b':' => {
                get_integer(src)?;
                Ok(())
            }
            b'$' => {
                if b'-' == peek_u8(src)? {
                    // Skip '-1\r\n'
                    skip(src, 4)
                } else {
                    let len: usize = get_decimal(src)?.try_into()?;

                    // skip that number of bytes + 2 (\r\n).
                    skip(src, bulk_end(len)?)
                }
            }
            b'*' => {
                if b'-' == peek_u8(src)? {
                    return skip(src, 4);
                }

                let len = get_decimal(src)?;
                for _ in 0..len {
                    Frame::check(src)?;
                }

                Ok(())
            }
            actual => Err(format!("protocol error; invalid frame type byte `{actual}`").into()),
        }
    }

    /// The message has already been validated with `check`.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
        match get_u8(src)? {
            b'+' => {
                let line = get_line(src)?.to_vec();
                Ok(Frame::Simple(String::from_utf8(line)?))
            }
            b'-' => {
                let line = get_line(src)?.to_vec();
                Ok(Frame::Error(String::from_utf8(line)?))
            }
            b':' => Ok(Frame::Integer(get_integer(src)?)),
            b'$' => {
                if b'-' == peek_u8(src)? {
                    let line = get_line(src)?;
                    if line != b"-1" {
                        return Err("protocol error; invalid frame format".into());
                    }

                    Ok(Frame::Null)
                } else {
                    let len: usize = get_decimal(src)?.try_into()?;
                    let n = bulk_end(len)?;

                    if src.remaining() < n {
                        return Err(Error::Incomplete);
                    }

                    let data = Bytes::copy_from_slice(&src.chunk()[..len]);
                    skip(src, n)?;

                    Ok(Frame::Bulk(data))
                }
            }
            b'*' => {
                // A null array (`*-1`) carries no entries, same as a null bulk.
                if b'-' == peek_u8(src)? {
                    let line = get_line(src)?;
                    if line != b"-1" {
                        return Err("protocol error; invalid frame format".into());
                    }

                    return Ok(Frame::Null);
                }

                let len: usize = get_decimal(src)?.try_into()?;
                let mut out = Vec::with_capacity(len);

                for _ in 0..len {
                    out.push(Frame::parse(src)?);
                }

                Ok(Frame::Array(out))
            }
            actual => Err(format!("protocol error; invalid frame type byte `{actual}`").into()),
        }
    }

    /// Converts a frame that does not fit the reply being decoded into an error.
    pub(crate) fn to_error(&self) -> crate::Error {
        crate::Error::protocol(format!("unexpected frame: {self}"))
    }
}

impl PartialEq<&str> for Frame {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Frame::Simple(s) => s.eq(other),
            Frame::Bulk(s) => s.eq(other),
            _ => false,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use std::str;

        match self {
            Frame::Simple(response) => response.fmt(fmt),
            Frame::Error(msg) => write!(fmt, "error: {msg}"),
            Frame::Integer(num) => num.fmt(fmt),
            Frame::Bulk(msg) => match str::from_utf8(msg) {
                Ok(string) => string.fmt(fmt),
                Err(_) => write!(fmt, "{msg:?}"),
            },
            Frame::Null => "(nil)".fmt(fmt),
            Frame::Array(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, " ")?;
                    }
                    part.fmt(fmt)?;
                }

                Ok(())
            }
        }
    }
}

fn peek_u8(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }

    Ok(src.chunk()[0])
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }

    Ok(src.get_u8())
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), Error> {
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }

    src.advance(n);
    Ok(())
}

/// Read a new-line terminated decimal
fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<u64, Error> {
    use atoi::atoi;

    let line = get_line(src)?;

    atoi::<u64>(line).ok_or_else(|| "protocol error; invalid frame format".into())
}

/// Read a new-line terminated signed integer
fn get_integer(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    use atoi::atoi;

    let line = get_line(src)?;

    atoi::<i64>(line).ok_or_else(|| "protocol error; invalid frame format".into())
}

/// Length of a bulk payload plus its trailing `\r\n`.
fn bulk_end(len: usize) -> Result<usize, Error> {
    len.checked_add(2)
        .ok_or_else(|| "protocol error; invalid frame format".into())
}

/// Find a line
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    #[allow(clippy::cast_possible_truncation)]
    let start = src.position() as usize;
    let end = src.get_ref().len().saturating_sub(1);

    for i in start..end {
        if src.get_ref()[i] == b'\r' && src.get_ref()[i + 1] == b'\n' {
            // We found a line, update the position to be *after* the \n
            src.set_position((i + 2) as u64);

            return Ok(&src.get_ref()[start..i]);
        }
    }

    Err(Error::Incomplete)
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src)
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<TryFromIntError> for Error {
    fn from(_src: TryFromIntError) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<Error> for crate::Error {
    fn from(src: Error) -> crate::Error {
        match src {
            Error::Incomplete => crate::Error::protocol("stream ended in the middle of a frame"),
            Error::Other(msg) => crate::Error::ProtocolViolation(msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Incomplete => "stream ended early".fmt(fmt),
            Error::Other(err) => err.fmt(fmt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &[u8]) -> Result<Frame, Error> {
        let mut buf = Cursor::new(input);
        Frame::check(&mut buf)?;
        buf.set_position(0);
        Frame::parse(&mut buf)
    }

    #[test]
    fn partial_input_is_incomplete() {
        assert!(matches!(decode(b"$5\r\nhel"), Err(Error::Incomplete)));
        assert!(matches!(decode(b"*3\r\n$7\r\nmessage\r\n"), Err(Error::Incomplete)));
        assert!(matches!(decode(b"+OK\r"), Err(Error::Incomplete)));
    }

    #[test]
    fn null_bulk_and_empty_bulk_differ() {
        assert_eq!(decode(b"$-1\r\n").unwrap(), Frame::Null);
        assert_eq!(decode(b"$0\r\n\r\n").unwrap(), Frame::Bulk(Bytes::new()));
    }

    #[test]
    fn null_array_decodes_as_null() {
        assert_eq!(decode(b"*-1\r\n").unwrap(), Frame::Null);
    }

    #[test]
    fn push_message_decodes_as_array() {
        let frame = decode(b"*3\r\n$7\r\nmessage\r\n$1\r\nC\r\n$5\r\nhello\r\n").unwrap();

        match frame {
            Frame::Array(ref parts) => {
                assert_eq!(parts.len(), 3);
                assert!(parts[0] == "message");
                assert!(parts[1] == "C");
                assert!(parts[2] == "hello");
            }
            other => panic!("expected an array, got {other:?}"),
        }
    }

    #[test]
    fn integers_are_signed() {
        assert_eq!(decode(b":-1\r\n").unwrap(), Frame::Integer(-1));
        assert_eq!(decode(b":42\r\n").unwrap(), Frame::Integer(42));
        assert!(matches!(decode(b":4x\r\n"), Err(Error::Other(_))));
    }

    #[test]
    fn oversized_bulk_length_is_rejected() {
        let input = b"$18446744073709551615\r\nab\r\n";
        assert!(matches!(decode(input), Err(Error::Other(_))));

        // `parse` alone must not overflow either
        let mut buf = Cursor::new(&input[..]);
        assert!(matches!(Frame::parse(&mut buf), Err(Error::Other(_))));
    }

    #[test]
    fn unknown_type_byte_is_rejected() {
        assert!(matches!(decode(b"!oops\r\n"), Err(Error::Other(_))));
    }
}
