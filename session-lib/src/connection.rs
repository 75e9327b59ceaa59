use crate::frame::{self, Frame};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// `Connection` reads and writes `Frame`s on the underlying `TcpStream`.
///
/// `read_buf` is filled until it holds a complete frame, which is then parsed
/// and handed to the caller. Bytes past the end of that frame stay buffered
/// for the next call.
#[derive(Debug)]
pub struct Connection {
    stream: BufWriter<TcpStream>,
    // The buffer for reading frames.
    read_buf: BytesMut,
}

const BUF_SIZE: usize = 4 * 1024;

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(stream),
            read_buf: BytesMut::with_capacity(BUF_SIZE),
        }
    }

    /// Read a single `Frame` from the underlying stream, waiting until enough
    /// data has arrived.
    ///
    /// Returns `None` when the peer closed the socket on a frame boundary.
    /// Closing in the middle of a frame is a transport error, and bytes that
    /// cannot be a frame are a protocol violation.
    ///
    /// Cancel safe: dropping the future keeps every byte read so far.
    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // There is not enough buffered data to read a frame. Attempt to
            // read more data from `TcpStream`.
            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.read_buf).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer.
                if self.read_buf.is_empty() {
                    return Ok(None);
                }

                let err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer");
                return Err(err.into());
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer holds a whole
    /// frame, it is returned and its bytes removed from the buffer. If not
    /// enough data has been buffered yet, `Ok(None)` is returned.
    fn parse_frame(&mut self) -> crate::Result<Option<Frame>> {
        use frame::Error::Incomplete;

        // Cursor implements `Buf` from the `bytes` crate
        let mut buf = Cursor::new(&self.read_buf[..]);

        // `check` is much cheaper than a full parse and tells us whether the
        // whole frame has been buffered yet.
        match Frame::check(&mut buf) {
            Ok(()) => {
                // `check` left the cursor at the end of the frame.
                #[allow(clippy::cast_possible_truncation)]
                let len = buf.position() as usize;

                // Reset the position to zero before passing the cursor to `Frame::parse`.
                buf.set_position(0);
                let frame = Frame::parse(&mut buf)?;
                // Discard the parsed data from the read buffer.
                self.read_buf.advance(len);

                Ok(Some(frame))
            }
            // Not a whole frame yet.
            Err(Incomplete) => Ok(None),
            // Framing is lost; the caller closes the connection.
            Err(e) => Err(e.into()),
        }
    }

    /// Write a single `Frame` to the underlying stream and flush it.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Array(val) => {
                // Encode the frame type prefix. For an array, it is `*`.
                self.stream.write_u8(b'*').await?;
                // Encode the length of the array.
                self.write_decimal(val.len()).await?;

                for entry in val {
                    self.write_value(entry).await?;
                }
            }
            // The frame type is a literal. Encode the value directly.
            _ => self.write_value(frame).await?,
        }

        // flush the calls above.
        self.stream.flush().await
    }

    /// Write a frame literal to the stream. Commands and replies never nest
    /// arrays, so a nested one is rejected instead of encoded.
    async fn write_value(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Simple(val) => {
                self.stream.write_u8(b'+').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Error(val) => {
                self.stream.write_u8(b'-').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Integer(val) => {
                self.stream.write_u8(b':').await?;
                self.write_decimal(*val).await?;
            }
            Frame::Null => {
                self.stream.write_all(b"$-1\r\n").await?;
            }
            Frame::Bulk(val) => {
                self.stream.write_u8(b'$').await?;
                self.write_decimal(val.len()).await?;
                self.stream.write_all(val).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Array(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "nested arrays are not supported",
                ));
            }
        }

        Ok(())
    }

    /// Write a decimal frame to the stream
    async fn write_decimal(&mut self, val: impl ToString) -> io::Result<()> {
        self.stream.write_all(val.to_string().as_bytes()).await?;
        self.stream.write_all(b"\r\n").await
    }
}
