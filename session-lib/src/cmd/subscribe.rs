use crate::cmd::Protocol;
use crate::frame::PushFrame;
use crate::parse::Parse;
use crate::{Frame, Message};
use bytes::Bytes;

/// Subscribes the session to a channel.
///
/// Once subscribed, the server pushes every message published on the channel
/// down the same connection, interleaved with ordinary replies.
#[derive(Debug)]
pub struct Subscribe {
    channel: String,
}

/// Unsubscribes the session from a channel.
#[derive(Clone, Debug)]
pub struct Unsubscribe {
    channel: String,
}

/// A subscription state change announced by the server.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Confirmation {
    Subscribed(String),
    Unsubscribed(String),
}

impl Subscribe {
    pub fn new(channel: impl ToString) -> Subscribe {
        Subscribe {
            channel: channel.to_string(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Unsubscribe {
    pub fn new(channel: impl ToString) -> Unsubscribe {
        Unsubscribe {
            channel: channel.to_string(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Protocol for Subscribe {
    type Output = ();

    /// ```text
    /// SUBSCRIBE channel
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"subscribe"));
        frame.push_bulk(Bytes::from(self.channel.clone()));

        frame.into()
    }

    /// The server responds with an array frame in the form of
    /// `[ "subscribe", channel, num-subscribed ]`.
    fn read_response(self, frame: Frame) -> crate::Result<()> {
        match Confirmation::parse(&frame) {
            Some(Confirmation::Subscribed(channel)) if channel == self.channel => Ok(()),
            _ => Err(frame.to_error()),
        }
    }
}

impl Protocol for Unsubscribe {
    type Output = ();

    /// ```text
    /// UNSUBSCRIBE channel
    /// ```
    fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        frame.push_bulk(Bytes::from_static(b"unsubscribe"));
        frame.push_bulk(Bytes::from(self.channel.clone()));

        frame.into()
    }

    /// `[ "unsubscribe", channel, num-subscribed ]`
    fn read_response(self, frame: Frame) -> crate::Result<()> {
        match Confirmation::parse(&frame) {
            Some(Confirmation::Unsubscribed(channel)) if channel == self.channel => Ok(()),
            _ => Err(frame.to_error()),
        }
    }
}

impl Confirmation {
    /// Recognizes `subscribe` / `unsubscribe` confirmations. Any other frame,
    /// including a malformed confirmation, yields `None`.
    pub(crate) fn parse(frame: &Frame) -> Option<Confirmation> {
        let kind = match frame {
            Frame::Array(parts) => parts.first()?,
            _ => return None,
        };
        let subscribed = if *kind == "subscribe" {
            true
        } else if *kind == "unsubscribe" {
            false
        } else {
            return None;
        };

        let mut parse = Parse::new(frame.clone()).ok()?;
        parse.next_string().ok()?;
        let channel = parse.next_string().ok()?;
        parse.next_int().ok()?;
        parse.finish().ok()?;

        Some(if subscribed {
            Confirmation::Subscribed(channel)
        } else {
            Confirmation::Unsubscribed(channel)
        })
    }
}

/// Is `frame` a message pushed by the server rather than a reply?
pub(crate) fn is_message(frame: &Frame) -> bool {
    matches!(frame, Frame::Array(parts) if parts.first().is_some_and(|kind| *kind == "message"))
}

/// Decodes a pushed `[ "message", channel, payload ]` frame.
pub(crate) fn parse_message(frame: Frame) -> crate::Result<Message> {
    let mut parse = Parse::new(frame)?;

    let kind = parse.next_string()?;
    if kind != "message" {
        return Err(crate::Error::protocol(format!("expected a message, got `{kind}`")));
    }

    let channel = parse.next_string()?;
    let payload = parse.next_string()?;
    parse.finish()?;

    Ok(Message { channel, payload })
}
