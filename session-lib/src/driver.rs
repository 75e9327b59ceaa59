//! Background task that owns the connection of a `Session`.
//!
//! Requests are written as soon as they arrive and their responders queued.
//! Every inbound frame is either a pushed pub/sub message, routed to the
//! message queue, or the reply to the oldest queued request.

use crate::cmd::{is_message, parse_message, Confirmation};
use crate::error::CommunicationError;
use crate::shutdown::{Disconnect, Shutdown};
use crate::{Connection, Error, Frame, Message, SessionState};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// Channels that the server has confirmed as subscribed.
pub(crate) type Subscriptions = Arc<Mutex<HashSet<String>>>;

pub(crate) type Responder = oneshot::Sender<crate::Result<Frame>>;

/// A request frame and the responder waiting for its reply.
#[derive(Debug)]
pub(crate) struct Request {
    pub(crate) frame: Frame,
    pub(crate) respond_to: Responder,
}

#[derive(Debug)]
pub(crate) struct Driver {
    connection: Connection,

    requests: mpsc::UnboundedReceiver<Request>,

    /// Responders in the order their requests were written.
    pending: VecDeque<Responder>,

    messages: mpsc::UnboundedSender<Message>,

    subscriptions: Subscriptions,

    shutdown: Shutdown,

    state: Arc<watch::Sender<SessionState>>,
}

impl Driver {
    pub(crate) fn new(
        connection: Connection,
        requests: mpsc::UnboundedReceiver<Request>,
        messages: mpsc::UnboundedSender<Message>,
        subscriptions: Subscriptions,
        shutdown: Shutdown,
        state: Arc<watch::Sender<SessionState>>,
    ) -> Driver {
        Driver {
            connection,
            requests,
            pending: VecDeque::new(),
            messages,
            subscriptions,
            shutdown,
            state,
        }
    }

    /// Runs until the session disconnects or the connection is lost. Every
    /// request still waiting when that happens is answered with an error.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) {
        match self.drive().await {
            Ok(()) => debug!("session driver stopped"),
            Err(err) => {
                error!(cause = %err, "connection lost");
                self.fail_pending(&err);
            }
        }

        // Dropping `self` closes the session.
    }

    fn fail_pending(&mut self, cause: &Error) {
        for respond_to in self.pending.drain(..) {
            let _ = respond_to.send(Err(cause.clone()));
        }

        // Requests that were queued but never written.
        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            let _ = request.respond_to.send(Err(cause.clone()));
        }
    }

    async fn drive(&mut self) -> crate::Result<()> {
        // `false` once the request queue is closed and drained.
        let mut accepting = true;

        loop {
            if !accepting && self.pending.is_empty() {
                return Ok(());
            }

            tokio::select! {
                request = self.requests.recv(), if accepting => match request {
                    Some(request) => self.write_request(request).await?,
                    None => accepting = false,
                },
                frame = self.connection.read_frame() => match frame? {
                    Some(frame) => self.dispatch(frame),
                    None => {
                        let err = io::Error::new(
                            io::ErrorKind::ConnectionReset,
                            "connection closed by server",
                        );
                        return Err(err.into());
                    }
                },
                mode = self.shutdown.recv(), if !self.shutdown.is_shutdown() => match mode {
                    Disconnect::Forced => return Ok(()),
                    Disconnect::Graceful => {
                        info!(in_flight = self.pending.len(), "draining before disconnect");
                        // Already queued requests are still written.
                        self.requests.close();
                    }
                },
            }
        }
    }

    async fn write_request(&mut self, request: Request) -> crate::Result<()> {
        let Request { frame, respond_to } = request;
        debug!(request = ?frame);

        // Queue the responder first so a failed write is reported to it.
        self.pending.push_back(respond_to);
        self.connection.write_frame(&frame).await?;

        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) {
        if is_message(&frame) {
            self.deliver(frame);
            return;
        }

        debug!(response = ?frame);

        // The subscription set changes at the exact point of the stream where
        // the server confirms it, so no message can slip past either side.
        match Confirmation::parse(&frame) {
            Some(Confirmation::Subscribed(channel)) => {
                self.subscriptions.lock().unwrap().insert(channel);
            }
            Some(Confirmation::Unsubscribed(channel)) => {
                self.subscriptions.lock().unwrap().remove(&channel);
            }
            None => {}
        }

        let Some(respond_to) = self.pending.pop_front() else {
            warn!(?frame, "dropping reply with no pending request");
            return;
        };

        let result = match frame {
            Frame::Error(msg) => Err(CommunicationError::Rejected(msg).into()),
            frame => Ok(frame),
        };

        // The caller may have given up waiting, e.g. after a timeout.
        let _ = respond_to.send(result);
    }

    fn deliver(&mut self, frame: Frame) {
        let message = match parse_message(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(cause = %err, "dropping malformed message");
                return;
            }
        };

        if !self.subscriptions.lock().unwrap().contains(&message.channel) {
            debug!(channel = %message.channel, "ignoring message for inactive channel");
            return;
        }

        debug!(channel = %message.channel, "message received");
        let _ = self.messages.send(message);
    }
}

/// Also runs when the task panics or is aborted.
impl Drop for Driver {
    fn drop(&mut self) {
        self.fail_pending(&Error::Communication(CommunicationError::Closed));

        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.state.send_replace(SessionState::Disconnected);
    }
}
