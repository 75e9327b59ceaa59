//! Redis client session
//!
//! A `Session` owns one connection to the server. Round trips (`set`, `get`,
//! `hset`, `subscribe`, ...) take `&self`, so several may be in flight at once
//! and are pipelined on the connection. Replies are matched to requests in
//! the order they were issued.

use crate::cmd::{Get, HGet, HGetAll, HSet, Protocol, Publish, Set, Subscribe, Unsubscribe};
use crate::driver::{Driver, Request, Subscriptions};
use crate::error::CommunicationError;
use crate::shutdown::{Disconnect, Shutdown};
use crate::{Config, Connection, Error, Frame};
use async_stream::stream;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_stream::Stream;
use tracing::{debug, error, info, instrument};

/// Connection state of a `Session`.
#[derive(Debug, Clone)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// The connect attempt failed. Terminal: build a new `Session` to retry.
    Failed(Arc<io::Error>),
}

/// A message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: String,
}

/// One client connection to a Redis server.
#[derive(Debug)]
pub struct Session {
    config: Config,

    state: Arc<watch::Sender<SessionState>>,

    /// Present while a driver task runs for this session.
    handle: Mutex<Option<Handle>>,

    /// Messages pushed for active subscriptions, in server-send order.
    messages: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Message>>>,

    subscriptions: Subscriptions,
}

#[derive(Debug)]
struct Handle {
    requests: mpsc::UnboundedSender<Request>,
    shutdown: oneshot::Sender<Disconnect>,
    task: JoinHandle<()>,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl Session {
    /// A disconnected session for the server described by `config`.
    pub fn new(config: Config) -> Session {
        let (state, _) = watch::channel(SessionState::Disconnected);

        Session {
            config,
            state: Arc::new(state),
            handle: Mutex::new(None),
            messages: tokio::sync::Mutex::new(None),
            subscriptions: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Build a session and connect it right away.
    pub async fn connect_with(config: Config) -> crate::Result<Session> {
        let session = Session::new(config);
        session.connect().await?;

        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Observe state changes, e.g. to react to the connection being
    /// established or lost.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Establish the connection.
    ///
    /// Connecting an already connected session does nothing. A session whose
    /// connect attempt failed stays `Failed` and keeps returning that error.
    #[instrument(skip(self), fields(addr = %self.config.addr()))]
    pub async fn connect(&self) -> crate::Result<()> {
        let mut current = None;
        self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Disconnected) {
                *state = SessionState::Connecting;
                true
            } else {
                current = Some(state.clone());
                false
            }
        });

        match current {
            None => {}
            Some(SessionState::Connected) => return Ok(()),
            Some(SessionState::Failed(cause)) => return Err(Error::Connection(cause)),
            Some(_) => return Err(CommunicationError::NotConnected.into()),
        }

        let stream = match self.open().await {
            Ok(stream) => stream,
            Err(err) => {
                error!(cause = %err, "Redis client not connected to the server");
                let cause = Arc::new(err);
                let failed = SessionState::Failed(cause.clone());

                if !self.finish_connecting(failed) {
                    return Err(CommunicationError::Closed.into());
                }
                return Err(Error::Connection(cause));
            }
        };

        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        self.subscriptions.lock().unwrap().clear();
        *self.messages.lock().await = Some(messages_rx);

        // Held until the handle is stored, so `disconnect` sees either
        // `Connecting` or a handle.
        let mut handle = self.handle.lock().unwrap();

        // The state must read `Connected` before the driver can possibly
        // report the connection as lost.
        if !self.finish_connecting(SessionState::Connected) {
            debug!("disconnected while connecting");
            return Err(CommunicationError::Closed.into());
        }

        let driver = Driver::new(
            Connection::new(stream),
            requests_rx,
            messages_tx,
            self.subscriptions.clone(),
            Shutdown::new(shutdown_rx),
            self.state.clone(),
        );
        let task = tokio::spawn(driver.run());

        *handle = Some(Handle {
            requests: requests_tx,
            shutdown: shutdown_tx,
            task,
        });
        drop(handle);

        info!("Redis client connected to the server");
        Ok(())
    }

    /// Leave `Connecting` for `next`. Fails when a `disconnect` came first.
    fn finish_connecting(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Connecting) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    async fn open(&self) -> io::Result<TcpStream> {
        let addr = self.config.addr();

        match self.config.connect_timeout {
            Some(limit) => time::timeout(limit, TcpStream::connect(&addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?,
            None => TcpStream::connect(&addr).await,
        }
    }

    /// Close the connection.
    ///
    /// With `graceful`, requests already issued are written and their replies
    /// awaited first. Otherwise they fail with `CommunicationError::Closed`.
    /// Either way no new request is accepted once this is called, and a
    /// second call does nothing. A `connect` still in progress is abandoned
    /// and returns `CommunicationError::Closed`.
    pub async fn disconnect(&self, graceful: bool) {
        let handle = {
            let mut handle = self.handle.lock().unwrap();
            let taken = handle.take();

            if taken.is_none() {
                self.state.send_if_modified(|state| {
                    if matches!(state, SessionState::Connecting) {
                        *state = SessionState::Disconnected;
                        true
                    } else {
                        false
                    }
                });
            }

            taken
        };
        let Some(handle) = handle else {
            debug!("already disconnected");
            return;
        };

        let mode = if graceful {
            Disconnect::Graceful
        } else {
            Disconnect::Forced
        };
        info!(?mode, "disconnecting");

        let Handle {
            requests,
            shutdown,
            task,
        } = handle;
        drop(requests);
        let _ = shutdown.send(mode);

        if let Err(err) = task.await {
            error!(cause = %err, "session driver failed");
        }

        self.subscriptions.lock().unwrap().clear();
        self.state.send_replace(SessionState::Disconnected);
    }

    /// Set `key` to hold the string `value`, overwriting any previous value.
    #[instrument(skip(self))]
    pub async fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.execute(Set::new(key, value)).await
    }

    /// Get the value of `key`: `Some` when present, `None` when the key does
    /// not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> crate::Result<Option<String>> {
        self.execute(Get::new(key)).await
    }

    /// Set a single `field` of the hash at `key`. Returns `true` when the
    /// field is new.
    #[instrument(skip(self))]
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> crate::Result<bool> {
        self.execute(HSet::new(key, field, value)).await
    }

    #[instrument(skip(self))]
    pub async fn hget(&self, key: &str, field: &str) -> crate::Result<Option<String>> {
        self.execute(HGet::new(key, field)).await
    }

    /// All fields of the hash at `key`. A missing hash is empty.
    #[instrument(skip(self))]
    pub async fn hgetall(&self, key: &str) -> crate::Result<HashMap<String, String>> {
        self.execute(HGetAll::new(key)).await
    }

    /// Publish `message` on `channel`, returning how many subscribers got it.
    #[instrument(skip(self))]
    pub async fn publish(&self, channel: &str, message: &str) -> crate::Result<u64> {
        self.execute(Publish::new(channel, message)).await
    }

    /// Subscribe to `channel`. Messages published on it are delivered through
    /// `next_message` from the moment the server confirms the subscription.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, channel: &str) -> crate::Result<()> {
        self.execute(Subscribe::new(channel)).await
    }

    /// Stop receiving messages on `channel`.
    ///
    /// Does nothing when the session is disconnected or not subscribed to it.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, channel: &str) -> crate::Result<()> {
        if !self.is_connected() || !self.is_subscribed(channel) {
            debug!("no active subscription");
            return Ok(());
        }

        self.execute(Unsubscribe::new(channel)).await
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.lock().unwrap().contains(channel)
    }

    /// Channels with an active subscription, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut channels: Vec<_> = self.subscriptions.lock().unwrap().iter().cloned().collect();
        channels.sort();

        channels
    }

    /// Receive the next message published on a subscribed channel, waiting if
    /// necessary.
    ///
    /// `None` once the session is disconnected. Messages still buffered at
    /// that point are discarded.
    pub async fn next_message(&self) -> Option<Message> {
        let mut messages = self.messages.lock().await;
        let message = messages.as_mut()?.recv().await?;

        if self.is_connected() {
            Some(message)
        } else {
            *messages = None;
            None
        }
    }

    /// The messages of `next_message` as a `Stream`.
    pub fn messages(&self) -> impl Stream<Item = Message> + '_ {
        stream! {
            while let Some(message) = self.next_message().await {
                yield message;
            }
        }
    }

    /// Issue `cmd` and decode its reply.
    pub async fn execute<C: Protocol>(&self, cmd: C) -> crate::Result<C::Output> {
        let response = self.round_trip(cmd.to_frame()).await?;

        cmd.read_response(response)
    }

    async fn round_trip(&self, frame: Frame) -> crate::Result<Frame> {
        if !self.is_connected() {
            return Err(self.not_connected());
        }

        let response = {
            let handle = self.handle.lock().unwrap();
            let Some(handle) = handle.as_ref() else {
                return Err(self.not_connected());
            };

            let (respond_to, response) = oneshot::channel();
            handle
                .requests
                .send(Request { frame, respond_to })
                .map_err(|_| CommunicationError::Closed)?;

            response
        };

        let response = match self.config.response_timeout {
            Some(limit) => time::timeout(limit, response)
                .await
                .map_err(|_| CommunicationError::Timeout(limit))?,
            None => response.await,
        };

        // A dropped responder means the driver is gone.
        response.map_err(|_| CommunicationError::Closed)?
    }

    fn not_connected(&self) -> Error {
        match self.state() {
            SessionState::Failed(cause) => Error::Connection(cause),
            _ => CommunicationError::NotConnected.into(),
        }
    }
}
