use tokio::sync::oneshot;

/// How a session should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disconnect {
    /// Stop accepting requests, wait for in-flight replies, then close.
    Graceful,
    /// Close now. In-flight requests fail.
    Forced,
}

/// The `Shutdown` struct tracks whether a disconnect has been requested.
#[derive(Debug)]
pub(crate) struct Shutdown {
    /// Set once the signal has been received.
    mode: Option<Disconnect>,

    notify: oneshot::Receiver<Disconnect>,
}

impl Shutdown {
    pub(crate) fn new(notify: oneshot::Receiver<Disconnect>) -> Shutdown {
        Shutdown { mode: None, notify }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.mode.is_some()
    }

    /// Receive the disconnect request, waiting if necessary.
    ///
    /// A session dropped without disconnecting counts as a forced disconnect.
    pub(crate) async fn recv(&mut self) -> Disconnect {
        if let Some(mode) = self.mode {
            return mode;
        }

        let mode = (&mut self.notify).await.unwrap_or(Disconnect::Forced);
        self.mode = Some(mode);

        mode
    }
}
