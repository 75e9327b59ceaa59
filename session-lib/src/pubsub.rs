//! Subscriber message loop with a shutdown sentinel.

use crate::{Message, Session};
use tracing::info;

/// Payload that tells a subscriber to unsubscribe and hang up.
pub const SHUTDOWN_SENTINEL: &str = "KILL_SERVER";

/// Hand every message received by `session` to `on_message`, in the order
/// the server sent them.
///
/// A message whose payload is [`SHUTDOWN_SENTINEL`] is still handed to
/// `on_message`. Then its channel is unsubscribed, the session is closed
/// without waiting on in-flight requests, and the loop returns. The loop also
/// returns when the session is disconnected by other means.
pub async fn listen<F>(session: &Session, mut on_message: F) -> crate::Result<()>
where
    F: FnMut(&Message),
{
    while let Some(message) = session.next_message().await {
        on_message(&message);

        if message.payload == SHUTDOWN_SENTINEL {
            info!(channel = %message.channel, "shutdown sentinel received");

            let unsubscribed = session.unsubscribe(&message.channel).await;
            session.disconnect(false).await;

            return unsubscribed;
        }
    }

    Ok(())
}
