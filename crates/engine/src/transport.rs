//! In-memory transport fabric
//!
//! Nodes register by name and get a mailbox; sends route to the named
//! mailbox. Test hooks model the transport contract's failure modes:
//! duplicated delivery and silence toward a destination (a message delayed
//! past the latency bound is indistinguishable from silence to the sender).

use crate::{Envelope, Message, Result, TransportError};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared in-memory message fabric. Cheap to clone; all clones route over
/// the same set of mailboxes.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Registered mailboxes by node name
    inboxes: Mutex<HashMap<String, mpsc::UnboundedSender<Envelope>>>,

    /// Destinations currently receiving nothing (partition / latency model)
    silenced: Mutex<HashSet<String>>,

    /// Deliver every message twice (duplicate-delivery model)
    duplicate: Mutex<bool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its client handle plus mailbox.
    ///
    /// Re-registering a name replaces the previous mailbox (a restarted node
    /// takes over its own identity).
    pub fn register(&self, node_id: impl Into<String>) -> (Client, Mailbox) {
        let node_id = node_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.inboxes.lock().insert(node_id.clone(), tx);

        let client = Client {
            node_id,
            transport: self.clone(),
        };
        (client, Mailbox { receiver: rx })
    }

    /// Silence a destination: sends to it are accepted and dropped
    pub fn silence(&self, node_id: &str) {
        self.inner.silenced.lock().insert(node_id.to_string());
    }

    /// Restore delivery to a silenced destination
    pub fn unsilence(&self, node_id: &str) {
        self.inner.silenced.lock().remove(node_id);
    }

    /// Toggle duplicate delivery of every message
    pub fn set_duplicate(&self, duplicate: bool) {
        *self.inner.duplicate.lock() = duplicate;
    }

    fn route(&self, from: &str, dest: &str, message: Message) -> Result<()> {
        if self.inner.silenced.lock().contains(dest) {
            // Modeled as in-flight past the latency bound; the sender's
            // retry machinery is responsible for the outcome.
            return Ok(());
        }

        let copies = if *self.inner.duplicate.lock() { 2 } else { 1 };

        let inboxes = self.inner.inboxes.lock();
        let sender = inboxes
            .get(dest)
            .ok_or_else(|| TransportError::UnknownDestination(dest.to_string()))?;

        for _ in 0..copies {
            sender
                .send(Envelope {
                    from: from.to_string(),
                    message: message.clone(),
                })
                .map_err(|_| TransportError::MailboxClosed(dest.to_string()))?;
        }
        Ok(())
    }
}

/// Per-node handle for sending messages
#[derive(Clone)]
pub struct Client {
    node_id: String,
    transport: MemoryTransport,
}

impl Client {
    /// This node's name as seen by peers
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Fire-and-forget send to a named destination
    pub fn send(&self, dest: &str, message: Message) -> Result<()> {
        self.transport.route(&self.node_id, dest, message)
    }
}

/// Inbound mailbox for a registered node
pub struct Mailbox {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Mailbox {
    /// Receive the next envelope, awaiting if none is queued
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Drain without blocking (deterministic test pumping)
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive() {
        let transport = MemoryTransport::new();
        let (a, _a_mailbox) = transport.register("a");
        let (_b, mut b_mailbox) = transport.register("b");

        a.send("b", Message::default().with_header("k", "v")).unwrap();

        let envelope = b_mailbox.try_recv().unwrap();
        assert_eq!(envelope.from, "a");
        assert_eq!(envelope.message.get_header("k"), Some("v"));
        assert!(b_mailbox.try_recv().is_none());
    }

    #[test]
    fn test_unknown_destination_is_an_error() {
        let transport = MemoryTransport::new();
        let (a, _mailbox) = transport.register("a");
        assert!(a.send("nobody", Message::default()).is_err());
    }

    #[test]
    fn test_silenced_destination_drops_messages() {
        let transport = MemoryTransport::new();
        let (a, _a_mailbox) = transport.register("a");
        let (_b, mut b_mailbox) = transport.register("b");

        transport.silence("b");
        a.send("b", Message::default()).unwrap();
        assert!(b_mailbox.try_recv().is_none());

        transport.unsilence("b");
        a.send("b", Message::default()).unwrap();
        assert!(b_mailbox.try_recv().is_some());
    }

    #[test]
    fn test_duplicate_delivery() {
        let transport = MemoryTransport::new();
        let (a, _a_mailbox) = transport.register("a");
        let (_b, mut b_mailbox) = transport.register("b");

        transport.set_duplicate(true);
        a.send("b", Message::default()).unwrap();
        assert!(b_mailbox.try_recv().is_some());
        assert!(b_mailbox.try_recv().is_some());
        assert!(b_mailbox.try_recv().is_none());
    }
}
