//! # Sessions & Messaging
//!
//! Flows talk to each other over point-to-point [`Session`]s. A session is an
//! ordered, bidirectional stream of [`FlowMessage`]s between exactly two
//! parties, opened by the initiator through [`Messaging::open_session`] and
//! delivered to the peer's inbox.
//!
//! ## In-Memory Transport
//!
//! [`InMemoryNetwork`] is the transport used by tests and the local demo.
//! Every registered party gets an inbox (a tokio `mpsc` channel of incoming
//! sessions). A session is a pair of bounded channels carrying
//! bincode-encoded frames, so every message really goes through the wire
//! codec even when both ends live in one process.
//!
//! ```text
//!   initiator                        responder
//!   ChannelSession ──frames──►  ChannelSession
//!                  ◄──frames──
//! ```
//!
//! Dropping either end closes the session; the other end sees
//! [`SessionError::Disconnected`] on its next receive.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::SESSION_CHANNEL_CAPACITY;
use crate::crypto::keys::PartyPublicKey;
use crate::flows::messages::FlowMessage;
use crate::identity::Party;
use crate::transaction::codec;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("timed out after {0:?} waiting for the peer")]
    Timeout(Duration),

    #[error("peer disconnected")]
    Disconnected,

    #[error("no route to peer {0}")]
    UnknownPeer(String),

    #[error("frame codec error: {0}")]
    Codec(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One end of a two-party conversation.
#[async_trait]
pub trait Session: Send {
    /// Who is on the other end.
    fn peer(&self) -> &Party;

    async fn send(&mut self, message: FlowMessage) -> Result<(), SessionError>;

    /// Next message, or `Timeout` after `wait`, or `Disconnected` if the
    /// peer dropped its end.
    async fn receive(&mut self, wait: Duration) -> Result<FlowMessage, SessionError>;
}

/// Opens sessions to other parties.
#[async_trait]
pub trait Messaging: Send + Sync {
    async fn open_session(&self, peer: &Party) -> Result<Box<dyn Session>, SessionError>;
}

// ---------------------------------------------------------------------------
// ChannelSession
// ---------------------------------------------------------------------------

/// A session backed by a pair of tokio channels.
pub struct ChannelSession {
    peer: Party,
    outbound: mpsc::Sender<Vec<u8>>,
    inbound: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSession {
    /// Two connected ends. `a` talks to `b_party`, `b` talks to `a_party`.
    pub fn pair(a_party: Party, b_party: Party) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let (b_tx, a_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let a = Self {
            peer: b_party,
            outbound: a_tx,
            inbound: a_rx,
        };
        let b = Self {
            peer: a_party,
            outbound: b_tx,
            inbound: b_rx,
        };
        (a, b)
    }
}

#[async_trait]
impl Session for ChannelSession {
    fn peer(&self) -> &Party {
        &self.peer
    }

    async fn send(&mut self, message: FlowMessage) -> Result<(), SessionError> {
        let frame = codec::encode(&message).map_err(|e| SessionError::Codec(e.to_string()))?;
        trace!(peer = %self.peer, kind = message.kind(), bytes = frame.len(), "send");
        self.outbound
            .send(frame)
            .await
            .map_err(|_| SessionError::Disconnected)
    }

    async fn receive(&mut self, wait: Duration) -> Result<FlowMessage, SessionError> {
        match tokio::time::timeout(wait, self.inbound.recv()).await {
            Err(_) => Err(SessionError::Timeout(wait)),
            Ok(None) => Err(SessionError::Disconnected),
            Ok(Some(frame)) => {
                let message: FlowMessage =
                    codec::decode(&frame).map_err(|e| SessionError::Codec(e.to_string()))?;
                trace!(peer = %self.peer, kind = message.kind(), "recv");
                Ok(message)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryNetwork
// ---------------------------------------------------------------------------

/// Sessions arriving at a party, as handed to its responder loop.
pub type Inbox = mpsc::Receiver<Box<dyn Session>>;

/// Process-local switchboard. Cheap to clone; clones share the registry.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    inboxes: Arc<DashMap<PartyPublicKey, mpsc::Sender<Box<dyn Session>>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `party`. Returns its messaging handle and the inbox its
    /// responder should drain. Registering again replaces the old inbox.
    pub fn register(&self, party: Party) -> (InMemoryMessaging, Inbox) {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        self.inboxes.insert(party.owning_key.clone(), tx);
        debug!(party = %party, "registered on in-memory network");
        let handle = InMemoryMessaging {
            me: party,
            network: self.clone(),
        };
        (handle, rx)
    }

    /// Take a party off the network. New sessions to it fail with
    /// `UnknownPeer`; sessions already open are unaffected.
    pub fn disconnect(&self, key: &PartyPublicKey) {
        self.inboxes.remove(key);
    }

    pub fn is_registered(&self, key: &PartyPublicKey) -> bool {
        self.inboxes.contains_key(key)
    }
}

/// A party's view of the [`InMemoryNetwork`].
#[derive(Clone)]
pub struct InMemoryMessaging {
    me: Party,
    network: InMemoryNetwork,
}

impl InMemoryMessaging {
    pub fn identity(&self) -> &Party {
        &self.me
    }
}

#[async_trait]
impl Messaging for InMemoryMessaging {
    async fn open_session(&self, peer: &Party) -> Result<Box<dyn Session>, SessionError> {
        // Clone the sender out so no dashmap guard lives across the await.
        let inbox = self
            .network
            .inboxes
            .get(&peer.owning_key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::UnknownPeer(peer.name.clone()))?;

        let (ours, theirs) = ChannelSession::pair(self.me.clone(), peer.clone());
        inbox
            .send(Box::new(theirs))
            .await
            .map_err(|_| SessionError::Disconnected)?;
        debug!(from = %self.me, to = %peer, "session opened");
        Ok(Box::new(ours))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PartyKeypair;

    fn party(name: &str, seed: u8) -> Party {
        Party::new(name, PartyKeypair::from_seed(&[seed; 32]).public_key())
    }

    const WAIT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn messages_flow_both_ways() {
        let net = InMemoryNetwork::new();
        let alice = party("O=Alice", 1);
        let bob = party("O=Bob", 2);
        let (alice_net, _alice_inbox) = net.register(alice.clone());
        let (_bob_net, mut bob_inbox) = net.register(bob.clone());

        let mut to_bob = alice_net.open_session(&bob).await.unwrap();
        let mut from_alice = bob_inbox.recv().await.unwrap();
        assert_eq!(from_alice.peer(), &alice);

        to_bob
            .send(FlowMessage::Reject {
                reason: "ping".into(),
            })
            .await
            .unwrap();
        let got = from_alice.receive(WAIT).await.unwrap();
        assert_eq!(
            got,
            FlowMessage::Reject {
                reason: "ping".into()
            }
        );

        from_alice
            .send(FlowMessage::Abort {
                reason: "pong".into(),
            })
            .await
            .unwrap();
        assert!(matches!(
            to_bob.receive(WAIT).await,
            Ok(FlowMessage::Abort { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_peer() {
        let net = InMemoryNetwork::new();
        let (alice_net, _inbox) = net.register(party("O=Alice", 1));
        let result = alice_net.open_session(&party("O=Ghost", 7)).await;
        assert!(matches!(result, Err(SessionError::UnknownPeer(_))));
    }

    #[tokio::test]
    async fn dropping_one_end_disconnects_the_other() {
        let (mut a, b) = ChannelSession::pair(party("O=A", 1), party("O=B", 2));
        drop(b);
        assert_eq!(a.receive(WAIT).await, Err(SessionError::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let (mut a, _b) = ChannelSession::pair(party("O=A", 1), party("O=B", 2));
        assert_eq!(a.receive(WAIT).await, Err(SessionError::Timeout(WAIT)));
    }

    #[tokio::test]
    async fn disconnect_removes_the_route() {
        let net = InMemoryNetwork::new();
        let bob = party("O=Bob", 2);
        let (alice_net, _a) = net.register(party("O=Alice", 1));
        let (_bob_net, _b) = net.register(bob.clone());
        net.disconnect(&bob.owning_key);
        assert!(!net.is_registered(&bob.owning_key));
        assert!(alice_net.open_session(&bob).await.is_err());
    }
}
