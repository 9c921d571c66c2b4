//! Flow sessions
//!
//! A session is an asynchronous, ordered, bidirectional message channel with
//! one counterparty. Messages within a session are delivered in send order;
//! no ordering holds across sessions. A missing reply blocks until the flow
//! is cancelled externally — there is no implicit timeout.

use async_trait::async_trait;
use dashmap::DashMap;
use pactum_core::{FlowConfig, PactumError, PactumResult, PartyId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::message::FlowMessage;

/// Unique identifier for one session
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn random() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", &self.0.to_string()[..8])
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

/// One end of an open session
#[async_trait]
pub trait Session: Send {
    fn id(&self) -> SessionId;
    fn counterparty(&self) -> PartyId;

    /// Send a message; fails with `ProtocolViolation` if the counterparty
    /// has gone away
    async fn send(&mut self, message: FlowMessage) -> PactumResult<()>;

    /// Await the next message. Resolves only when a message arrives or the
    /// counterparty closes; the wait is otherwise unbounded.
    async fn receive(&mut self) -> PactumResult<FlowMessage>;
}

/// Transport capable of opening sessions to counterparties
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn open(&self, counterparty: &PartyId) -> PactumResult<Box<dyn Session>>;
}

/// In-process session over a pair of mpsc channels (FIFO per direction)
pub struct InProcSession {
    id: SessionId,
    counterparty: PartyId,
    tx: mpsc::Sender<FlowMessage>,
    rx: mpsc::Receiver<FlowMessage>,
}

#[async_trait]
impl Session for InProcSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn counterparty(&self) -> PartyId {
        self.counterparty
    }

    async fn send(&mut self, message: FlowMessage) -> PactumResult<()> {
        debug!(session = %self.id, to = %self.counterparty, msg = message.message_type(), "send");
        self.tx.send(message).await.map_err(|_| {
            PactumError::ProtocolViolation(format!(
                "session {} to {} is closed",
                self.id, self.counterparty
            ))
        })
    }

    async fn receive(&mut self) -> PactumResult<FlowMessage> {
        match self.rx.recv().await {
            Some(message) => {
                debug!(
                    session = %self.id,
                    from = %self.counterparty,
                    msg = message.message_type(),
                    "receive"
                );
                Ok(message)
            }
            None => Err(PactumError::ProtocolViolation(format!(
                "counterparty {} closed session {}",
                self.counterparty, self.id
            ))),
        }
    }
}

/// Hub connecting in-process parties. Each bound party gets an endpoint for
/// opening outbound sessions and a listener yielding inbound ones. Cloning
/// is cheap; clones share the same party registry.
#[derive(Clone, Default)]
pub struct InProcNetwork {
    config: FlowConfig,
    inboxes: Arc<DashMap<PartyId, mpsc::Sender<InProcSession>>>,
}

impl InProcNetwork {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            inboxes: Arc::new(DashMap::new()),
        }
    }

    /// Bind a party, producing its transport endpoint and session listener
    pub fn bind(&self, party: PartyId) -> (InProcEndpoint, SessionListener) {
        let (inbox_tx, inbox_rx) = mpsc::channel(self.config.session_buffer);
        self.inboxes.insert(party, inbox_tx);
        (
            InProcEndpoint {
                local: party,
                network: self.clone(),
            },
            SessionListener { rx: inbox_rx },
        )
    }
}

/// A party's outbound transport binding
pub struct InProcEndpoint {
    local: PartyId,
    network: InProcNetwork,
}

#[async_trait]
impl SessionTransport for InProcEndpoint {
    async fn open(&self, counterparty: &PartyId) -> PactumResult<Box<dyn Session>> {
        let inbox = self
            .network
            .inboxes
            .get(counterparty)
            .map(|entry| entry.clone())
            .ok_or_else(|| PactumError::PartyNotFound(counterparty.to_string()))?;

        let id = SessionId::random();
        let buffer = self.network.config.session_buffer;
        let (to_peer, peer_rx) = mpsc::channel(buffer);
        let (to_local, local_rx) = mpsc::channel(buffer);

        let peer_side = InProcSession {
            id,
            counterparty: self.local,
            tx: to_local,
            rx: peer_rx,
        };
        inbox.send(peer_side).await.map_err(|_| {
            PactumError::ProtocolViolation(format!("party {counterparty} is not accepting sessions"))
        })?;

        debug!(session = %id, from = %self.local, to = %counterparty, "opened session");
        Ok(Box::new(InProcSession {
            id,
            counterparty: *counterparty,
            tx: to_peer,
            rx: local_rx,
        }))
    }
}

/// Inbound session stream for a bound party
pub struct SessionListener {
    rx: mpsc::Receiver<InProcSession>,
}

impl SessionListener {
    /// Await the next inbound session; `None` when the network is dropped
    pub async fn accept(&mut self) -> Option<Box<dyn Session>> {
        self.rx.recv().await.map(|s| Box::new(s) as Box<dyn Session>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{Hash, StateRef};

    fn party(tag: u8) -> PartyId {
        PartyId([tag; 32])
    }

    #[tokio::test]
    async fn test_open_send_receive() {
        let network = InProcNetwork::new(FlowConfig::default());
        let (alice, _alice_listener) = network.bind(party(1));
        let (_bob_endpoint, mut bob_listener) = network.bind(party(2));

        let mut session = alice.open(&party(2)).await.unwrap();
        session
            .send(FlowMessage::ResolveRequest(vec![StateRef::new(
                Hash([1u8; 32]),
                0,
            )]))
            .await
            .unwrap();

        let mut inbound = bob_listener.accept().await.unwrap();
        assert_eq!(inbound.counterparty(), party(1));
        let msg = inbound.receive().await.unwrap();
        assert_eq!(msg.message_type(), "resolve_request");

        // Reply flows the other way on the same session
        inbound
            .send(FlowMessage::ResolveResponse(vec![]))
            .await
            .unwrap();
        let reply = session.receive().await.unwrap();
        assert_eq!(reply.message_type(), "resolve_response");
    }

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let network = InProcNetwork::new(FlowConfig::default());
        let (alice, _l1) = network.bind(party(1));
        let (_e2, mut bob_listener) = network.bind(party(2));

        let mut session = alice.open(&party(2)).await.unwrap();
        for i in 0..5u32 {
            session
                .send(FlowMessage::ResolveRequest(vec![StateRef::new(
                    Hash([i as u8; 32]),
                    i,
                )]))
                .await
                .unwrap();
        }

        let mut inbound = bob_listener.accept().await.unwrap();
        for i in 0..5u32 {
            match inbound.receive().await.unwrap() {
                FlowMessage::ResolveRequest(refs) => assert_eq!(refs[0].index, i),
                other => panic!("unexpected message: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_open_to_unknown_party_fails() {
        let network = InProcNetwork::new(FlowConfig::default());
        let (alice, _l) = network.bind(party(1));

        let result = alice.open(&party(9)).await;
        assert!(matches!(result, Err(PactumError::PartyNotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_session_surfaces_violation() {
        let network = InProcNetwork::new(FlowConfig::default());
        let (alice, _l1) = network.bind(party(1));
        let (_e2, mut bob_listener) = network.bind(party(2));

        let mut session = alice.open(&party(2)).await.unwrap();
        let inbound = bob_listener.accept().await.unwrap();
        drop(inbound);

        let result = session.receive().await;
        assert!(matches!(result, Err(PactumError::ProtocolViolation(_))));
    }
}
