//! Shared UDP exchange (RFC 1035 §4.2.1).
//!
//! One socket and one reader task per local address. Outstanding queries
//! are keyed by transaction id; a reply is only accepted from the peer the
//! query was sent to.

use crate::dns::wire;
use hickory_proto::op::Message;
use minke_dns_domain::DomainError;
use rustc_hash::FxHashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;
const MAX_ID_ATTEMPTS: usize = 32;

struct PendingReply {
    peer: SocketAddr,
    tx: oneshot::Sender<Vec<u8>>,
}

type PendingTable = Arc<Mutex<FxHashMap<u16, PendingReply>>>;

pub struct UdpExchange {
    socket: Arc<UdpSocket>,
    pending: PendingTable,
    reader: JoinHandle<()>,
}

impl UdpExchange {
    pub async fn bind(local: SocketAddr) -> Result<Self, DomainError> {
        let socket = UdpSocket::bind(local).await.map_err(|e| {
            DomainError::Socket(format!("Failed to bind UDP socket {}: {}", local, e))
        })?;
        Ok(Self::from_socket(socket))
    }

    /// Ephemeral socket of the same family as `peer`.
    pub async fn ephemeral_for(peer: SocketAddr) -> Result<Self, DomainError> {
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self::bind(local).await
    }

    pub fn from_socket(socket: UdpSocket) -> Self {
        let socket = Arc::new(socket);
        let pending: PendingTable = Arc::new(Mutex::new(FxHashMap::default()));
        let reader = tokio::spawn(read_replies(Arc::clone(&socket), Arc::clone(&pending)));
        Self {
            socket,
            pending,
            reader,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.socket
            .local_addr()
            .map_err(|e| DomainError::Socket(e.to_string()))
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send `request` to `peer` under a fresh transaction id and wait for
    /// the matching reply.
    pub async fn exchange(
        &self,
        request: &Message,
        peer: SocketAddr,
        timeout: Duration,
    ) -> Result<Message, DomainError> {
        let (tx, rx) = oneshot::channel();
        let id = self.register(peer, tx)?;

        let mut header = *request.header();
        header.set_id(id);
        let mut outbound = request.clone();
        outbound.set_header(header);
        let result = self.send_and_wait(&outbound, peer, rx, timeout).await;

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        result
    }

    async fn send_and_wait(
        &self,
        outbound: &Message,
        peer: SocketAddr,
        rx: oneshot::Receiver<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Message, DomainError> {
        let bytes = wire::encode(outbound)?;
        self.socket
            .send_to(&bytes, peer)
            .await
            .map_err(|e| DomainError::transport(peer, e))?;
        debug!(server = %peer, id = outbound.id(), bytes_sent = bytes.len(), "UDP query sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => wire::decode(&reply),
            Ok(Err(_)) => Err(DomainError::transport(peer, "reply channel closed")),
            Err(_) => Err(DomainError::UpstreamTimeout {
                server: peer.to_string(),
            }),
        }
    }

    fn register(
        &self,
        peer: SocketAddr,
        tx: oneshot::Sender<Vec<u8>>,
    ) -> Result<u16, DomainError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = fastrand::u16(..);
            if let std::collections::hash_map::Entry::Vacant(slot) = pending.entry(id) {
                slot.insert(PendingReply { peer, tx });
                return Ok(id);
            }
        }
        Err(DomainError::transport(
            peer,
            "no free transaction id on shared socket",
        ))
    }
}

impl Drop for UdpExchange {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_replies(socket: Arc<UdpSocket>, pending: PendingTable) {
    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                debug!(error = %e, "UDP exchange receive failed");
                continue;
            }
        };
        if len < 2 {
            continue;
        }

        let id = u16::from_be_bytes([buf[0], buf[1]]);
        let waiter = {
            let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.get(&id) {
                Some(waiting) if waiting.peer == from => pending.remove(&id),
                _ => None,
            }
        };

        match waiter {
            Some(waiter) => {
                let _ = waiter.tx.send(buf[..len].to_vec());
            }
            None => {
                // Late replies to timed-out queries land here too.
                debug!(received_from = %from, id, "UDP response with no waiting query");
            }
        }
    }
}
