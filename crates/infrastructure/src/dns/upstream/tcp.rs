//! One framed exchange per connection (RFC 1035 §4.2.2).

use crate::dns::wire::{self, read_framed, write_framed};
use hickory_proto::op::Message;
use minke_dns_domain::DomainError;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;

/// Query `peer` over a fresh TCP connection, optionally bound to `source`.
pub async fn exchange_tcp(
    request: &Message,
    peer: SocketAddr,
    source: Option<IpAddr>,
    timeout: Duration,
) -> Result<Message, DomainError> {
    tokio::time::timeout(timeout, exchange(request, peer, source))
        .await
        .map_err(|_| DomainError::UpstreamTimeout {
            server: peer.to_string(),
        })?
}

async fn exchange(
    request: &Message,
    peer: SocketAddr,
    source: Option<IpAddr>,
) -> Result<Message, DomainError> {
    let mut stream = connect(peer, source).await?;
    let query_bytes = wire::encode(request)?;

    write_framed(&mut stream, &query_bytes).await?;
    debug!(server = %peer, message_len = query_bytes.len(), "TCP query sent");

    let reply = read_framed(&mut stream).await?;
    debug!(server = %peer, response_len = reply.len(), "TCP response received");

    wire::decode(&reply)
}

async fn connect(peer: SocketAddr, source: Option<IpAddr>) -> Result<TcpStream, DomainError> {
    let socket = if peer.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|e| DomainError::Socket(format!("Failed to create TCP socket: {}", e)))?;

    if let Some(source) = source {
        socket.bind(SocketAddr::new(source, 0)).map_err(|e| {
            DomainError::Socket(format!("Failed to bind TCP socket to {}: {}", source, e))
        })?;
    }

    let stream = socket
        .connect(peer)
        .await
        .map_err(|e| DomainError::transport(peer, format!("connection refused: {}", e)))?;

    stream
        .set_nodelay(true)
        .map_err(|e| DomainError::transport(peer, format!("failed to set TCP_NODELAY: {}", e)))?;

    Ok(stream)
}
