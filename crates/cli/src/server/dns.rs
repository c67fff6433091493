use minke_dns_domain::{DomainError, QueryContext, TransportKind};
use minke_dns_infrastructure::dns::{wire, DnsRequestHandler};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_UDP_PACKET: usize = 4096;

pub async fn start_dns_server(
    bind_addr: String,
    handler: Arc<DnsRequestHandler>,
    tcp_enabled: bool,
    udp_retry_backoff: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = bind_addr.parse()?;
    info!(bind_address = %socket_addr, tcp_enabled, "Starting DNS server");

    let tcp_task = if tcp_enabled {
        match create_tcp_listener(socket_addr) {
            Ok(listener) => Some(tokio::spawn(run_tcp_listener(
                listener,
                handler.clone(),
                shutdown.clone(),
            ))),
            Err(e) => {
                warn!(bind_address = %socket_addr, error = %e, "TCP listener unavailable, serving UDP only");
                None
            }
        }
    } else {
        None
    };

    // A failed bind, at startup or later, is retried after the backoff.
    let udp = match create_udp_socket(socket_addr) {
        Ok(socket) => Some(socket),
        Err(e) => {
            error!(bind_address = %socket_addr, error = %e, backoff_ms = udp_retry_backoff.as_millis() as u64, "UDP bind failed, retrying");
            rebind_udp(socket_addr, udp_retry_backoff, &shutdown).await
        }
    };

    if let Some(udp) = udp {
        info!(bind_address = %socket_addr, "DNS server ready");
        run_udp_listener(udp, socket_addr, handler, udp_retry_backoff, shutdown).await;
    }

    if let Some(task) = tcp_task {
        task.abort();
    }
    Ok(())
}

async fn run_udp_listener(
    mut socket: Arc<UdpSocket>,
    socket_addr: SocketAddr,
    handler: Arc<DnsRequestHandler>,
    retry_backoff: Duration,
    shutdown: CancellationToken,
) {
    let mut recv_buf = [0u8; MAX_UDP_PACKET];

    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => return,
            received = socket.recv_from(&mut recv_buf) => received,
        };

        match received {
            Ok((n, from)) => {
                let packet = recv_buf[..n].to_vec();
                let handler = handler.clone();
                let socket = socket.clone();
                tokio::spawn(async move {
                    let ctx = QueryContext::new(from, TransportKind::Udp);
                    let reply = handler.handle_packet(&packet, ctx).await;
                    if let Err(e) = socket.send_to(&reply, from).await {
                        debug!(client = %from, error = %e, "UDP send failed");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, backoff_ms = retry_backoff.as_millis() as u64, "UDP listener failed, rebinding");
                socket = match rebind_udp(socket_addr, retry_backoff, &shutdown).await {
                    Some(socket) => socket,
                    None => return,
                };
            }
        }
    }
}

async fn rebind_udp(
    socket_addr: SocketAddr,
    retry_backoff: Duration,
    shutdown: &CancellationToken,
) -> Option<Arc<UdpSocket>> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return None,
            _ = tokio::time::sleep(retry_backoff) => {}
        }
        match create_udp_socket(socket_addr) {
            Ok(socket) => {
                info!(bind_address = %socket_addr, "UDP listener rebound");
                return Some(socket);
            }
            Err(e) => warn!(bind_address = %socket_addr, error = %e, "UDP rebind failed"),
        }
    }
}

async fn run_tcp_listener(
    listener: TcpListener,
    handler: Arc<DnsRequestHandler>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, from)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_tcp_connection(stream, from, &handler).await {
                        debug!(client = %from, error = %e, "TCP connection closed");
                    }
                });
            }
            Err(e) => warn!(error = %e, "TCP accept failed"),
        }
    }
}

/// One length-prefixed exchange, then the connection is closed.
async fn serve_tcp_connection(
    mut stream: TcpStream,
    from: SocketAddr,
    handler: &DnsRequestHandler,
) -> Result<(), DomainError> {
    let packet = tokio::time::timeout(TCP_IDLE_TIMEOUT, wire::read_framed(&mut stream))
        .await
        .map_err(|_| DomainError::IoError("TCP client idle".to_string()))??;

    let reply = handler
        .handle_packet(&packet, QueryContext::new(from, TransportKind::Tcp))
        .await;
    wire::write_framed(&mut stream, &reply).await
}

fn socket_domain(socket_addr: SocketAddr) -> Domain {
    if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}

fn create_udp_socket(socket_addr: SocketAddr) -> anyhow::Result<Arc<UdpSocket>> {
    let socket = Socket::new(socket_domain(socket_addr), Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(Arc::new(UdpSocket::from_std(std_socket)?))
}

fn create_tcp_listener(socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(socket_domain(socket_addr), Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
