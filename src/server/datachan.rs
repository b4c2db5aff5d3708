//! The Data Channel Coordinator (spec.md §4.4): establishes a passive or
//! active data connection and exposes a single-assignment "connected"
//! signal, following `slftpd/ftpd.py`'s `PSVTransporter`/`PRTTransporter`
//! (`Transporter.connected = asyncio.Future()`) re-expressed with a
//! `tokio::sync::oneshot` channel, which gives us `try_recv` for the
//! non-blocking "already connected?" check spec.md §4.5 needs without a
//! separate `AtomicBool`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::codec::Framed;

use super::portpool::PortPool;
use super::reply::{Reply, ReplyCode, ReplyCodec};

/// The data-channel *establishment* bound: how long `PORT` waits to dial
/// out, and how long `acquire_stream` waits for a pending `PASV` to accept
/// (spec.md §4.4's "5 s timeout" for `PORT`, §4.5's "awaits `connected`
/// with a 5 s timeout", §4.8's "Refused/failed active-mode connect within
/// 5 s"). Fixed, not configurable — distinct from `Config::data_timeout`,
/// which bounds idle time *during* an already-open transfer.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds the data channel for one pending or active transfer. Spec.md §3:
/// "At most one Transporter per Session at any time; assigning a new one
/// discards any previous one" — dropping a `Transporter` releases its
/// resources: a `Passive` transporter's background accept task observes
/// its cancel sender being dropped and returns the leased port; an
/// `Active` transporter simply drops its (possibly still-open) socket.
pub enum Transporter {
    Passive {
        rx: oneshot::Receiver<TcpStream>,
        /// Kept alive only to signal cancellation on drop; never sent on.
        _cancel: oneshot::Sender<()>,
    },
    Active {
        stream: Option<TcpStream>,
    },
}

impl Transporter {
    /// Non-blocking check: returns the stream immediately if the data
    /// channel is already up (spec.md §4.5: "if `connected` is already
    /// resolved, sends `125`").
    pub fn poll_connected(&mut self) -> Option<TcpStream> {
        match self {
            Transporter::Passive { rx, .. } => rx.try_recv().ok(),
            Transporter::Active { stream } => stream.take(),
        }
    }

    /// Awaits the data channel coming up, bounded by `timeout` (spec.md
    /// §4.5: "else sends `150` and awaits `connected` with a 5 s timeout").
    /// Only meaningful for `Passive`; `Active` is always already-connected
    /// by the time the `Transporter` exists (the `PORT` handler dials out
    /// synchronously), so `poll_connected` always succeeds for it first.
    pub async fn wait_connected(&mut self, timeout: Duration) -> Option<TcpStream> {
        match self {
            Transporter::Passive { rx, .. } => tokio::time::timeout(timeout, rx).await.ok().and_then(|r| r.ok()),
            Transporter::Active { stream } => stream.take(),
        }
    }
}

/// Outcome of `PASV`: either the reply text to send, or that no port was
/// available within the pool's lease timeout.
pub enum PasvOutcome {
    Listening { transporter: Transporter, octets: [u8; 4], port: u16 },
    NoPortAvailable,
}

/// Leases a port from `pool`, binds a single-backlog listener on it, and
/// spawns the background task that accepts the one data connection this
/// transfer will use, following `ftpd.py`'s `PSVTransporter.connect`
/// (`asyncio.start_server(..., backlog=1)`) and `onconnect`/`close_server`.
///
/// `control_local_ip` is the control connection's own local address, used
/// verbatim in the `227` reply per spec.md §4.4 ("using the control
/// connection's local address ... so that NAT-less clients can reach us").
pub async fn start_passive(pool: Arc<PortPool>, control_local_ip: IpAddr) -> std::io::Result<PasvOutcome> {
    let Some(port) = pool.lease().await else {
        return Ok(PasvOutcome::NoPortAvailable);
    };

    let bind_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    let listener = match TcpListener::bind(SocketAddr::new(bind_ip, port)).await {
        Ok(l) => l,
        Err(err) => {
            pool.return_port(port).await;
            return Err(err);
        }
    };

    let (tx, rx) = oneshot::channel();
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::select! {
            accepted = listener.accept() => {
                if let Ok((stream, _peer)) = accepted {
                    let _ = tx.send(stream);
                }
            }
            _ = &mut cancel_rx => {}
        }
        pool.return_port(port).await;
    });

    let octets = match control_local_ip {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(_) => [127, 0, 0, 1], // spec.md §1 excludes IPv6 data connections
    };

    Ok(PasvOutcome::Listening {
        transporter: Transporter::Passive { rx, _cancel: cancel_tx },
        octets,
        port,
    })
}

/// Dials out to the client-specified `addr:port` with a 5s timeout,
/// following `ftpd.py`'s `PRTTransporter.connect`
/// (`asyncio.wait_for(asyncio.open_connection(...), 5)`).
pub async fn start_active(addr: (u8, u8, u8, u8, u16), timeout: Duration) -> std::io::Result<Option<Transporter>> {
    let (a, b, c, d, port) = addr;
    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(a, b, c, d)), port);
    match tokio::time::timeout(timeout, TcpStream::connect(socket_addr)).await {
        Ok(Ok(stream)) => Ok(Some(Transporter::Active { stream: Some(stream) })),
        Ok(Err(err)) => Err(err),
        Err(_elapsed) => Ok(None),
    }
}

/// Sends the `125`/`150` reply appropriate to whether the data channel is
/// already up, then, if not, awaits it — the handshake every transfer
/// command (RETR/STOR/APPE/LIST/MLSD) performs before running its payload
/// (spec.md §4.5). Returns the connected stream, or a final reply to send
/// in place of running the transfer at all (timeout).
pub async fn acquire_stream(ctrl: &mut Framed<TcpStream, ReplyCodec>, transporter: &mut Transporter) -> Result<TcpStream, Reply> {
    if let Some(stream) = transporter.poll_connected() {
        let _ = ctrl.send(Reply::new(ReplyCode::DataConnectionAlreadyOpen, "Opening data connection.")).await;
        return Ok(stream);
    }
    let _ = ctrl.send(Reply::new(ReplyCode::FileStatusOkay, "Opening data connection.")).await;
    match transporter.wait_connected(CONNECT_TIMEOUT).await {
        Some(stream) => Ok(stream),
        None => Err(Reply::new(ReplyCode::ServiceNotAvailable, "Data connection timed out.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passive_connect_resolves_and_returns_port_on_accept() {
        let pool = Arc::new(PortPool::new(18030..18031));
        let outcome = start_passive(pool.clone(), IpAddr::V4(Ipv4Addr::LOCALHOST)).await.unwrap();
        let (mut transporter, port) = match outcome {
            PasvOutcome::Listening { transporter, port, .. } => (transporter, port),
            PasvOutcome::NoPortAvailable => panic!("expected a leased port"),
        };

        assert!(transporter.poll_connected().is_none());

        let client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let stream = transporter.wait_connected(Duration::from_secs(1)).await;
        assert!(stream.is_some());
        drop(client);

        // Give the background task a beat to return the port after accept.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.size().await, 1);
    }

    #[tokio::test]
    async fn dropping_pending_passive_transporter_returns_the_port() {
        let pool = Arc::new(PortPool::new(18031..18032));
        let outcome = start_passive(pool.clone(), IpAddr::V4(Ipv4Addr::LOCALHOST)).await.unwrap();
        let transporter = match outcome {
            PasvOutcome::Listening { transporter, .. } => transporter,
            PasvOutcome::NoPortAvailable => panic!("expected a leased port"),
        };
        drop(transporter);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.size().await, 1);
    }

    #[tokio::test]
    async fn active_connect_to_closed_port_errors() {
        // Port 1 is reserved/unlikely to accept loopback connections in test sandboxes;
        // use an address guaranteed to refuse rather than timeout-stall the test.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let result = start_active((127, 0, 0, 1, port), Duration::from_millis(500)).await;
        assert!(result.is_err() || matches!(result, Ok(None)));
    }
}
