//! The Listener and per-connection Session loop (spec.md §2/§4.1/§4.2),
//! following the teacher crate's `server/ftpserver/listen.rs` (accept loop
//! spawning one task per connection) and `server/controlchan/control_loop.rs`
//! (the per-connection command loop), collapsed to this crate's simpler,
//! sequential, no-`Arc<Mutex<Session>>` model (see `session.rs`'s doc
//! comment for why that simplification is sound here).

mod accountant;
mod command;
mod datachan;
pub(crate) mod error;
mod handlers;
mod listing;
mod portpool;
mod reply;
mod session;
mod transfer;

pub use error::ServerError;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::config::Config;
use crate::storage::ObjectStore;

use accountant::{Admission, ConnectionAccountant};
use handlers::Shared;
use portpool::PortPool;
use reply::{Reply, ReplyCode, ReplyCodec};
use session::Session;

/// The FTP server core: one listening endpoint plus the state shared by
/// every control connection it spawns (spec.md §2's "Listener" row).
///
/// Generic over the storage backend rather than boxed as `Arc<dyn
/// ObjectStore>`, following the quick-start example in `lib.rs` — most
/// embedders have exactly one storage backend in mind at the call site, so
/// static dispatch costs nothing and avoids a vtable on every I/O call.
pub struct Server<S: ObjectStore> {
    shared: Arc<Shared<S>>,
}

impl<S: ObjectStore + 'static> Server<S> {
    /// Builds a server around `storage` and `config`. Does not bind a
    /// socket; call [`Server::listen`] to start accepting connections.
    pub fn new(storage: S, config: Config) -> Self {
        let port_pool = Arc::new(PortPool::new(config.passive_ports.clone()));
        Server {
            shared: Arc::new(Shared {
                storage: Arc::new(storage),
                config: Arc::new(config),
                accountant: Arc::new(ConnectionAccountant::new()),
                port_pool,
            }),
        }
    }

    /// Binds `addr` and accepts control connections until the process is
    /// killed or the listener itself errors, spawning one task per
    /// connection (spec.md §2: "Accepts control connections; per
    /// connection, allocates a Session").
    #[tracing_attributes::instrument(skip(self))]
    pub async fn listen<A: ToSocketAddrs + std::fmt::Debug>(&self, addr: A) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        tracing::info!(local_addr = ?listener.local_addr().ok(), "control channel listener bound");
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let shared = self.shared.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(shared, stream, peer_addr).await {
                            tracing::warn!(%peer_addr, error = %err, "control session ended with an I/O error");
                        }
                    });
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept an incoming control connection"),
            }
        }
    }
}

/// Runs one control connection end to end: admission, greeting, the
/// command loop, and releasing the admitted connection slot on the way
/// out, however the session ended (spec.md §4.1's decrement invariant).
async fn handle_connection<S: ObjectStore + 'static>(shared: Arc<Shared<S>>, stream: TcpStream, peer_addr: SocketAddr) -> std::io::Result<()> {
    let local_addr = stream.local_addr()?;
    let mut ctrl = Framed::new(stream, ReplyCodec::new());

    let admission = shared.accountant.admit(peer_addr.ip(), shared.config.max_connection, shared.config.max_user_connection);
    let connection_id = match admission {
        Admission::Accepted { connection_id } => connection_id,
        Admission::GlobalLimitExceeded => {
            let _ = handlers::send(&mut ctrl, Reply::new(ReplyCode::ServiceNotAvailable, "N users (the maximum) logged in.")).await;
            shared.accountant.release(peer_addr.ip());
            return Ok(());
        }
        Admission::PerIpLimitExceeded => {
            let _ = handlers::send(&mut ctrl, Reply::new(ReplyCode::NotLoggedIn, "Number of connections per IP is limited.")).await;
            shared.accountant.release(peer_addr.ip());
            return Ok(());
        }
    };

    handlers::send(&mut ctrl, Reply::new(ReplyCode::ServiceReady, shared.config.greeting.clone())).await?;

    let mut session = Session::new(connection_id);
    let result = command_loop(&shared, &mut ctrl, &mut session, local_addr).await;
    shared.accountant.release(peer_addr.ip());
    result
}

/// The sequential command loop (spec.md §4.2/§5): read one line, dispatch
/// it, write the reply, repeat — "the server does not begin parsing the
/// next command until the previous handler's reply has been written."
async fn command_loop<S: ObjectStore + 'static>(
    shared: &Arc<Shared<S>>,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    session: &mut Session,
    local_addr: SocketAddr,
) -> std::io::Result<()> {
    loop {
        let line = match tokio::time::timeout(shared.config.control_timeout, ctrl.next()).await {
            Ok(Some(Ok(line))) => line,
            Ok(Some(Err(err))) => return Err(err),
            Ok(None) => return Ok(()),
            Err(_elapsed) => {
                let _ = handlers::send(ctrl, Reply::new(ReplyCode::ServiceNotAvailable, "Control connection timed out.")).await;
                return Ok(());
            }
        };

        let command = command::parse(&line);
        let (reply, close) = handlers::dispatch(shared, session, ctrl, local_addr, command).await;
        handlers::send(ctrl, reply).await?;
        if close {
            return Ok(());
        }
    }
}
