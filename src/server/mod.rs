//! Accept loop and the listen / restart / shutdown state machine.

pub mod session;

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::media::catalog::Catalog;
use crate::media::indexer;
use crate::playback::Supervisor;

const LISTEN_BACKLOG: i32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServerState {
    Listening,
    Restarting,
    ShuttingDown,
}

/// Everything a request may touch. Owned by [`run`] and lent to one
/// exchange at a time.
#[derive(Debug)]
pub struct ServerContext {
    pub config: Config,
    pub catalog: Catalog,
    pub supervisor: Supervisor,
    pub state: ServerState,
}

impl ServerContext {
    pub fn new(config: Config, catalog: Catalog, supervisor: Supervisor) -> Self {
        Self {
            config,
            catalog,
            supervisor,
            state: ServerState::Listening,
        }
    }

    /// Stop playback, drop the catalog and index the roots again.
    pub async fn restart(&mut self) {
        if let Err(e) = self.supervisor.stop().await {
            tracing::warn!("Playback still active during restart: {}", e);
        }

        let previous = self.catalog.version();
        self.catalog = Catalog::empty();

        let roots = self.config.roots.clone();
        let mut catalog = match tokio::task::spawn_blocking(move || indexer::build(&roots)).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Catalog rebuild failed: {}", e);
                Catalog::empty()
            }
        };
        catalog.ensure_newer_than(previous);
        tracing::info!("Items: {}/{}", catalog.size(), catalog.capacity());

        self.catalog = catalog;
        self.state = ServerState::Listening;
    }
}

/// Bind the listening socket with SO_REUSEADDR so a restarted server can
/// take the port back immediately.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Serve until SHUTDOWN or until `shutdown` resolves.
///
/// Exchanges are strictly sequential: the next connection is accepted only
/// after the previous response, and any rebuild it triggered, is complete.
/// An accept error is fatal.
pub async fn run<F>(ctx: &mut ServerContext, listener: TcpListener, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let exit_flag = ctx.supervisor.exit_flag().clone();

    tracing::info!("Listening on {}", listener.local_addr()?);
    ctx.state = ServerState::Listening;

    while ctx.state == ServerState::Listening {
        if exit_flag.take() {
            if let Err(e) = ctx.supervisor.reap_exited().await {
                tracing::error!("Failed to reap player: {}", e);
            }
        }

        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            () = exit_flag.notified() => continue,
            () = &mut shutdown => {
                tracing::info!("Shutdown requested locally");
                ctx.state = ServerState::ShuttingDown;
                continue;
            }
        };

        tracing::info!("Handling client {}", peer.ip());
        session::handle(ctx, stream).await;

        if ctx.state == ServerState::Restarting {
            tracing::info!("Restarting: rebuilding catalog");
            ctx.restart().await;
        }
    }

    if let Err(e) = ctx.supervisor.stop().await {
        tracing::error!("Player left running at shutdown: {}", e);
    }
    drop(listener);
    tracing::info!("Server stopped");
    Ok(())
}
