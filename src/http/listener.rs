//! TCP listener with one thread per accepted connection

use super::session::FdSessionOps;
use super::{FsStore, HttpServer, Result, ServerContext, StaticFreshnessTable};
use crate::config::ServerConfig;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

const LISTEN_BACKLOG: i32 = 128;

/// Accepts connections and hands each one to its own [`HttpServer`]
pub struct HttpListener {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl HttpListener {
    /// Bind the configured address and build the shared context: files under
    /// the document root, the built-in freshness table, and an origin derived
    /// from the bound address.
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let socket = Socket::new(
            Domain::for_address(config.bind_addr),
            Type::STREAM,
            Some(Protocol::TCP),
        )?;
        socket.set_reuse_address(true)?;
        socket.bind(&config.bind_addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;

        let listener: TcpListener = socket.into();
        let local = listener.local_addr()?;

        let context = ServerContext::new(
            Arc::new(FsStore::new(config.document_root.clone())),
            Arc::new(StaticFreshnessTable::demo()),
            config.origin_for(local),
        )
        .with_header_read_size(config.header_read_size);

        info!(
            addr = %local,
            root = %config.document_root.display(),
            origin = context.origin(),
            "listening"
        );

        Ok(HttpListener {
            listener,
            context: Arc::new(context),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The context shared by all connections
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Accept connections until the listener fails.
    ///
    /// Failed accepts are logged and skipped. Connections are never joined.
    pub fn run(self) -> Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.spawn(stream),
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
        Ok(())
    }

    fn spawn(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let context = Arc::clone(&self.context);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || serve_connection(stream, context));

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn connection thread");
        }
    }
}

/// Run the server loop on one accepted stream until the session closes
pub fn serve_connection(stream: TcpStream, context: Arc<ServerContext>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    info!(peer = %peer, "connection accepted");
    HttpServer::new(FdSessionOps::new(stream), context)
        .with_peer(peer)
        .run();
}
