//! TCP Server
//!
//! Binds a listener and spawns one connection task per client. The accept
//! loop runs until the shutdown future resolves; connections that are
//! already open finish on their own.

use crate::commands::CommandHandler;
use crate::connection::handle_connection;
use crate::storage::Cache;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

/// A bound listener serving one shared cache.
pub struct Server {
    listener: TcpListener,
    handler: CommandHandler,
}

impl Server {
    /// Binds the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: impl ToSocketAddrs, cache: Arc<Cache>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            handler: CommandHandler::new(cache),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn cache(&self) -> &Arc<Cache> {
        self.handler.cache()
    }

    /// Accepts connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            error!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                        }
                        tokio::spawn(handle_connection(stream, addr, self.handler.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }
    }
}
