//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds the listen socket and spawns a Connection task for
//! each incoming client. It also owns the shutdown signal: when the
//! listener fails or the process is interrupted, every connection task
//! observes the signal, drops its socket, and unwinds into `Closed`.

use crate::config::{Config, LimitsConfig};
use crate::network::Connection;
use crate::state::{Roster, SessionHandle, SessionId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// How long `shutdown` waits for connection tasks to unwind.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    roster: Arc<Roster>,
    limits: LimitsConfig,
    shutdown_tx: watch::Sender<()>,
    shutdown_rx: watch::Receiver<()>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    ///
    /// A bind failure is fatal and propagates to the caller.
    pub async fn bind(config: &Config, roster: Arc<Roster>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.server.listen).await?;
        info!(addr = %config.server.listen, "Listener bound");

        let (shutdown_tx, shutdown_rx) = watch::channel(());

        Ok(Self {
            listener,
            roster,
            limits: config.limits.clone(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Address the listener actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections until shutdown.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let sid: SessionId = Uuid::new_v4();

                            // The accept loop creates the session and
                            // registers it; the connection task only ever
                            // unregisters.
                            let (outbound_tx, outbound_rx) =
                                mpsc::channel(self.limits.outgoing_queue);
                            self.roster.register(SessionHandle::new(sid, outbound_tx));
                            info!(%sid, %addr, sessions = self.roster.len(), "Connection accepted");

                            let roster = Arc::clone(&self.roster);
                            let shutdown = self.shutdown_rx.clone();
                            let max_line_length = self.limits.max_line_length;
                            tokio::spawn(async move {
                                let connection = Connection::new(
                                    sid,
                                    stream,
                                    addr,
                                    roster,
                                    outbound_rx,
                                    shutdown,
                                    max_line_length,
                                );
                                connection.run().await;
                                info!(%sid, %addr, "Connection closed");
                            });
                        }
                        Err(e) => {
                            // Listener failure is fatal: stop accepting and
                            // force every pending read to unwind into Closed.
                            error!(error = %e, "Failed to accept connection");
                            self.shutdown().await;
                            return Err(e.into());
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    self.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Stop accepting, signal every connection task, and wait for them to
    /// unwind into `Closed`.
    async fn shutdown(self) {
        let Self {
            shutdown_tx,
            shutdown_rx,
            ..
        } = self;
        drop(shutdown_rx);
        let _ = shutdown_tx.send(());

        // `closed` resolves once every session has dropped its receiver.
        if tokio::time::timeout(SHUTDOWN_GRACE, shutdown_tx.closed())
            .await
            .is_err()
        {
            warn!("Timed out waiting for sessions to close");
        }
    }
}
