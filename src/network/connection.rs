//! Connection - handles an individual client session.
//!
//! Each Connection runs in its own tokio task and drives the session
//! lifecycle in three phases:
//!
//! ```text
//! Phase 1: Handshaking (prompt + one name read, sequential)
//!    ↓
//! Phase 2: Active (tokio::select! over three events)
//!    ┌──────────────────────────────────────────────┐
//!    │  incoming line ──▶ state machine ──▶ roster  │
//!    │  relayed line  ──▶ socket write              │
//!    │  shutdown      ──▶ break                     │
//!    └──────────────────────────────────────────────┘
//!    ↓
//! Phase 3: Closed (unregister, announce departure once)
//! ```
//!
//! Transport errors never leave this task: any read or write failure closes
//! this session and nothing else.

use crate::state::{Action, Active, Roster, SessionId};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, instrument, warn};

/// Prompt sent before the initial name read.
const NAME_PROMPT: &str = "Enter your name:";

/// A client connection handler.
pub struct Connection {
    sid: SessionId,
    addr: SocketAddr,
    roster: Arc<Roster>,
    framed: Framed<TcpStream, LinesCodec>,
    outbound_rx: mpsc::Receiver<Arc<str>>,
    shutdown: watch::Receiver<()>,
}

impl Connection {
    pub fn new(
        sid: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        roster: Arc<Roster>,
        outbound_rx: mpsc::Receiver<Arc<str>>,
        shutdown: watch::Receiver<()>,
        max_line_length: usize,
    ) -> Self {
        Self {
            sid,
            addr,
            roster,
            framed: Framed::new(stream, LinesCodec::new_with_max_length(max_line_length)),
            outbound_rx,
            shutdown,
        }
    }

    /// Run the connection through its full lifecycle.
    #[instrument(skip(self), fields(sid = %self.sid, addr = %self.addr), name = "connection")]
    pub async fn run(mut self) {
        // Phase 1: Handshaking. Any failure here closes the session before
        // it ever becomes visible to the room: no join, no departure.
        let session = match self.handshake().await {
            Some(session) => session,
            None => {
                self.roster.unregister(self.sid);
                return;
            }
        };

        info!(name = %session.name(), "Session active");
        self.roster.broadcast(&session.join_line());

        // Phase 2: Active.
        let departure = self.active_loop(session).await;

        // Phase 3: Closed. Unregister first so the departure reaches every
        // *other* registered session exactly once; a second pass through
        // this path would find nothing left to remove or announce.
        self.roster.unregister(self.sid);
        self.roster.broadcast(&departure);
    }

    /// Phase 1: prompt for and read the display name.
    ///
    /// Returns `None` on any read/write failure, disconnect, or shutdown;
    /// the caller then closes without entering `Active`.
    async fn handshake(&mut self) -> Option<Active> {
        if let Err(e) = self.framed.send(NAME_PROMPT).await {
            debug!(error = %e, "Write error during handshake");
            return None;
        }

        tokio::select! {
            line = self.framed.next() => match line {
                Some(Ok(name)) => Some(Active::new(name)),
                Some(Err(e)) => {
                    debug!(error = %e, "Read error during handshake");
                    None
                }
                None => {
                    debug!("Client disconnected during handshake");
                    None
                }
            },
            _ = self.shutdown.changed() => None,
        }
    }

    /// Phase 2: the command loop. One suspension point per event; returns
    /// the departure line to announce during cleanup.
    async fn active_loop(&mut self, mut session: Active) -> String {
        loop {
            tokio::select! {
                // Incoming line from the client.
                incoming = self.framed.next() => {
                    let line = match incoming {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => {
                            // Oversized or invalid input ends this session
                            // only; peers still see the departure.
                            warn!(error = %e, "Read error");
                            return session.leave_line();
                        }
                        None => {
                            info!(name = %session.name(), "Client disconnected");
                            return session.leave_line();
                        }
                    };

                    match session.on_line(&line) {
                        Action::Broadcast(text) => self.roster.broadcast(&text),
                        Action::Reply(text) => {
                            if let Err(e) = self.framed.send(text.as_str()).await {
                                warn!(error = %e, "Write error");
                                return session.leave_line();
                            }
                        }
                        Action::Quit(departure) => {
                            info!(name = %session.name(), "Client quit");
                            return departure;
                        }
                    }
                }

                // Line relayed from the roster. `None` means the roster
                // dropped this session during fan-out (stalled or failed
                // recipient); unwind through the same departure path.
                relayed = self.outbound_rx.recv() => match relayed {
                    Some(line) => {
                        if let Err(e) = self.framed.send(&*line).await {
                            warn!(error = %e, "Write error");
                            return session.leave_line();
                        }
                    }
                    None => {
                        info!(name = %session.name(), "Dropped by roster");
                        return session.leave_line();
                    }
                },

                // Server shutdown: drop the socket and unwind.
                _ = self.shutdown.changed() => {
                    info!(name = %session.name(), "Server shutting down");
                    return session.leave_line();
                }
            }
        }
    }
}
