//! Per-session state: identity, outbound channel, and the line state machine.
//!
//! A session moves through three states:
//!
//! ```text
//! ┌─────────────┐  name line   ┌─────────┐  /quit, read error,  ┌────────┐
//! │ Handshaking ├─────────────▶│ Active  ├─────────────────────▶│ Closed │
//! └─────────────┘              └─────────┘  or server shutdown  └────────┘
//! ```
//!
//! `Handshaking` and `Closed` are phases of the connection task (prompt and
//! cleanup respectively); [`Active`] is the data-carrying state in between.
//! Entering `Active` consumes the client-supplied name; every input line is
//! applied through [`Active::on_line`], which returns the [`Action`] the
//! connection task applies to the roster. Session logic produces effects and
//! callers apply them, which keeps the state machine testable without a
//! socket in sight.

use crate::commands::Command;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for a connection/session.
pub type SessionId = Uuid;

/// Registry-side view of one live session.
///
/// The connection task owns the socket; the roster owns this handle. The
/// outbound channel is bounded, so fan-out never waits on a slow peer.
/// Dropping the handle closes the channel, which the connection task
/// observes as its signal to unwind.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub outbound: mpsc::Sender<Arc<str>>,
}

impl SessionHandle {
    pub fn new(id: SessionId, outbound: mpsc::Sender<Arc<str>>) -> Self {
        Self { id, outbound }
    }
}

/// Effect of one input line on an active session.
///
/// The session produces effects; the connection task applies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Relay a formatted line to every registered session.
    Broadcast(String),

    /// Write a line back to the issuing session only.
    Reply(String),

    /// Broadcast the departure line, then close the session.
    Quit(String),
}

/// The `Active` session state.
#[derive(Debug)]
pub struct Active {
    name: String,
}

impl Active {
    /// Enter the `Active` state with the client-supplied display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Current display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The line announced to the roster when this session becomes visible.
    pub fn join_line(&self) -> String {
        format!("{} has joined the chat.", self.name)
    }

    /// The line announced when this session departs, whether via `/quit`
    /// or a detected read failure.
    pub fn leave_line(&self) -> String {
        format!("{} has left the chat.", self.name)
    }

    /// Apply one input line, updating the display name on a rename.
    pub fn on_line(&mut self, line: &str) -> Action {
        match Command::parse(line) {
            Command::Quit => Action::Quit(self.leave_line()),
            Command::Nick(Some(new_name)) => {
                let notice = format!("{} changed their name to {}.", self.name, new_name);
                self.name = new_name.to_string();
                Action::Broadcast(notice)
            }
            // A bare `/nick` renames nobody and stays invisible to the room.
            Command::Nick(None) => Action::Reply("Usage: /nick <newname>".to_string()),
            Command::Chat(text) => Action::Broadcast(format!("{}: {}", self.name, text)),
        }
    }
}
