//! State management module.
//!
//! Contains the Roster (shared session registry) and per-session state.

mod roster;
pub mod session;

pub use roster::Roster;
pub use session::{Action, Active, SessionHandle, SessionId};
