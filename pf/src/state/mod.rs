//! State management with actor pattern
//!
//! StateManager owns the session (slices, focus, stage, chat log) and
//! processes messages via channels, persisting after every change.

mod manager;
mod messages;
mod session;

pub use manager::{StateEvent, StateManager};
pub use messages::{StateCommand, StateError, StateResponse};
pub use session::{FileSessionPersistence, MemorySessionPersistence, SESSION_FILE, Session, SessionPersistence};
