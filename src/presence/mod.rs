//! Discord Rich Presence side: payload derivation, the IPC client, status
//! reporting, and the sync loop that drives all of it.

pub mod discord;
pub mod payload;
pub mod status;
pub mod sync;

pub use discord::{DiscordPresence, PresenceClient, PresenceError};
pub use payload::PresencePayload;
pub use status::{EventSink, LogSink, StatusSink};
pub use sync::{DependencyState, PresenceSyncLoop};
