//! Resolve Presence
//!
//! A background companion that mirrors what you are doing in DaVinci Resolve
//! into Discord Rich Presence.
//!
//! # Features
//! - Polls for running Resolve and Discord processes
//! - Talks to Resolve through its bundled fuscript scripting bridge
//! - Publishes project and timeline names as a rich-presence activity
//! - Reconnects either side independently when it drops
//! - Runs as a system tray application or headless from a terminal

pub mod core;
pub mod editor;
pub mod presence;
pub mod probe;
pub mod tray;

pub use core::config::Config;
pub use core::control::{CancelFlag, ReconnectRequests};
pub use core::events::AppEvent;
pub use editor::{EditorClient, EditorSnapshot, EditorState, ResolveBridge};
pub use presence::{DiscordPresence, PresenceSyncLoop, StatusSink};
pub use probe::{ProcessProbe, SystemProbe};
