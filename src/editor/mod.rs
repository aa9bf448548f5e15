//! Editor-side collaborator: snapshot types and the Resolve scripting bridge

mod resolve;

pub use resolve::{BridgeHandle, ResolveBridge};

/// A fresh view of the editor's current project and timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub project_name: String,
    pub timeline_name: Option<String>,
}

/// Result of a snapshot fetch from a connected editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    /// A project is open; the timeline may still be absent
    Active(EditorSnapshot),
    /// Connected but idle: no project is open
    NoProject,
}

/// Editor bridge failures
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The bridge could not be established; wait and retry
    #[error("editor bridge unavailable: {0}")]
    Unavailable(String),
    /// A previously good handle now errors; discard it and reconnect
    #[error("editor connection went stale: {0}")]
    Stale(String),
}

/// Connection to the video editor's scripting bridge.
///
/// A `Handle` stays valid until the editor process terminates or the bridge
/// reports an error; the sync loop owns the handle and discards it on either.
pub trait EditorClient: Send {
    type Handle: Send;

    /// Attempt the handshake once; retry policy belongs to the caller
    fn connect(&mut self) -> Result<Self::Handle, EditorError>;

    /// Fetch the current project/timeline state through an established handle
    fn state(&mut self, handle: &mut Self::Handle) -> Result<EditorState, EditorError>;
}
