//! Cooperative shutdown and manual-reconnect signalling
//!
//! The sync loop owns all connection state; other threads reach it only
//! through these flags. Cancellation is observed at every suspension point,
//! reconnect requests merely wake a pending cooldown early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag for the sync loop and its blocking waits
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One-shot reconnect requests delivered to the loop thread
///
/// Requests are consumed by the loop at the top of a tick. A request for a
/// dependency that is already connected has no effect beyond cutting the
/// current cooldown short.
#[derive(Debug, Clone, Default)]
pub struct ReconnectRequests {
    inner: Arc<ReconnectInner>,
}

#[derive(Debug, Default)]
struct ReconnectInner {
    editor: AtomicBool,
    discord: AtomicBool,
}

impl ReconnectRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_editor(&self) {
        self.inner.editor.store(true, Ordering::Relaxed);
    }

    pub fn request_discord(&self) {
        self.inner.discord.store(true, Ordering::Relaxed);
    }

    /// True while any request is outstanding
    pub fn pending(&self) -> bool {
        self.inner.editor.load(Ordering::Relaxed) || self.inner.discord.load(Ordering::Relaxed)
    }

    /// Consume both flags, returning (editor, discord)
    pub fn take(&self) -> (bool, bool) {
        (
            self.inner.editor.swap(false, Ordering::Relaxed),
            self.inner.discord.swap(false, Ordering::Relaxed),
        )
    }
}

/// Sleep in `granularity` slices, returning early when cancelled or, if a
/// wake source is given, when a reconnect request arrives. Returns false if
/// the sleep was cut short by cancellation.
///
/// Process waits pass no wake source: a reconnect request cannot help while
/// the process itself is absent, and honoring it there would spin the poll.
pub fn interruptible_sleep(
    duration: Duration,
    granularity: Duration,
    cancel: &CancelFlag,
    wake: Option<&ReconnectRequests>,
) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if wake.is_some_and(ReconnectRequests::pending) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(granularity));
    }
}
