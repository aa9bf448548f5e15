//! The presence sync loop
//!
//! One background thread owns both connection lifecycles and walks a fixed
//! sequence of checks every tick: Discord liveness, Discord connectivity,
//! editor liveness, editor connectivity, snapshot fetch, payload push, idle
//! sleep. Each check can short-circuit the tick. The remote display is
//! cleared whenever either dependency drops out, so Discord never shows
//! information older than the last confirmed-good snapshot.

use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use super::discord::PresenceClient;
use super::payload::{unix_now, PresencePayload};
use super::status::StatusSink;
use crate::core::config::{DiscordConfig, EditorConfig, SyncTiming};
use crate::core::control::{interruptible_sleep, CancelFlag, ReconnectRequests};
use crate::editor::{EditorClient, EditorState};
use crate::probe::ProcessProbe;

/// Connection lifecycle of one external dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    /// Process not present in the process table
    NotRunning,
    /// Process present, handshake not yet confirmed
    Connecting,
    /// Handshake confirmed; safe to use
    Connected,
    /// Previously good connection now errors; handle discarded
    Stale,
}

/// What a tick decided to do next
enum Tick {
    /// Sleep this long (zero restarts immediately), then run the next tick
    Pause(Duration),
    /// A blocking wait observed cancellation
    Cancelled,
}

/// The loop-owning worker. All connection handles and lifecycle state are
/// fields here and are never touched from another thread.
pub struct PresenceSyncLoop<E, P, B, S>
where
    E: EditorClient,
    P: PresenceClient,
    B: ProcessProbe,
    S: StatusSink,
{
    editor: E,
    presence: P,
    probe: B,
    status: S,
    editor_config: EditorConfig,
    discord_config: DiscordConfig,
    timing: SyncTiming,
    cancel: CancelFlag,
    requests: ReconnectRequests,

    editor_state: DependencyState,
    discord_state: DependencyState,
    editor_handle: Option<E::Handle>,
    /// Unix seconds of the last successful editor connection
    session_start: i64,
}

impl<E, P, B, S> PresenceSyncLoop<E, P, B, S>
where
    E: EditorClient,
    P: PresenceClient,
    B: ProcessProbe,
    S: StatusSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        editor: E,
        presence: P,
        probe: B,
        status: S,
        editor_config: EditorConfig,
        discord_config: DiscordConfig,
        timing: SyncTiming,
        cancel: CancelFlag,
        requests: ReconnectRequests,
    ) -> Self {
        Self {
            editor,
            presence,
            probe,
            status,
            editor_config,
            discord_config,
            timing,
            cancel,
            requests,
            editor_state: DependencyState::NotRunning,
            discord_state: DependencyState::NotRunning,
            editor_handle: None,
            session_start: unix_now(),
        }
    }

    /// Run until cancelled, then clear and close the presence connection
    pub fn run(mut self) {
        info!("Presence sync loop started");
        self.status.publish("Starting up");

        while !self.cancel.is_cancelled() {
            match self.tick() {
                Ok(Tick::Pause(pause)) => {
                    if !pause.is_zero() {
                        self.pause(pause);
                    }
                }
                Ok(Tick::Cancelled) => break,
                Err(e) => {
                    // One bad tick must never take the process down
                    error!("Sync tick failed: {:#}", e);
                    self.presence.clear();
                    self.status.publish("Recovering from an internal error");
                    self.pause(self.timing.error_cooldown);
                }
            }
        }

        self.presence.clear();
        self.presence.close();
        self.editor_handle = None;
        self.status.publish("Stopped");
        info!("Presence sync loop stopped");
    }

    /// One pass through the ordered checks
    fn tick(&mut self) -> Result<Tick> {
        let (editor_requested, discord_requested) = self.requests.take();
        if editor_requested {
            debug!("Manual editor reconnect requested");
        }
        if discord_requested {
            debug!("Manual Discord reconnect requested");
        }

        let discord_process = self.discord_config.process_name.clone();
        let editor_process = self.editor_config.process_name.clone();

        // 1. Discord liveness
        if !self.probe.is_running(&discord_process) {
            if self.discord_state == DependencyState::Connected {
                self.presence.clear();
            }
            self.discord_state = DependencyState::NotRunning;
            info!("Discord is not running, waiting for it to start");
            self.status.publish("Waiting for Discord");

            if let ControlFlow::Break(()) = self.wait_for_process(&discord_process) {
                return Ok(Tick::Cancelled);
            }
            self.discord_state = DependencyState::Connecting;
            match self.presence.connect() {
                Ok(()) => self.discord_state = DependencyState::Connected,
                Err(e) => warn!("Discord connect after restart failed: {}", e),
            }
            return Ok(Tick::Pause(Duration::ZERO));
        }

        // 2. Discord connectivity
        if self.discord_state != DependencyState::Connected {
            self.discord_state = DependencyState::Connecting;
            if let Err(e) = self.presence.connect() {
                warn!("Discord connect failed: {}", e);
                self.status.publish("Discord connection failed, retrying");
                return Ok(Tick::Pause(self.timing.connect_cooldown));
            }
            self.discord_state = DependencyState::Connected;
        }

        // 3. Editor liveness
        if !self.probe.is_running(&editor_process) {
            if self.editor_state == DependencyState::Connected {
                self.presence.clear();
            }
            self.editor_state = DependencyState::NotRunning;
            // A handle tied to a terminated process must never be reused
            self.editor_handle = None;
            info!("Editor is not running, waiting for it to start");
            self.status.publish("Waiting for DaVinci Resolve");

            if let ControlFlow::Break(()) = self.wait_for_process(&editor_process) {
                return Ok(Tick::Cancelled);
            }
            self.editor_state = DependencyState::Connecting;
            self.connect_editor();
            return Ok(Tick::Pause(Duration::ZERO));
        }

        // 4. Editor connectivity
        if self.editor_state != DependencyState::Connected || self.editor_handle.is_none() {
            self.editor_state = DependencyState::Connecting;
            if !self.connect_editor() {
                self.status.publish("Editor bridge connection failed, retrying");
                return Ok(Tick::Pause(self.timing.connect_cooldown));
            }
        }

        // 5. Snapshot fetch
        let Some(handle) = self.editor_handle.as_mut() else {
            return Ok(Tick::Pause(Duration::ZERO));
        };
        match self.editor.state(handle) {
            Err(e) => {
                // Any fetch failure means the handle can no longer be trusted
                warn!("Snapshot fetch failed: {}", e);
                self.presence.clear();
                self.editor_handle = None;
                self.editor_state = DependencyState::Stale;
                self.status.publish("Lost the editor bridge, reconnecting");
                Ok(Tick::Pause(Duration::ZERO))
            }
            Ok(EditorState::NoProject) => {
                self.presence.clear();
                self.status.publish("No active project");
                Ok(Tick::Pause(self.timing.no_project_cooldown))
            }
            Ok(EditorState::Active(snapshot)) => {
                // 6. Payload derivation and push
                let payload =
                    PresencePayload::derive(&snapshot, self.session_start, &self.discord_config);
                match self.presence.update(&payload) {
                    Ok(()) => {
                        debug!("Updated presence: {} / {}", payload.details, payload.state);
                        self.status
                            .publish(&format!("{} | {}", payload.details, payload.state));
                    }
                    Err(e) => {
                        warn!("Presence update failed: {}", e);
                        // Repair Discord on the next tick; the editor is fine
                        self.discord_state = DependencyState::Stale;
                        self.status.publish("Discord update failed, reconnecting");
                    }
                }
                // 7. Idle sleep, also after a failed push so we never busy-loop
                Ok(Tick::Pause(self.timing.update_interval))
            }
        }
    }

    /// One editor connect attempt; a success starts a fresh session timer
    fn connect_editor(&mut self) -> bool {
        match self.editor.connect() {
            Ok(handle) => {
                self.editor_handle = Some(handle);
                self.editor_state = DependencyState::Connected;
                self.session_start = unix_now();
                true
            }
            Err(e) => {
                warn!("Editor connect failed: {}", e);
                false
            }
        }
    }

    /// Poll until the named process appears; Break means cancelled
    fn wait_for_process(&mut self, name: &str) -> ControlFlow<()> {
        while !self.probe.is_running(name) {
            if !interruptible_sleep(
                self.timing.process_poll,
                self.timing.cancel_poll,
                &self.cancel,
                None,
            ) {
                return ControlFlow::Break(());
            }
        }
        if self.cancel.is_cancelled() {
            return ControlFlow::Break(());
        }
        info!("{} has started", name);
        ControlFlow::Continue(())
    }

    /// Cancellation-aware sleep woken early by reconnect requests
    fn pause(&self, duration: Duration) {
        interruptible_sleep(
            duration,
            self.timing.cancel_poll,
            &self.cancel,
            Some(&self.requests),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorError, EditorSnapshot};
    use crate::presence::discord::PresenceError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    /// Shared log of collaborator calls, in order
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().push(entry.into());
        }

        fn calls(&self) -> Vec<String> {
            self.0.lock().clone()
        }

        fn count(&self, entry: &str) -> usize {
            self.0.lock().iter().filter(|c| c.as_str() == entry).count()
        }
    }

    struct FakeProbe {
        editor: Arc<AtomicBool>,
        discord: Arc<AtomicBool>,
    }

    impl ProcessProbe for FakeProbe {
        fn is_running(&mut self, name_substring: &str) -> bool {
            if name_substring == "resolve" {
                self.editor.load(Ordering::Relaxed)
            } else {
                self.discord.load(Ordering::Relaxed)
            }
        }
    }

    /// Editor whose connect hands out numbered handles and whose state
    /// replies are scripted; defaults to an active Demo/Timeline 1 snapshot
    struct FakeEditor {
        recorder: Recorder,
        connect_ok: Arc<AtomicBool>,
        next_handle: u32,
        states: Arc<Mutex<VecDeque<Result<EditorState, EditorError>>>>,
    }

    impl FakeEditor {
        fn new(recorder: Recorder) -> Self {
            Self {
                recorder,
                connect_ok: Arc::new(AtomicBool::new(true)),
                next_handle: 0,
                states: Arc::new(Mutex::new(VecDeque::new())),
            }
        }
    }

    impl EditorClient for FakeEditor {
        type Handle = u32;

        fn connect(&mut self) -> Result<u32, EditorError> {
            self.recorder.push("editor.connect");
            if !self.connect_ok.load(Ordering::Relaxed) {
                return Err(EditorError::Unavailable("scripted".to_string()));
            }
            self.next_handle += 1;
            Ok(self.next_handle)
        }

        fn state(&mut self, handle: &mut u32) -> Result<EditorState, EditorError> {
            self.recorder.push(format!("editor.state({})", handle));
            self.states.lock().pop_front().unwrap_or_else(|| {
                Ok(EditorState::Active(EditorSnapshot {
                    project_name: "Demo".to_string(),
                    timeline_name: Some("Timeline 1".to_string()),
                }))
            })
        }
    }

    struct FakePresence {
        recorder: Recorder,
        connect_ok: Arc<AtomicBool>,
        update_ok: Arc<AtomicBool>,
        updates: Arc<Mutex<Vec<PresencePayload>>>,
    }

    impl FakePresence {
        fn new(recorder: Recorder) -> Self {
            Self {
                recorder,
                connect_ok: Arc::new(AtomicBool::new(true)),
                update_ok: Arc::new(AtomicBool::new(true)),
                updates: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl PresenceClient for FakePresence {
        fn connect(&mut self) -> Result<(), PresenceError> {
            self.recorder.push("presence.connect");
            if self.connect_ok.load(Ordering::Relaxed) {
                Ok(())
            } else {
                Err(PresenceError::Unavailable("scripted".to_string()))
            }
        }

        fn update(&mut self, payload: &PresencePayload) -> Result<(), PresenceError> {
            self.recorder.push("presence.update");
            if self.update_ok.load(Ordering::Relaxed) {
                self.updates.lock().push(payload.clone());
                Ok(())
            } else {
                Err(PresenceError::Push("scripted".to_string()))
            }
        }

        fn clear(&mut self) {
            self.recorder.push("presence.clear");
        }

        fn close(&mut self) {
            self.recorder.push("presence.close");
        }
    }

    struct RecordingSink(Recorder);

    impl StatusSink for RecordingSink {
        fn publish(&self, message: &str) {
            self.0.push(format!("status:{}", message));
        }
    }

    fn test_timing() -> SyncTiming {
        SyncTiming {
            process_poll: Duration::from_millis(10),
            connect_cooldown: Duration::from_millis(10),
            no_project_cooldown: Duration::from_millis(10),
            update_interval: Duration::from_millis(10),
            error_cooldown: Duration::from_millis(10),
            cancel_poll: Duration::from_millis(5),
        }
    }

    struct Harness {
        recorder: Recorder,
        editor_running: Arc<AtomicBool>,
        discord_running: Arc<AtomicBool>,
        editor_connect_ok: Arc<AtomicBool>,
        presence_connect_ok: Arc<AtomicBool>,
        presence_update_ok: Arc<AtomicBool>,
        editor_states: Arc<Mutex<VecDeque<Result<EditorState, EditorError>>>>,
        updates: Arc<Mutex<Vec<PresencePayload>>>,
        cancel: CancelFlag,
        requests: ReconnectRequests,
        sync: PresenceSyncLoop<FakeEditor, FakePresence, FakeProbe, RecordingSink>,
    }

    fn harness() -> Harness {
        let recorder = Recorder::default();
        let editor = FakeEditor::new(recorder.clone());
        let presence = FakePresence::new(recorder.clone());
        let editor_running = Arc::new(AtomicBool::new(true));
        let discord_running = Arc::new(AtomicBool::new(true));
        let probe = FakeProbe {
            editor: Arc::clone(&editor_running),
            discord: Arc::clone(&discord_running),
        };
        let cancel = CancelFlag::new();
        let requests = ReconnectRequests::new();

        let editor_connect_ok = Arc::clone(&editor.connect_ok);
        let presence_connect_ok = Arc::clone(&presence.connect_ok);
        let presence_update_ok = Arc::clone(&presence.update_ok);
        let editor_states = Arc::clone(&editor.states);
        let updates = Arc::clone(&presence.updates);

        let sync = PresenceSyncLoop::new(
            editor,
            presence,
            probe,
            RecordingSink(recorder.clone()),
            EditorConfig {
                process_name: "resolve".to_string(),
                ..EditorConfig::default()
            },
            DiscordConfig::default(),
            test_timing(),
            cancel.clone(),
            requests.clone(),
        );

        Harness {
            recorder,
            editor_running,
            discord_running,
            editor_connect_ok,
            presence_connect_ok,
            presence_update_ok,
            editor_states,
            updates,
            cancel,
            requests,
            sync,
        }
    }

    fn pause_of(tick: Tick) -> Duration {
        match tick {
            Tick::Pause(d) => d,
            Tick::Cancelled => panic!("tick unexpectedly cancelled"),
        }
    }

    #[test]
    fn test_happy_tick_connects_both_and_pushes_payload() {
        let mut h = harness();
        let pause = pause_of(h.sync.tick().unwrap());

        assert_eq!(pause, Duration::from_millis(10));
        assert_eq!(h.sync.discord_state, DependencyState::Connected);
        assert_eq!(h.sync.editor_state, DependencyState::Connected);

        let updates = h.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, "Editing: Timeline 1");
        assert_eq!(updates[0].details, "Project: Demo");
    }

    #[test]
    fn test_no_update_while_discord_not_connected() {
        let mut h = harness();
        h.presence_connect_ok.store(false, Ordering::Relaxed);

        let pause = pause_of(h.sync.tick().unwrap());

        assert_eq!(pause, Duration::from_millis(10));
        assert_ne!(h.sync.discord_state, DependencyState::Connected);
        assert!(h.updates.lock().is_empty());
        // Short-circuits before any editor work
        assert_eq!(h.recorder.count("editor.connect"), 0);
    }

    #[test]
    fn test_discord_absence_clears_previously_connected_display() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());
        assert_eq!(h.recorder.count("presence.clear"), 0);

        h.discord_running.store(false, Ordering::Relaxed);
        h.cancel.cancel();
        let tick = h.sync.tick().unwrap();

        assert!(matches!(tick, Tick::Cancelled));
        assert_eq!(h.recorder.count("presence.clear"), 1);
        assert_eq!(h.sync.discord_state, DependencyState::NotRunning);
    }

    #[test]
    fn test_discord_absence_without_prior_connection_does_not_clear() {
        let mut h = harness();
        h.discord_running.store(false, Ordering::Relaxed);
        h.cancel.cancel();
        let tick = h.sync.tick().unwrap();

        assert!(matches!(tick, Tick::Cancelled));
        assert_eq!(h.recorder.count("presence.clear"), 0);
    }

    #[test]
    fn test_editor_absence_discards_handle() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());
        assert!(h.sync.editor_handle.is_some());

        h.editor_running.store(false, Ordering::Relaxed);
        h.cancel.cancel();
        let tick = h.sync.tick().unwrap();

        assert!(matches!(tick, Tick::Cancelled));
        assert!(h.sync.editor_handle.is_none());
        assert_eq!(h.sync.editor_state, DependencyState::NotRunning);
        assert_eq!(h.recorder.count("presence.clear"), 1);
    }

    #[test]
    fn test_stale_snapshot_discards_handle_and_restarts_immediately() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());

        h.editor_states
            .lock()
            .push_back(Err(EditorError::Stale("gone".to_string())));
        let pause = pause_of(h.sync.tick().unwrap());

        assert_eq!(pause, Duration::ZERO);
        assert!(h.sync.editor_handle.is_none());
        assert_eq!(h.sync.editor_state, DependencyState::Stale);
        assert_eq!(h.recorder.count("presence.clear"), 1);
        assert_eq!(h.updates.lock().len(), 1);
    }

    #[test]
    fn test_stale_handle_never_reused_after_reconnect() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());
        h.editor_states
            .lock()
            .push_back(Err(EditorError::Stale("gone".to_string())));
        pause_of(h.sync.tick().unwrap());

        // Recovery tick reconnects the editor only and uses a fresh handle
        pause_of(h.sync.tick().unwrap());

        let calls = h.recorder.calls();
        let stale_at = calls
            .iter()
            .position(|c| c == "presence.clear")
            .expect("clear after stale");
        assert!(!calls[stale_at..].contains(&"editor.state(1)".to_string()));
        assert!(calls[stale_at..].contains(&"editor.state(2)".to_string()));
        assert_eq!(h.recorder.count("presence.connect"), 1);
        assert_eq!(h.recorder.count("editor.connect"), 2);
    }

    #[test]
    fn test_no_project_clears_and_backs_off() {
        let mut h = harness();
        h.editor_states.lock().push_back(Ok(EditorState::NoProject));
        let pause = pause_of(h.sync.tick().unwrap());

        assert_eq!(pause, h.sync.timing.no_project_cooldown);
        assert_eq!(h.recorder.count("presence.clear"), 1);
        assert!(h.updates.lock().is_empty());
        assert!(h
            .recorder
            .calls()
            .contains(&"status:No active project".to_string()));

        // Project comes back: updates resume
        pause_of(h.sync.tick().unwrap());
        assert_eq!(h.updates.lock().len(), 1);
    }

    #[test]
    fn test_push_failure_repairs_discord_not_editor() {
        let mut h = harness();
        h.presence_update_ok.store(false, Ordering::Relaxed);
        let pause = pause_of(h.sync.tick().unwrap());

        // Falls through to the idle pause rather than busy-looping
        assert_eq!(pause, h.sync.timing.update_interval);
        assert_eq!(h.sync.discord_state, DependencyState::Stale);
        assert_eq!(h.sync.editor_state, DependencyState::Connected);

        h.presence_update_ok.store(true, Ordering::Relaxed);
        pause_of(h.sync.tick().unwrap());

        assert_eq!(h.recorder.count("presence.connect"), 2);
        assert_eq!(h.recorder.count("editor.connect"), 1);
        assert_eq!(h.updates.lock().len(), 1);
    }

    #[test]
    fn test_session_start_unchanged_by_snapshot_fetches() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());
        h.sync.session_start = 12345;

        pause_of(h.sync.tick().unwrap());
        pause_of(h.sync.tick().unwrap());

        assert_eq!(h.sync.session_start, 12345);
        let updates = h.updates.lock();
        assert_eq!(updates.last().unwrap().start_timestamp, 12345);
    }

    #[test]
    fn test_session_start_reset_on_editor_reconnect() {
        let mut h = harness();
        pause_of(h.sync.tick().unwrap());
        h.sync.session_start = 12345;

        h.editor_states
            .lock()
            .push_back(Err(EditorError::Stale("gone".to_string())));
        pause_of(h.sync.tick().unwrap());
        pause_of(h.sync.tick().unwrap());

        assert_ne!(h.sync.session_start, 12345);
    }

    #[test]
    fn test_failed_editor_connect_backs_off() {
        let mut h = harness();
        h.editor_connect_ok.store(false, Ordering::Relaxed);
        let pause = pause_of(h.sync.tick().unwrap());

        assert_eq!(pause, h.sync.timing.connect_cooldown);
        assert_eq!(h.sync.editor_state, DependencyState::Connecting);
        assert!(h.updates.lock().is_empty());
    }

    #[test]
    fn test_run_shuts_down_within_poll_interval_and_closes() {
        let mut h = harness();
        // Both dependencies absent: run() parks in a process wait
        h.editor_running.store(false, Ordering::Relaxed);
        h.discord_running.store(false, Ordering::Relaxed);

        let cancel = h.cancel.clone();
        let recorder = h.recorder.clone();
        let worker = std::thread::spawn(move || h.sync.run());

        std::thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        cancel.cancel();
        worker.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        let calls = recorder.calls();
        let clear_at = calls.iter().rposition(|c| c == "presence.clear").unwrap();
        let close_at = calls.iter().rposition(|c| c == "presence.close").unwrap();
        assert!(clear_at < close_at);
    }

    #[test]
    fn test_reconnect_request_wakes_idle_pause() {
        let h = harness();
        let requests = h.requests.clone();
        let waker = requests.clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            waker.request_editor();
        });

        let started = Instant::now();
        // pause() is the loop's idle sleep; a request must cut it short
        let long_pause = Duration::from_secs(60);
        interruptible_sleep(
            long_pause,
            Duration::from_millis(5),
            &h.cancel,
            Some(&requests),
        );
        setter.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(requests.take(), (true, false));
    }
}
