//! DaVinci Resolve scripting bridge
//!
//! Resolve exposes its scripting API only inside its bundled fuscript
//! interpreter, so the bridge spawns fuscript with a small embedded helper and
//! talks line-delimited JSON over the child's stdio. The helper's protocol is
//! private to this module; callers see the [`EditorClient`] contract.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{EditorClient, EditorError, EditorSnapshot, EditorState};
use crate::core::config::EditorConfig;

const BRIDGE_SCRIPT: &str = include_str!("bridge.py");

/// Factory for bridge connections to a local Resolve instance
pub struct ResolveBridge {
    config: EditorConfig,
}

impl ResolveBridge {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }
}

/// An established bridge: a live fuscript child plus its stdio pipes
#[derive(Debug)]
pub struct BridgeHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Keeps the helper script on disk for the child's lifetime
    _script: NamedTempFile,
}

#[derive(Deserialize)]
struct ReadyReply {
    ready: bool,
}

#[derive(Deserialize)]
struct StateReply {
    project: Option<String>,
    timeline: Option<String>,
}

impl EditorClient for ResolveBridge {
    type Handle = BridgeHandle;

    fn connect(&mut self) -> Result<BridgeHandle, EditorError> {
        let mut script = NamedTempFile::new()
            .map_err(|e| EditorError::Unavailable(format!("bridge script file: {}", e)))?;
        script
            .write_all(BRIDGE_SCRIPT.as_bytes())
            .and_then(|()| script.flush())
            .map_err(|e| EditorError::Unavailable(format!("bridge script file: {}", e)))?;

        let mut child = Command::new(&self.config.fuscript_path)
            .arg("-l")
            .arg("py3")
            .arg(script.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                EditorError::Unavailable(format!(
                    "failed to spawn {}: {}",
                    self.config.fuscript_path, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EditorError::Unavailable("bridge stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EditorError::Unavailable("bridge stdout not captured".to_string()))?;
        let mut stdout = BufReader::new(stdout);

        let mut line = String::new();
        let handshake = stdout
            .read_line(&mut line)
            .map_err(|e| EditorError::Unavailable(format!("bridge handshake read: {}", e)))?;

        let ready = handshake > 0
            && serde_json::from_str::<ReadyReply>(line.trim())
                .map(|reply| reply.ready)
                .unwrap_or(false);

        if !ready {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EditorError::Unavailable(
                "scripting bridge refused the handshake".to_string(),
            ));
        }

        info!("Connected to the Resolve scripting bridge");
        Ok(BridgeHandle {
            child,
            stdin,
            stdout,
            _script: script,
        })
    }

    fn state(&mut self, handle: &mut BridgeHandle) -> Result<EditorState, EditorError> {
        writeln!(handle.stdin, "state")
            .map_err(|e| EditorError::Stale(format!("bridge write: {}", e)))?;

        let mut line = String::new();
        let read = handle
            .stdout
            .read_line(&mut line)
            .map_err(|e| EditorError::Stale(format!("bridge read: {}", e)))?;
        if read == 0 {
            return Err(EditorError::Stale("bridge closed its end".to_string()));
        }

        debug!("Bridge state reply: {}", line.trim());
        parse_state_reply(&line)
    }
}

/// Decode one state reply line. `{"project": null}` is the only NoProject
/// signal; anything unparseable means the bridge itself has gone bad.
fn parse_state_reply(line: &str) -> Result<EditorState, EditorError> {
    let reply: StateReply = serde_json::from_str(line.trim())
        .map_err(|e| EditorError::Stale(format!("bad bridge reply: {}", e)))?;

    match reply.project {
        None => Ok(EditorState::NoProject),
        Some(project_name) => Ok(EditorState::Active(EditorSnapshot {
            project_name,
            timeline_name: reply.timeline,
        })),
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
