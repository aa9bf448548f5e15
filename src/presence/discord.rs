//! Discord Rich Presence IPC client

use discord_rich_presence::activity::{Activity, Assets, Timestamps};
use discord_rich_presence::{DiscordIpc, DiscordIpcClient};
use tracing::{debug, info};

use super::payload::PresencePayload;
use crate::core::config::DiscordConfig;

/// Presence IPC failures
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// The IPC handshake could not be established; wait and retry
    #[error("presence IPC unavailable: {0}")]
    Unavailable(String),
    /// An update was rejected over an established connection
    #[error("presence update rejected: {0}")]
    Push(String),
}

/// Connection to the chat client's rich-presence IPC
pub trait PresenceClient: Send {
    /// Attempt the handshake once; retry policy belongs to the caller
    fn connect(&mut self) -> Result<(), PresenceError>;

    /// Push a payload; only valid after a successful connect
    fn update(&mut self, payload: &PresencePayload) -> Result<(), PresenceError>;

    /// Best-effort wipe of the remote display; failures are swallowed
    fn clear(&mut self);

    /// Tear the connection down
    fn close(&mut self);
}

/// Production client over Discord's local IPC socket
pub struct DiscordPresence {
    config: DiscordConfig,
    client: Option<DiscordIpcClient>,
}

impl DiscordPresence {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }
}

impl PresenceClient for DiscordPresence {
    fn connect(&mut self) -> Result<(), PresenceError> {
        // Drop any previous socket before handshaking again
        self.close();

        let mut client = DiscordIpcClient::new(&self.config.client_id)
            .map_err(|e| PresenceError::Unavailable(e.to_string()))?;
        client
            .connect()
            .map_err(|e| PresenceError::Unavailable(e.to_string()))?;

        info!("Connected to Discord IPC");
        self.client = Some(client);
        Ok(())
    }

    fn update(&mut self, payload: &PresencePayload) -> Result<(), PresenceError> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| PresenceError::Push("not connected".to_string()))?;

        let activity = Activity::new()
            .state(&payload.state)
            .details(&payload.details)
            .timestamps(Timestamps::new().start(payload.start_timestamp))
            .assets(
                Assets::new()
                    .large_image(&payload.large_image_key)
                    .large_text(&payload.large_image_text),
            );

        if let Err(e) = client.set_activity(activity) {
            // The socket is suspect after a failed push
            self.client = None;
            return Err(PresenceError::Push(e.to_string()));
        }
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(client) = self.client.as_mut() {
            if let Err(e) = client.clear_activity() {
                debug!("Failed to clear presence: {}", e);
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            let _ = client.close();
            debug!("Discord IPC closed");
        }
    }
}
