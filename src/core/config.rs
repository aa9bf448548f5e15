//! Configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Editor (DaVinci Resolve) bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Process-name substring used to detect a running editor
    #[serde(default = "default_editor_process")]
    pub process_name: String,
    /// Path to Resolve's bundled fuscript interpreter
    #[serde(default = "default_fuscript_path")]
    pub fuscript_path: String,
}

fn default_editor_process() -> String {
    "resolve".to_string()
}

#[cfg(target_os = "macos")]
fn default_fuscript_path() -> String {
    "/Applications/DaVinci Resolve/DaVinci Resolve.app/Contents/Libraries/Fusion/fuscript"
        .to_string()
}

#[cfg(target_os = "windows")]
fn default_fuscript_path() -> String {
    "C:\\Program Files\\Blackmagic Design\\DaVinci Resolve\\fuscript.exe".to_string()
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_fuscript_path() -> String {
    "/opt/resolve/libs/Fusion/fuscript".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            process_name: default_editor_process(),
            fuscript_path: default_fuscript_path(),
        }
    }
}

/// Discord Rich Presence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Process-name substring used to detect a running Discord client
    #[serde(default = "default_discord_process")]
    pub process_name: String,
    /// Discord application client ID
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Asset key for the large presence image
    #[serde(default = "default_large_image_key")]
    pub large_image_key: String,
    /// Hover text for the large presence image
    #[serde(default = "default_large_image_text")]
    pub large_image_text: String,
}

fn default_discord_process() -> String {
    "discord".to_string()
}

fn default_client_id() -> String {
    "1004088618857549844".to_string()
}

fn default_large_image_key() -> String {
    "davinci".to_string()
}

fn default_large_image_text() -> String {
    "DaVinci Resolve Studio".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            process_name: default_discord_process(),
            client_id: default_client_id(),
            large_image_key: default_large_image_key(),
            large_image_text: default_large_image_text(),
        }
    }
}

/// Sync loop timing configuration, all intervals in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Poll interval while waiting for an absent process
    #[serde(default = "default_process_poll")]
    pub process_poll_secs: u64,
    /// Cooldown after a failed connection attempt
    #[serde(default = "default_connect_cooldown")]
    pub connect_cooldown_secs: u64,
    /// Cooldown while the editor has no open project
    #[serde(default = "default_no_project_cooldown")]
    pub no_project_cooldown_secs: u64,
    /// Idle sleep between presence updates
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Cooldown after an unexpected tick failure
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_secs: u64,
}

fn default_process_poll() -> u64 {
    5
}
fn default_connect_cooldown() -> u64 {
    10
}
fn default_no_project_cooldown() -> u64 {
    30
}
fn default_update_interval() -> u64 {
    15
}
fn default_error_cooldown() -> u64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            process_poll_secs: default_process_poll(),
            connect_cooldown_secs: default_connect_cooldown(),
            no_project_cooldown_secs: default_no_project_cooldown(),
            update_interval_secs: default_update_interval(),
            error_cooldown_secs: default_error_cooldown(),
        }
    }
}

/// Timing values resolved into durations for the sync loop
#[derive(Debug, Clone)]
pub struct SyncTiming {
    pub process_poll: Duration,
    pub connect_cooldown: Duration,
    pub no_project_cooldown: Duration,
    pub update_interval: Duration,
    pub error_cooldown: Duration,
    /// Granularity at which blocking sleeps observe cancellation
    pub cancel_poll: Duration,
}

impl SyncTiming {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            process_poll: Duration::from_secs(config.process_poll_secs),
            connect_cooldown: Duration::from_secs(config.connect_cooldown_secs),
            no_project_cooldown: Duration::from_secs(config.no_project_cooldown_secs),
            update_interval: Duration::from_secs(config.update_interval_secs),
            error_cooldown: Duration::from_secs(config.error_cooldown_secs),
            cancel_poll: Duration::from_secs(1),
        }
    }
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Tray deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrayConfig {
    /// Run with a system tray status item; headless (log-only) when false
    #[serde(default = "default_tray_enabled")]
    pub enabled: bool,
}

fn default_tray_enabled() -> bool {
    true
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            enabled: default_tray_enabled(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Editor bridge configuration
    #[serde(default)]
    pub editor: EditorConfig,
    /// Discord presence configuration
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Sync loop timing
    #[serde(default)]
    pub sync: SyncConfig,
    /// Tray deployment
    #[serde(default)]
    pub tray: TrayConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directories if needed
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "resolvepresence", "ResolvePresence")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
