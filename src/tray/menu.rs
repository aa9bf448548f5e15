//! Tray menu management

use super::icon::TrayIcon;
use crate::core::events::{AppEvent, EventSender};
use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tray_icon::{
    menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem},
    TrayIcon as TrayIconHandle, TrayIconBuilder,
};

/// Tray menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    /// Tear down and rebuild the editor bridge
    ReconnectEditor,
    /// Tear down and rebuild the Discord connection
    ReconnectDiscord,
    /// Quit application
    Quit,
}

/// Tray manager
pub struct TrayManager {
    /// Tray icon handle
    tray: TrayIconHandle,
    /// Disabled first item mirroring the sync loop's status line
    status_item: MenuItem,
    /// Event sender
    event_tx: EventSender,
    /// Menu item IDs
    reconnect_editor_id: MenuId,
    reconnect_discord_id: MenuId,
    quit_id: MenuId,
}

impl TrayManager {
    /// Create a new tray manager
    pub fn new(event_tx: EventSender) -> Result<Self> {
        let icons = TrayIcon::new().context("Failed to load tray icons")?;

        let menu = Menu::new();

        let status_item = MenuItem::new("Starting up", false, None);

        let reconnect_editor_item = MenuItem::new("Reconnect Resolve", true, None);
        let reconnect_editor_id = reconnect_editor_item.id().clone();

        let reconnect_discord_item = MenuItem::new("Reconnect Discord", true, None);
        let reconnect_discord_id = reconnect_discord_item.id().clone();

        let quit_item = MenuItem::new("Quit", true, None);
        let quit_id = quit_item.id().clone();

        menu.append(&status_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&reconnect_editor_item)?;
        menu.append(&reconnect_discord_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&quit_item)?;

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Resolve Presence")
            .with_icon(icons.current().clone())
            .build()
            .context("Failed to create tray icon")?;

        info!("Tray icon created");

        let manager = Self {
            tray,
            status_item,
            event_tx,
            reconnect_editor_id,
            reconnect_discord_id,
            quit_id,
        };

        manager.start_menu_handler();

        Ok(manager)
    }

    /// Start menu event handler
    fn start_menu_handler(&self) {
        let event_tx = self.event_tx.clone();
        let reconnect_editor_id = self.reconnect_editor_id.clone();
        let reconnect_discord_id = self.reconnect_discord_id.clone();
        let quit_id = self.quit_id.clone();

        std::thread::spawn(move || {
            let receiver = MenuEvent::receiver();

            loop {
                if let Ok(event) = receiver.recv() {
                    debug!("Menu event: {:?}", event);

                    let action = if event.id == reconnect_editor_id {
                        Some(TrayAction::ReconnectEditor)
                    } else if event.id == reconnect_discord_id {
                        Some(TrayAction::ReconnectDiscord)
                    } else if event.id == quit_id {
                        Some(TrayAction::Quit)
                    } else {
                        None
                    };

                    if let Some(action) = action {
                        if let Err(e) = event_tx.send(AppEvent::TrayAction(action)) {
                            error!("Failed to send tray action: {}", e);
                        }
                    }
                }
            }
        });
    }

    /// Mirror the latest sync loop status into the menu and tooltip
    pub fn set_status(&mut self, status: &str) {
        self.status_item.set_text(status);

        if let Err(e) = self
            .tray
            .set_tooltip(Some(format!("Resolve Presence - {}", status)))
        {
            error!("Failed to set tray tooltip: {}", e);
        }
    }
}
