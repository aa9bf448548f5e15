// Hide console window on Windows release builds
#![cfg_attr(
    all(target_os = "windows", not(debug_assertions)),
    windows_subsystem = "windows"
)]

//! Resolve Presence - Entry Point
//!
//! Loads configuration, starts the sync worker thread, and runs either the
//! system tray event loop or a headless signal wait around it.

use anyhow::Result;
use resolve_presence::{
    core::{
        config::{Config, SyncTiming},
        control::{CancelFlag, ReconnectRequests},
        events::{AppEvent, EventSender},
    },
    editor::ResolveBridge,
    presence::{DiscordPresence, EventSink, LogSink, PresenceSyncLoop, StatusSink},
    probe::SystemProbe,
    tray::{TrayAction, TrayManager},
};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

/// Spawn the sync worker on its own thread; the thread exits once `cancel`
/// fires and the loop finishes its shutdown sequence
fn spawn_worker<S: StatusSink + 'static>(
    config: &Config,
    status: S,
    cancel: CancelFlag,
    requests: ReconnectRequests,
) -> std::thread::JoinHandle<()> {
    let sync = PresenceSyncLoop::new(
        ResolveBridge::new(config.editor.clone()),
        DiscordPresence::new(config.discord.clone()),
        SystemProbe::new(),
        status,
        config.editor.clone(),
        config.discord.clone(),
        SyncTiming::from_config(&config.sync),
        cancel,
        requests,
    );

    std::thread::spawn(move || sync.run())
}

/// Headless deployment: run the worker and wait for Ctrl-C
fn run_headless(config: Config) -> Result<()> {
    let cancel = CancelFlag::new();
    let requests = ReconnectRequests::new();
    let worker = spawn_worker(&config, LogSink, cancel.clone(), requests);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    });

    info!("Shutdown signal received");
    cancel.cancel();
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("Sync worker panicked"))?;

    Ok(())
}

/// Main application handler for the tray deployment's winit event loop
struct App {
    config: Config,
    /// Event sender for inter-module communication (wakes event loop)
    event_tx: EventSender,
    /// Event receiver for inter-module communication
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Tray manager for system tray
    tray_manager: Option<TrayManager>,
    cancel: CancelFlag,
    requests: ReconnectRequests,
    /// Sync worker thread, joined on exit
    worker: Option<std::thread::JoinHandle<()>>,
}

impl App {
    fn new(
        config: Config,
        event_tx: EventSender,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> Self {
        Self {
            config,
            event_tx,
            event_rx,
            tray_manager: None,
            cancel: CancelFlag::new(),
            requests: ReconnectRequests::new(),
            worker: None,
        }
    }

    fn handle_event(&mut self, event: AppEvent, event_loop: &ActiveEventLoop) {
        match event {
            AppEvent::Status(status) => {
                if let Some(ref mut tray) = self.tray_manager {
                    tray.set_status(&status);
                }
            }
            AppEvent::TrayAction(action) => {
                info!("Tray action: {:?}", action);
                match action {
                    TrayAction::ReconnectEditor => self.requests.request_editor(),
                    TrayAction::ReconnectDiscord => self.requests.request_discord(),
                    TrayAction::Quit => event_loop.exit(),
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if self.tray_manager.is_none() {
            match TrayManager::new(self.event_tx.clone()) {
                Ok(tray) => {
                    self.tray_manager = Some(tray);
                    info!("Tray manager initialized");
                }
                Err(e) => {
                    error!("Failed to initialize tray manager: {}", e);
                }
            }
        }

        if self.worker.is_none() {
            self.worker = Some(spawn_worker(
                &self.config,
                EventSink::new(self.event_tx.clone()),
                self.cancel.clone(),
                self.requests.clone(),
            ));
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
        // No windows; everything lives in the tray
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event, event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        info!("Application exiting");
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Sync worker panicked during shutdown");
            }
        }
    }
}

/// Set up macOS application: accessory activation policy (no dock icon) and
/// a readable process name
#[cfg(target_os = "macos")]
fn setup_macos_app() {
    use cocoa::base::nil;
    use cocoa::foundation::NSString;
    use objc::runtime::Object;
    use objc::{msg_send, sel, sel_impl};

    unsafe {
        let app: *mut Object = msg_send![objc::class!(NSApplication), sharedApplication];

        // NSApplicationActivationPolicyAccessory = 1
        let _: () = msg_send![app, setActivationPolicy: 1_isize];

        let process_info: *mut Object = msg_send![objc::class!(NSProcessInfo), processInfo];
        let app_name = NSString::alloc(nil).init_str("Resolve Presence");
        let _: () = msg_send![process_info, setProcessName: app_name];
    }
}

#[cfg(not(target_os = "macos"))]
fn setup_macos_app() {
    // No-op on other platforms
}

/// Tray deployment: winit event loop with the sync worker behind it
fn run_tray(config: Config) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let event_loop = EventLoop::new()?;
    let proxy = event_loop.create_proxy();
    let event_sender = EventSender::new(event_tx, proxy);

    setup_macos_app();

    let mut app = App::new(config, event_sender, event_rx);
    event_loop.run_app(&mut app)?;

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resolve Presence");

    let config = Config::load()?;
    info!("Configuration loaded");

    if config.tray.enabled {
        run_tray(config)
    } else {
        run_headless(config)
    }
}
