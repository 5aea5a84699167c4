// MIT License - Copyright (c) 2026 Peter Wright
// Per-panel bridge: pollers, commands and events

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::client::{PanelApi, PanelClient};
use crate::config::PanelConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{Result, TuxedoError};
use crate::event::{event_channel, BridgeEvent, EventReceiver, EventSender};
use crate::reconciler::Reconciler;
use crate::scheduler::{FaultIndicator, PollingScheduler, Polled};
use crate::status::{NormalizedState, TargetState};

/// Point-in-time view of the panel, reconciled from a single status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSnapshot {
    pub current: NormalizedState,
    pub target: TargetState,
    pub fault: bool,
    pub entry_delay: bool,
}

/// The main public API for one Tuxedo panel.
///
/// # Example
///
/// ```no_run
/// use tuxedo_bridge::{PanelConfig, TargetState, TuxedoBridge};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = PanelConfig::builder()
///         .host("192.168.1.50")
///         .alarm_code("1234")
///         .polling(true)
///         .build();
///
///     let mut bridge = TuxedoBridge::start(config).await?;
///
///     let mut events = bridge.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     bridge.set_target_state(TargetState::AwayArmed).await;
///
///     tokio::signal::ctrl_c().await?;
///     bridge.shutdown();
///     Ok(())
/// }
/// ```
pub struct TuxedoBridge<P = PanelClient> {
    config: PanelConfig,
    panel: Arc<P>,
    reconciler: Arc<Reconciler>,
    dispatcher: CommandDispatcher<P>,
    fault: Arc<FaultIndicator>,
    event_tx: EventSender,
    poller_handles: Vec<JoinHandle<()>>,
    keepalive_handle: Option<JoinHandle<()>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl TuxedoBridge<PanelClient> {
    /// Build the HTTP client for `config` and start the bridge.
    pub async fn start(config: PanelConfig) -> Result<Self> {
        let client = PanelClient::new(&config)?;
        Self::with_panel(client, config).await
    }
}

impl<P: PanelApi> TuxedoBridge<P> {
    /// Start the bridge on top of any [`PanelApi`].
    ///
    /// Validates `config`, refreshes the panel session once, then spawns
    /// the pollers (when polling is enabled) and the keep-alive.
    pub async fn with_panel(panel: P, config: PanelConfig) -> Result<Self> {
        config.validate()?;

        let (event_tx, _event_rx) = event_channel(64);
        let (shutdown_tx, _shutdown_rx) = tokio::sync::watch::channel(false);

        let panel = Arc::new(panel);
        let reconciler = Arc::new(Reconciler::new());
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&panel),
            Arc::clone(&reconciler),
            config.refresh_before_command,
        );
        let fault = Arc::new(FaultIndicator::new(event_tx.clone()));

        let mut bridge = Self {
            config,
            panel,
            reconciler,
            dispatcher,
            fault,
            event_tx,
            poller_handles: Vec::new(),
            keepalive_handle: None,
            shutdown_tx,
        };

        if let Err(e) = bridge.panel.refresh_session().await {
            warn!("Initial session refresh failed: {}", e);
        }

        if bridge.config.polling {
            bridge.start_polling();
        } else {
            debug!("Polling disabled");
        }
        bridge.start_keepalive();

        info!("Bridge for {} ({}) started", bridge.config.name, bridge.config.base_url());
        Ok(bridge)
    }

    /// Subscribe to bridge events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Spawn the current state, target state and entry delay pollers.
    fn start_polling(&mut self) {
        let scheduler = PollingScheduler::new(
            self.config.poll_interval(),
            Arc::clone(&self.fault),
            self.shutdown_tx.subscribe(),
        );

        let (panel, reconciler, tx) = self.poll_context();
        let current = scheduler.watch(
            "current state",
            move || {
                let (panel, reconciler) = (Arc::clone(&panel), Arc::clone(&reconciler));
                async move {
                    let raw = panel.query_status().await;
                    Ok::<_, TuxedoError>(Polled::from(reconciler.reconcile_current(&raw)))
                }
            },
            move |state| {
                let _ = tx.send(BridgeEvent::CurrentStateChanged(state));
            },
            poll_error_handler(self.event_tx.clone(), "current state"),
        );

        let (panel, reconciler, tx) = self.poll_context();
        let target = scheduler.watch(
            "target state",
            move || {
                let (panel, reconciler) = (Arc::clone(&panel), Arc::clone(&reconciler));
                async move {
                    let raw = panel.query_status().await;
                    Ok::<_, TuxedoError>(Polled::from(reconciler.reconcile_target(&raw)))
                }
            },
            move |state| {
                let _ = tx.send(BridgeEvent::TargetStateChanged(state));
            },
            poll_error_handler(self.event_tx.clone(), "target state"),
        );

        let (panel, _, tx) = self.poll_context();
        let entry_delay = scheduler.watch(
            "entry delay",
            move || {
                let panel = Arc::clone(&panel);
                async move {
                    let raw = panel.query_status().await;
                    Ok::<_, TuxedoError>(Polled::Value(Reconciler::is_entry_delay(&raw)))
                }
            },
            move |active| {
                let _ = tx.send(BridgeEvent::EntryDelayChanged(active));
            },
            poll_error_handler(self.event_tx.clone(), "entry delay"),
        );

        self.poller_handles = vec![current, target, entry_delay];
    }

    fn poll_context(&self) -> (Arc<P>, Arc<Reconciler>, EventSender) {
        (
            Arc::clone(&self.panel),
            Arc::clone(&self.reconciler),
            self.event_tx.clone(),
        )
    }

    /// Periodically re-fetch the home page. Some panel firmware keeps
    /// reporting a stale status until a page is loaded.
    fn start_keepalive(&mut self) {
        let Some(period) = self.config.keepalive_interval() else {
            debug!("Keep-alive disabled");
            return;
        };
        let panel = Arc::clone(&self.panel);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first immediate tick (the session was just refreshed)
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Keep-alive: re-fetching home page");
                        if let Err(e) = panel.refresh_session().await {
                            warn!("Keep-alive refresh failed: {}", e);
                        }
                    }
                    res = shutdown_rx.changed() => {
                        if res.is_err() || *shutdown_rx.borrow() {
                            debug!("Keep-alive shutting down");
                            break;
                        }
                    }
                }
            }
        });
        self.keepalive_handle = Some(handle);
    }

    // --- Inbound operations ---

    /// Query the panel and reconcile its current state.
    pub async fn current_state(&self) -> NormalizedState {
        let raw = self.panel.query_status().await;
        self.reconciler.reconcile_current(&raw).state
    }

    /// Query the panel and reconcile its target state.
    pub async fn target_state(&self) -> TargetState {
        let raw = self.panel.query_status().await;
        self.reconciler.reconcile_target(&raw).state
    }

    /// Query the panel for the entry delay window.
    pub async fn entry_delay_active(&self) -> bool {
        let raw = self.panel.query_status().await;
        Reconciler::is_entry_delay(&raw)
    }

    /// Request a new target state.
    ///
    /// Command failures are logged, never returned; the next poll shows
    /// whether the panel changed state.
    pub async fn set_target_state(&self, target: TargetState) {
        if let Err(e) = self.send_target_state(target).await {
            if e.is_transport() {
                warn!("Panel unreachable while setting target {}: {}", target, e);
            } else {
                error!("Setting target {} failed: {}", target, e);
            }
        }
    }

    /// Like [`set_target_state`](Self::set_target_state), but hands the
    /// command outcome back to the caller.
    pub async fn send_target_state(&self, target: TargetState) -> Result<()> {
        self.dispatcher.set_target(target).await
    }

    /// Current state of the fault indicator.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_active()
    }

    /// Remembered target, without querying the panel.
    pub fn last_target(&self) -> TargetState {
        self.reconciler.last_target()
    }

    /// Query the panel once and reconcile both states from that reading.
    pub async fn snapshot(&self) -> BridgeSnapshot {
        let raw = self.panel.query_status().await;
        let current = self.reconciler.reconcile_current(&raw);
        let target = self.reconciler.reconcile_target(&raw);
        BridgeSnapshot {
            current: current.state,
            target: target.state,
            fault: current.faulted || self.fault.is_active(),
            entry_delay: Reconciler::is_entry_delay(&raw),
        }
    }

    /// Stop all background tasks.
    pub fn shutdown(&mut self) {
        info!("Shutting down bridge for {}", self.config.name);
        let _ = self.shutdown_tx.send(true);
        for handle in self.poller_handles.drain(..) {
            handle.abort();
        }
        if let Some(h) = self.keepalive_handle.take() {
            h.abort();
        }
    }
}

/// Publish poll function failures as [`BridgeEvent::PollFailed`].
fn poll_error_handler(tx: EventSender, property: &'static str) -> impl Fn(&TuxedoError) + Send + 'static {
    move |e: &TuxedoError| {
        let _ = tx.send(BridgeEvent::PollFailed {
            property: property.to_string(),
            reason: e.to_string(),
        });
    }
}

impl<P> Drop for TuxedoBridge<P> {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.poller_handles.drain(..) {
            handle.abort();
        }
        if let Some(h) = self.keepalive_handle.take() {
            h.abort();
        }
    }
}
