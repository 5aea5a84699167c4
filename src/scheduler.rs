// MIT License - Copyright (c) 2026 Peter Wright
// Periodic property polling with change detection

use std::fmt;
use std::future::Future;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, TuxedoError};
use crate::event::{BridgeEvent, EventSender};
use crate::reconciler::Reading;

/// One poll result for a watched property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polled<T> {
    Value(T),
    /// The panel could not be read; raises the fault indicator instead of
    /// being emitted as a value.
    Fault,
}

impl<T> From<Reading<T>> for Polled<T> {
    fn from(reading: Reading<T>) -> Self {
        if reading.faulted {
            Polled::Fault
        } else {
            Polled::Value(reading.state)
        }
    }
}

/// What a single observation asks the scheduler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchStep<T> {
    /// New value to emit, if it differs from the last emitted one
    pub changed: Option<T>,
    /// Fault indicator transition for this property
    pub fault: Option<bool>,
}

impl<T> WatchStep<T> {
    fn idle() -> Self {
        Self { changed: None, fault: None }
    }
}

/// Change detection for one property.
#[derive(Debug)]
pub struct PropertyWatcher<T> {
    last: Option<T>,
    faulted: bool,
}

impl<T: Clone + PartialEq> Default for PropertyWatcher<T> {
    fn default() -> Self {
        Self { last: None, faulted: false }
    }
}

impl<T: Clone + PartialEq> PropertyWatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a poll result against the last emitted value.
    pub fn observe(&mut self, polled: Polled<T>) -> WatchStep<T> {
        match polled {
            Polled::Fault if self.faulted => WatchStep::idle(),
            Polled::Fault => {
                self.faulted = true;
                WatchStep { changed: None, fault: Some(true) }
            }
            Polled::Value(value) => {
                let fault = std::mem::take(&mut self.faulted).then_some(false);
                let changed = if self.last.as_ref() != Some(&value) {
                    self.last = Some(value.clone());
                    Some(value)
                } else {
                    None
                };
                WatchStep { changed, fault }
            }
        }
    }

    /// Record that the poll function failed; the next value clears the fault.
    pub fn mark_failed(&mut self) {
        self.faulted = true;
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }
}

/// Shared fault flag.
///
/// Raised while any watched property is faulted. Publishes
/// [`BridgeEvent::FaultChanged`] on transitions of the combined flag only.
#[derive(Debug)]
pub struct FaultIndicator {
    faulted: Mutex<HashSet<String>>,
    event_tx: EventSender,
}

impl FaultIndicator {
    pub fn new(event_tx: EventSender) -> Self {
        Self {
            faulted: Mutex::new(HashSet::new()),
            event_tx,
        }
    }

    /// Record whether `property` is currently faulted.
    pub fn set(&self, property: &str, active: bool) {
        let mut faulted = self.faulted.lock().unwrap_or_else(|p| p.into_inner());
        let was_active = !faulted.is_empty();
        if active {
            faulted.insert(property.to_string());
        } else {
            faulted.remove(property);
        }
        let now_active = !faulted.is_empty();
        if was_active == now_active {
            return;
        }
        if now_active {
            warn!("Security system state unavailable ({}), raising fault", property);
        } else {
            info!("Security system state available again, clearing fault");
        }
        let _ = self.event_tx.send(BridgeEvent::FaultChanged(now_active));
    }

    pub fn is_active(&self) -> bool {
        !self.faulted.lock().unwrap_or_else(|p| p.into_inner()).is_empty()
    }
}

/// Spawns one polling task per watched property.
///
/// Every task shares the poll period, the fault indicator and the
/// shutdown signal. A task awaits its poll before waiting for the next
/// tick, so each property has at most one request in flight; different
/// properties poll independently.
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    period: Duration,
    fault: Arc<FaultIndicator>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollingScheduler {
    pub fn new(
        period: Duration,
        fault: Arc<FaultIndicator>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            period,
            fault,
            shutdown_rx,
        }
    }

    /// Poll `property_fn` every period, calling `on_change` when the value
    /// changes and `on_error` when the poll itself fails.
    pub fn watch<T, F, Fut, C, E>(
        &self,
        name: &str,
        mut property_fn: F,
        on_change: C,
        on_error: E,
    ) -> JoinHandle<()>
    where
        T: Clone + PartialEq + fmt::Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Polled<T>>> + Send,
        C: Fn(T) + Send + 'static,
        E: Fn(&TuxedoError) + Send + 'static,
    {
        let name = name.to_string();
        let period = self.period;
        let fault = Arc::clone(&self.fault);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!("Starting polling of {} every {:?}", name, period);
        tokio::spawn(async move {
            let mut watcher = PropertyWatcher::new();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    res = shutdown_rx.changed() => {
                        if res.is_err() || *shutdown_rx.borrow() {
                            debug!("Polling of {} shutting down", name);
                            break;
                        }
                        continue;
                    }
                }

                match property_fn().await {
                    Ok(polled) => {
                        let step = watcher.observe(polled);
                        if let Some(active) = step.fault {
                            fault.set(&name, active);
                        }
                        if let Some(value) = step.changed {
                            info!("Polling noticed {} change to {}", name, value);
                            on_change(value);
                        }
                    }
                    Err(e) => {
                        warn!("Polling of {} failed: {}", name, e);
                        watcher.mark_failed();
                        fault.set(&name, true);
                        on_error(&e);
                    }
                }
            }
        })
    }
}
