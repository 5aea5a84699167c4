// MIT License - Copyright (c) 2026 Peter Wright
// Bridge events

use crate::status::{NormalizedState, TargetState};

/// All events that can be emitted by the bridge.
///
/// Users subscribe via `bridge.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<BridgeEvent>`. State events are only
/// sent when the observed value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Polled current state changed
    CurrentStateChanged(NormalizedState),
    /// Polled target state changed
    TargetStateChanged(TargetState),
    /// Fault indicator raised (`true`) or cleared (`false`)
    FaultChanged(bool),
    /// Entry delay window started (`true`) or ended (`false`)
    EntryDelayChanged(bool),
    /// A property's poll function itself failed
    PollFailed { property: String, reason: String },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<BridgeEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<BridgeEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
