// MIT License - Copyright (c) 2026 Peter Wright
// Status reconciliation with last-known-good fallback

//! Turns raw panel statuses into current and target states.
//!
//! The panel reports more than the consumer model can hold: alarms,
//! countdowns, entry delays and the occasional `Not available`. The
//! [`Reconciler`] remembers the last trustworthy current state and the last
//! deliberate target, and substitutes them whenever a reading cannot be
//! shown as-is.
//!
//! | Classification | Current state | Target state |
//! |---|---|---|
//! | Stay/Away/Night/Ready | reading (stored) | reading (stored) |
//! | Triggered | `Triggered` | last target |
//! | Fault | last valid, faulted | last target, faulted |
//! | Countdown | last valid | last target |
//! | Entry delay | last valid | last target |
//! | Unrecognized | `Ready` (stored) | `Ready` (stored) |

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::status::{classify, Classification, NormalizedState, RawStatus, TargetState};

/// Result of reconciling one raw status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading<S> {
    pub state: S,
    /// The panel reported `Fault`; `state` is a remembered substitute.
    pub faulted: bool,
}

impl<S> Reading<S> {
    fn ok(state: S) -> Self {
        Self { state, faulted: false }
    }

    fn faulted(state: S) -> Self {
        Self { state, faulted: true }
    }
}

/// Per-panel reconciliation memory.
///
/// Current and target memory sit behind separate locks so the current and
/// target pollers never wait on each other. Both only ever hold
/// target-eligible states.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_valid_current: Mutex<TargetState>,
    last_target: Mutex<TargetState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Plain Copy values; a panicked writer cannot leave them half-written.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a reading of the current state.
    pub fn reconcile_current(&self, raw: &RawStatus) -> Reading<NormalizedState> {
        let mut last_valid = lock(&self.last_valid_current);
        let reading = match classify(raw) {
            Classification::EntryDelayTransient => {
                debug!("Entry delay active, holding current state {}", *last_valid);
                Reading::ok((*last_valid).into())
            }
            Classification::CountdownTransient => {
                debug!("Countdown '{raw}', holding current state {}", *last_valid);
                Reading::ok((*last_valid).into())
            }
            Classification::Stable(NormalizedState::Fault) => {
                debug!("Status '{raw}' unavailable, returning last known good {}", *last_valid);
                Reading::faulted((*last_valid).into())
            }
            Classification::Stable(state) => {
                if let Some(target) = state.as_target() {
                    *last_valid = target;
                }
                Reading::ok(state)
            }
            Classification::Unrecognized => {
                warn!("Unknown alarm state: '{raw}', treating as ready");
                *last_valid = TargetState::Ready;
                Reading::ok(NormalizedState::Ready)
            }
        };
        debug!("Current state for '{raw}': {}", reading.state);
        reading
    }

    /// Reconcile a reading of the target state. Never yields `Triggered` or
    /// `Fault`.
    pub fn reconcile_target(&self, raw: &RawStatus) -> Reading<TargetState> {
        let mut last_target = lock(&self.last_target);
        let reading = match classify(raw) {
            Classification::CountdownTransient | Classification::EntryDelayTransient => {
                Reading::ok(*last_target)
            }
            Classification::Stable(state) => match state.as_target() {
                Some(target) => {
                    *last_target = target;
                    Reading::ok(target)
                }
                None if state == NormalizedState::Fault => Reading::faulted(*last_target),
                None => {
                    debug!("Status '{raw}' is not a valid target, keeping {}", *last_target);
                    Reading::ok(*last_target)
                }
            },
            Classification::Unrecognized => {
                warn!("Unknown alarm state: '{raw}', treating target as ready");
                *last_target = TargetState::Ready;
                Reading::ok(TargetState::Ready)
            }
        };
        debug!("Target state for '{raw}': {}", reading.state);
        reading
    }

    /// Remember a user-requested target before the command completes.
    pub fn record_optimistic_target(&self, target: TargetState) {
        *lock(&self.last_target) = target;
    }

    /// Whether the status is the entry-delay window.
    pub fn is_entry_delay(raw: &RawStatus) -> bool {
        classify(raw) == Classification::EntryDelayTransient
    }

    pub fn last_valid_current(&self) -> TargetState {
        *lock(&self.last_valid_current)
    }

    pub fn last_target(&self) -> TargetState {
        *lock(&self.last_target)
    }
}
