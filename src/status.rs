// MIT License - Copyright (c) 2026 Peter Wright
// Panel status vocabulary and normalized states

use std::fmt;

/// Substring carried by every exit/arming countdown status ("12 Secs Remaining").
pub const COUNTDOWN_MARKER: &str = "Secs Remaining";

/// Status reported while the pre-alarm entry window is running.
pub const ENTRY_DELAY_STATUS: &str = "Entry Delay Active";

/// Synthetic status substituted by the client when a query fails.
pub const TRANSPORT_ERROR_STATUS: &str = "Error";

/// Consumer-facing security state.
///
/// `Triggered` and `Fault` only ever describe the current state; targets
/// use [`TargetState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizedState {
    StayArmed,
    AwayArmed,
    NightArmed,
    Ready,
    Triggered,
    Fault,
}

impl NormalizedState {
    /// Wire name used on MQTT.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayArmed => "stayArmed",
            Self::AwayArmed => "awayArmed",
            Self::NightArmed => "nightArmed",
            Self::Ready => "ready",
            Self::Triggered => "triggered",
            Self::Fault => "fault",
        }
    }

    /// The target-eligible view of this state, if it has one.
    pub fn as_target(&self) -> Option<TargetState> {
        match self {
            Self::StayArmed => Some(TargetState::StayArmed),
            Self::AwayArmed => Some(TargetState::AwayArmed),
            Self::NightArmed => Some(TargetState::NightArmed),
            Self::Ready => Some(TargetState::Ready),
            Self::Triggered | Self::Fault => None,
        }
    }
}

impl fmt::Display for NormalizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-intended state. A strict subset of [`NormalizedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetState {
    StayArmed,
    AwayArmed,
    NightArmed,
    #[default]
    Ready,
}

impl TargetState {
    pub const ALL: [TargetState; 4] = [
        TargetState::StayArmed,
        TargetState::AwayArmed,
        TargetState::NightArmed,
        TargetState::Ready,
    ];

    pub fn as_str(&self) -> &'static str {
        NormalizedState::from(*self).as_str()
    }

    /// Arm mode needed to reach this target, `None` for a disarm.
    pub fn arm_mode(&self) -> Option<ArmMode> {
        match self {
            Self::StayArmed => Some(ArmMode::Stay),
            Self::AwayArmed => Some(ArmMode::Away),
            Self::NightArmed => Some(ArmMode::Night),
            Self::Ready => None,
        }
    }
}

impl From<TargetState> for NormalizedState {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::StayArmed => NormalizedState::StayArmed,
            TargetState::AwayArmed => NormalizedState::AwayArmed,
            TargetState::NightArmed => NormalizedState::NightArmed,
            TargetState::Ready => NormalizedState::Ready,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arming mode accepted by the panel's ArmWithCode endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    Stay,
    Away,
    Night,
}

impl ArmMode {
    /// Value of the `arming` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stay => "STAY",
            Self::Away => "AWAY",
            Self::Night => "NIGHT",
        }
    }
}

impl fmt::Display for ArmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trimmed `Status` field of one panel response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatus(String);

impl RawStatus {
    pub fn new(status: impl AsRef<str>) -> Self {
        Self(status.as_ref().trim().to_string())
    }

    /// The reading substituted for any failed status query.
    pub fn transport_error() -> Self {
        Self(TRANSPORT_ERROR_STATUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of matching a raw status against the known vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A phrase from the status table. May be `Triggered` or `Fault`.
    Stable(NormalizedState),
    /// Exit/arming countdown; carries no new state.
    CountdownTransient,
    /// Pre-alarm entry window.
    EntryDelayTransient,
    /// Not in the table. Treated as `Ready` downstream.
    Unrecognized,
}

/// Look up a phrase in the panel's status table.
fn lookup(status: &str) -> Option<NormalizedState> {
    use NormalizedState::*;
    let state = match status {
        "Armed Stay" | "Armed Stay Fault" => StayArmed,
        "Armed Away" | "Armed Away Fault" => AwayArmed,
        "Armed Night" | "Armed Instant" | "Armed Instant Fault" | "Armed Night Fault" => {
            NightArmed
        }
        "Ready Fault" | "Ready To Arm" | "Not Ready" | "Not Ready Fault" => Ready,
        "Not Ready Alarm" | "Armed Stay Alarm" | "Armed Night Alarm" | "Armed Away Alarm" => {
            Triggered
        }
        "Not available" | TRANSPORT_ERROR_STATUS => Fault,
        _ => return None,
    };
    Some(state)
}

/// Classify a raw panel status.
///
/// Matching is exact and case-sensitive; the transient families are
/// checked before the table.
pub fn classify(raw: &RawStatus) -> Classification {
    let status = raw.as_str();
    if status.contains(COUNTDOWN_MARKER) {
        return Classification::CountdownTransient;
    }
    if status == ENTRY_DELAY_STATUS {
        return Classification::EntryDelayTransient;
    }
    match lookup(status) {
        Some(state) => Classification::Stable(state),
        None => Classification::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(s: &str) -> Classification {
        classify(&RawStatus::from(s))
    }

    #[test]
    fn test_stay_bucket() {
        for s in ["Armed Stay", "Armed Stay Fault"] {
            assert_eq!(class(s), Classification::Stable(NormalizedState::StayArmed), "{s}");
        }
    }

    #[test]
    fn test_away_bucket() {
        for s in ["Armed Away", "Armed Away Fault"] {
            assert_eq!(class(s), Classification::Stable(NormalizedState::AwayArmed), "{s}");
        }
    }

    #[test]
    fn test_night_bucket() {
        for s in ["Armed Night", "Armed Instant", "Armed Instant Fault", "Armed Night Fault"] {
            assert_eq!(class(s), Classification::Stable(NormalizedState::NightArmed), "{s}");
        }
    }

    #[test]
    fn test_ready_bucket() {
        for s in ["Ready Fault", "Ready To Arm", "Not Ready", "Not Ready Fault"] {
            assert_eq!(class(s), Classification::Stable(NormalizedState::Ready), "{s}");
        }
    }

    #[test]
    fn test_triggered_bucket() {
        for s in ["Not Ready Alarm", "Armed Stay Alarm", "Armed Night Alarm", "Armed Away Alarm"] {
            assert_eq!(class(s), Classification::Stable(NormalizedState::Triggered), "{s}");
        }
    }

    #[test]
    fn test_fault_bucket() {
        let fault = Classification::Stable(NormalizedState::Fault);
        assert_eq!(class("Not available"), fault);
        assert_eq!(class("Error"), fault);
        assert_eq!(classify(&RawStatus::transport_error()), fault);
    }

    #[test]
    fn test_countdown_detected_by_substring() {
        assert_eq!(class("12 Secs Remaining"), Classification::CountdownTransient);
        assert_eq!(class("Exit Delay 60 Secs Remaining"), Classification::CountdownTransient);
    }

    #[test]
    fn test_entry_delay_exact_match() {
        assert_eq!(class("Entry Delay Active"), Classification::EntryDelayTransient);
        assert_eq!(class("  Entry Delay Active  "), Classification::EntryDelayTransient);
        assert_eq!(class("entry delay active"), Classification::Unrecognized);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(class("Armed Vacation"), Classification::Unrecognized);
        assert_eq!(class(""), Classification::Unrecognized);
        assert_eq!(class("armed stay"), Classification::Unrecognized);
    }

    #[test]
    fn test_classify_is_order_independent() {
        let first = class("Armed Away Alarm");
        let _ = class("Armed Stay");
        let _ = class("12 Secs Remaining");
        assert_eq!(class("Armed Away Alarm"), first);
    }

    #[test]
    fn test_target_conversion() {
        for target in TargetState::ALL {
            assert_eq!(NormalizedState::from(target).as_target(), Some(target));
        }
        assert_eq!(NormalizedState::Triggered.as_target(), None);
        assert_eq!(NormalizedState::Fault.as_target(), None);
    }

    #[test]
    fn test_arm_mode_mapping() {
        assert_eq!(TargetState::StayArmed.arm_mode(), Some(ArmMode::Stay));
        assert_eq!(TargetState::AwayArmed.arm_mode(), Some(ArmMode::Away));
        assert_eq!(TargetState::NightArmed.arm_mode(), Some(ArmMode::Night));
        assert_eq!(TargetState::Ready.arm_mode(), None);
        assert_eq!(ArmMode::Night.as_str(), "NIGHT");
    }
}
