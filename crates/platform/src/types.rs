//! Shared types for battery state reporting.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::FieldError;

/// Name table for [`State`], indexed by discriminant.
const STATE_NAMES: [&str; 7] = [
    "Undefined",
    "Unknown",
    "Empty",
    "Full",
    "Charging",
    "Discharging",
    "Not charging",
];

/// Battery power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// The source reported a state string that is not in the name table
    Undefined = 0,
    /// The source itself says the state is unknown
    #[default]
    Unknown = 1,
    /// Battery is empty (or at critical level)
    Empty = 2,
    /// Battery is full
    Full = 3,
    /// Battery is actively charging
    Charging = 4,
    /// Battery is discharging (on battery power)
    Discharging = 5,
    /// External power connected but not charging (e.g., charge limit reached)
    Idle = 6,
}

const ALL_STATES: [State; 7] = [
    State::Undefined,
    State::Unknown,
    State::Empty,
    State::Full,
    State::Charging,
    State::Discharging,
    State::Idle,
];

impl State {
    /// Parses an OS status string.
    ///
    /// Always yields a usable state: text that matches no entry in the name
    /// table becomes [`State::Undefined`] together with an error carrying the
    /// original text.
    pub fn parse(text: &str) -> (State, Option<FieldError>) {
        match STATE_NAMES.iter().position(|name| *name == text) {
            Some(i) => (ALL_STATES[i], None),
            None => (
                State::Undefined,
                Some(FieldError::InvalidState(text.to_string())),
            ),
        }
    }

    /// Returns the canonical name of the state.
    pub fn as_str(&self) -> &'static str {
        STATE_NAMES[*self as usize]
    }

    /// Maps ACPI battery status bits (`_BST` state) to a state.
    ///
    /// Bit 0 is discharging, bit 1 charging and bit 2 critical. With no bits
    /// set the battery is idle, or full when the remaining capacity has
    /// reached the last full capacity.
    pub fn from_acpi_flags(flags: u32, at_full_capacity: bool) -> State {
        if flags & 0x1 != 0 {
            State::Discharging
        } else if flags & 0x2 != 0 {
            State::Charging
        } else if flags & 0x4 != 0 {
            State::Empty
        } else if at_full_capacity {
            State::Full
        } else {
            State::Idle
        }
    }

    /// Returns true if external power is connected.
    pub fn is_plugged_in(&self) -> bool {
        matches!(self, State::Charging | State::Full | State::Idle)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized by its canonical name, like `Display`.
impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<starship_battery::State> for State {
    fn from(state: starship_battery::State) -> Self {
        match state {
            starship_battery::State::Charging => State::Charging,
            starship_battery::State::Discharging => State::Discharging,
            starship_battery::State::Empty => State::Empty,
            starship_battery::State::Full => State::Full,
            starship_battery::State::Unknown => State::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_names() {
        for state in ALL_STATES {
            let (parsed, err) = State::parse(state.as_str());
            assert_eq!(parsed, state);
            assert!(err.is_none(), "{} should parse cleanly", state);
        }
    }

    #[test]
    fn test_state_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&State::Idle).unwrap(),
            "\"Not charging\""
        );
        assert_eq!(
            serde_json::to_string(&State::Discharging).unwrap(),
            "\"Discharging\""
        );
    }

    #[test]
    fn test_state_parse_sysfs_strings() {
        assert_eq!(State::parse("Charging").0, State::Charging);
        assert_eq!(State::parse("Discharging").0, State::Discharging);
        assert_eq!(State::parse("Full").0, State::Full);
        assert_eq!(State::parse("Not charging").0, State::Idle);
        assert_eq!(State::parse("Unknown").0, State::Unknown);
    }

    #[test]
    fn test_state_parse_unrecognized() {
        for text in ["", "charging", "Plugged in", "FULL", "\u{1F50B}"] {
            let (state, err) = State::parse(text);
            assert_eq!(state, State::Undefined);
            match err {
                Some(FieldError::InvalidState(raw)) => assert_eq!(raw, text),
                other => panic!("expected InvalidState, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_state_from_acpi_flags() {
        assert_eq!(State::from_acpi_flags(0x1, false), State::Discharging);
        assert_eq!(State::from_acpi_flags(0x5, false), State::Discharging);
        assert_eq!(State::from_acpi_flags(0x2, true), State::Charging);
        assert_eq!(State::from_acpi_flags(0x4, false), State::Empty);
        assert_eq!(State::from_acpi_flags(0x0, true), State::Full);
        assert_eq!(State::from_acpi_flags(0x0, false), State::Idle);
    }

    #[test]
    fn test_state_is_plugged_in() {
        assert!(State::Charging.is_plugged_in());
        assert!(State::Full.is_plugged_in());
        assert!(State::Idle.is_plugged_in());
        assert!(!State::Discharging.is_plugged_in());
        assert!(!State::Unknown.is_plugged_in());
    }

    #[test]
    fn test_battery_state_conversion() {
        assert_eq!(
            State::from(starship_battery::State::Charging),
            State::Charging
        );
        assert_eq!(
            State::from(starship_battery::State::Discharging),
            State::Discharging
        );
        assert_eq!(State::from(starship_battery::State::Full), State::Full);
        assert_eq!(State::from(starship_battery::State::Empty), State::Empty);
        assert_eq!(
            State::from(starship_battery::State::Unknown),
            State::Unknown
        );
    }
}
