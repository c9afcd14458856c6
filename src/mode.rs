//! HVAC operating mode and its partitions into heat/cool/controlled sets.

use serde::{Deserialize, Serialize};

/// Thermostat operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    Heat,
    Cool,
    Auto,
    Dry,
    Fan,
    /// The device reported a mode code the driver could not interpret.
    Unknown,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Off => "off",
            Mode::Heat => "heat",
            Mode::Cool => "cool",
            Mode::Auto => "auto",
            Mode::Dry => "dry",
            Mode::Fan => "fan",
            Mode::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Modes in which a heat setpoint exists.
pub const HEAT_MODES: &[Mode] = &[Mode::Heat, Mode::Auto];

/// Modes in which a cool setpoint exists.
pub const COOL_MODES: &[Mode] = &[Mode::Cool, Mode::Dry, Mode::Auto];

/// Modes in which a setpoint exists and reversion is possible.
pub const CONTROLLED_MODES: &[Mode] = &[Mode::Heat, Mode::Cool, Mode::Auto];

impl Mode {
    pub fn is_heat_mode(self) -> bool {
        HEAT_MODES.contains(&self)
    }

    pub fn is_cool_mode(self) -> bool {
        COOL_MODES.contains(&self)
    }

    pub fn is_controlled_mode(self) -> bool {
        CONTROLLED_MODES.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_cool_partitions_match_spec_table() {
        assert!(Mode::Heat.is_heat_mode());
        assert!(Mode::Auto.is_heat_mode());
        assert!(!Mode::Cool.is_heat_mode());

        assert!(Mode::Cool.is_cool_mode());
        assert!(Mode::Dry.is_cool_mode());
        assert!(Mode::Auto.is_cool_mode());
        assert!(!Mode::Heat.is_cool_mode());
    }

    #[test]
    fn controlled_modes_are_exactly_heat_cool_auto() {
        for m in [Mode::Heat, Mode::Cool, Mode::Auto] {
            assert!(m.is_controlled_mode());
        }
        for m in [Mode::Off, Mode::Dry, Mode::Fan, Mode::Unknown] {
            assert!(!m.is_controlled_mode());
        }
    }

    #[test]
    fn display_matches_lowercase_name() {
        assert_eq!(Mode::Heat.to_string(), "heat");
        assert_eq!(Mode::Unknown.to_string(), "unknown");
    }
}
