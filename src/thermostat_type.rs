//! The [`ThermostatType`] alias, split into its own module so both the
//! driver registry and the individual driver implementations can name it
//! without a circular module dependency.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ThermostatError};

/// Enumerated string alias for a thermostat family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ThermostatType {
    Honeywell,
    KumoCloud,
    KumoLocal,
    Mmm50,
    Sht31,
    Emulator,
    Blink,
    Nest,
}

impl fmt::Display for ThermostatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThermostatType::Honeywell => "honeywell",
            ThermostatType::KumoCloud => "kumocloud",
            ThermostatType::KumoLocal => "kumolocal",
            ThermostatType::Mmm50 => "mmm50",
            ThermostatType::Sht31 => "sht31",
            ThermostatType::Emulator => "emulator",
            ThermostatType::Blink => "blink",
            ThermostatType::Nest => "nest",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ThermostatType {
    type Err = ThermostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "honeywell" => Ok(ThermostatType::Honeywell),
            "kumocloud" => Ok(ThermostatType::KumoCloud),
            "kumolocal" => Ok(ThermostatType::KumoLocal),
            "mmm50" => Ok(ThermostatType::Mmm50),
            "sht31" => Ok(ThermostatType::Sht31),
            "emulator" => Ok(ThermostatType::Emulator),
            "blink" => Ok(ThermostatType::Blink),
            "nest" => Ok(ThermostatType::Nest),
            other => Err(ThermostatError::InternalError(format!(
                "unrecognized thermostat type alias: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_round_trips_through_display_and_from_str() {
        for t in [
            ThermostatType::Honeywell,
            ThermostatType::KumoCloud,
            ThermostatType::KumoLocal,
            ThermostatType::Mmm50,
            ThermostatType::Sht31,
            ThermostatType::Emulator,
            ThermostatType::Blink,
            ThermostatType::Nest,
        ] {
            let alias = t.to_string();
            let parsed: ThermostatType = alias.parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn unknown_alias_is_rejected() {
        assert!("bogus".parse::<ThermostatType>().is_err());
    }
}
