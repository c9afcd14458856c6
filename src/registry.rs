//! Driver registry: maps a thermostat-type alias to a constructor and
//! declares each family's supported zones/modes and credential
//! requirements. A compile-time table standing in for the source's
//! runtime `importlib` dispatch.

use std::collections::{HashMap, HashSet};

use crate::credentials::Credentials;
use crate::drivers::{emulator, rest, sht31};
use crate::error::{Result, ThermostatError};
use crate::mode::Mode;
use crate::thermostat::Thermostat;
pub use crate::thermostat_type::ThermostatType;

/// A device-native mode representation: some families use an integer
/// status code (Honeywell), others a vendor string (Kumocloud).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchCode {
    Int(i64),
    Str(&'static str),
}

/// The finite or brand-defined range of zone identifiers a family supports.
#[derive(Debug, Clone)]
pub enum SupportedZones {
    Finite(Vec<String>),
    Range { start: i64, end_inclusive: i64 },
}

impl SupportedZones {
    pub fn contains(&self, zone_id: &str) -> bool {
        match self {
            SupportedZones::Finite(zones) => zones.iter().any(|z| z == zone_id),
            SupportedZones::Range { start, end_inclusive } => zone_id
                .parse::<i64>()
                .map(|z| z >= *start && z <= *end_inclusive)
                .unwrap_or(false),
        }
    }
}

type Constructor = fn(&Credentials, &str) -> Result<Box<dyn Thermostat>>;

/// Everything the registry declares about one thermostat family.
pub struct DriverEntry {
    pub thermostat_type: ThermostatType,
    /// Required env credential keys; a key ending in `_` is zone-indexed.
    pub required_credential_keys: Vec<&'static str>,
    pub supported_zones: SupportedZones,
    pub supported_modes: &'static [Mode],
    pub switch_positions: HashMap<Mode, HashSet<SwitchCode>>,
    constructor: Constructor,
}

impl DriverEntry {
    /// Construct a `Thermostat` for this family.
    pub fn construct(&self, credentials: &Credentials, zone_id: &str) -> Result<Box<dyn Thermostat>> {
        (self.constructor)(credentials, zone_id)
    }
}

/// The compile-time table mapping a [`ThermostatType`] to its [`DriverEntry`].
pub struct DriverRegistry {
    entries: HashMap<ThermostatType, DriverEntry>,
}

impl DriverRegistry {
    /// Build the registry with every supported thermostat family.
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();

        entries.insert(
            ThermostatType::Honeywell,
            DriverEntry {
                thermostat_type: ThermostatType::Honeywell,
                required_credential_keys: vec!["TCC_USERNAME", "TCC_PASSWORD"],
                supported_zones: SupportedZones::Finite(vec!["0".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool],
                switch_positions: honeywell_switch_positions(),
                constructor: rest::construct_honeywell,
            },
        );
        entries.insert(
            ThermostatType::KumoCloud,
            DriverEntry {
                thermostat_type: ThermostatType::KumoCloud,
                required_credential_keys: vec!["KUMO_USERNAME", "KUMO_PASSWORD"],
                supported_zones: SupportedZones::Finite(vec!["0".into(), "1".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool, Mode::Dry, Mode::Auto],
                switch_positions: kumo_switch_positions(),
                constructor: rest::construct_kumocloud,
            },
        );
        entries.insert(
            ThermostatType::KumoLocal,
            DriverEntry {
                thermostat_type: ThermostatType::KumoLocal,
                required_credential_keys: vec!["KUMO_USERNAME", "KUMO_PASSWORD"],
                supported_zones: SupportedZones::Finite(vec!["0".into(), "1".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool, Mode::Dry, Mode::Auto],
                switch_positions: kumo_switch_positions(),
                constructor: rest::construct_kumolocal,
            },
        );
        entries.insert(
            ThermostatType::Mmm50,
            DriverEntry {
                thermostat_type: ThermostatType::Mmm50,
                required_credential_keys: vec![],
                supported_zones: SupportedZones::Finite(vec!["0".into(), "1".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool],
                switch_positions: HashMap::new(),
                constructor: rest::construct_mmm50,
            },
        );
        entries.insert(
            ThermostatType::Blink,
            DriverEntry {
                thermostat_type: ThermostatType::Blink,
                required_credential_keys: vec!["BLINK_USERNAME", "BLINK_PASSWORD"],
                supported_zones: SupportedZones::Finite(vec!["0".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool],
                switch_positions: HashMap::new(),
                constructor: rest::construct_blink,
            },
        );
        entries.insert(
            ThermostatType::Nest,
            DriverEntry {
                thermostat_type: ThermostatType::Nest,
                required_credential_keys: vec!["NEST_USERNAME", "NEST_PASSWORD"],
                supported_zones: SupportedZones::Finite(vec!["0".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool, Mode::Auto],
                switch_positions: HashMap::new(),
                constructor: rest::construct_nest,
            },
        );
        entries.insert(
            ThermostatType::Sht31,
            DriverEntry {
                thermostat_type: ThermostatType::Sht31,
                required_credential_keys: vec!["SHT31_REMOTE_IP_ADDRESS_"],
                supported_zones: SupportedZones::Finite(vec!["0".into(), "1".into(), "99".into()]),
                supported_modes: &[Mode::Off],
                switch_positions: HashMap::new(),
                constructor: sht31::construct,
            },
        );
        entries.insert(
            ThermostatType::Emulator,
            DriverEntry {
                thermostat_type: ThermostatType::Emulator,
                required_credential_keys: vec![],
                supported_zones: SupportedZones::Finite(vec!["0".into(), "1".into()]),
                supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool, Mode::Dry, Mode::Auto],
                switch_positions: HashMap::new(),
                constructor: emulator::construct,
            },
        );

        Self { entries }
    }

    pub fn get(&self, thermostat_type: ThermostatType) -> Option<&DriverEntry> {
        self.entries.get(&thermostat_type)
    }

    /// Iterate declared zone credential keys and fail fast, identifying the
    /// missing key, if any required key is absent.
    pub fn verify_required_credentials(
        &self,
        thermostat_type: ThermostatType,
        zone_id: &str,
        credentials: &Credentials,
    ) -> Result<()> {
        let entry = self.get(thermostat_type).ok_or_else(|| ThermostatError::InternalError(
            format!("no driver registered for {thermostat_type}"),
        ))?;
        for key in &entry.required_credential_keys {
            credentials.require(key, zone_id)?;
        }
        Ok(())
    }
}

fn honeywell_switch_positions() -> HashMap<Mode, HashSet<SwitchCode>> {
    let mut map = HashMap::new();
    map.insert(Mode::Cool, HashSet::from([SwitchCode::Int(0)]));
    map.insert(Mode::Heat, HashSet::from([SwitchCode::Int(1)]));
    map.insert(Mode::Off, HashSet::from([SwitchCode::Int(2)]));
    map
}

fn kumo_switch_positions() -> HashMap<Mode, HashSet<SwitchCode>> {
    let mut map = HashMap::new();
    map.insert(Mode::Heat, HashSet::from([SwitchCode::Int(1)]));
    map.insert(Mode::Off, HashSet::from([SwitchCode::Int(16)]));
    map.insert(Mode::Cool, HashSet::from([SwitchCode::Str("Cool")]));
    map.insert(Mode::Dry, HashSet::from([SwitchCode::Str("Auto")]));
    map.insert(Mode::Auto, HashSet::from([SwitchCode::Str("Dry")]));
    map
}

#[cfg(test)]
impl DriverEntry {
    /// Build a bare entry around a caller-supplied constructor, for tests
    /// that need a fake driver the default table doesn't carry.
    pub(crate) fn for_test(thermostat_type: ThermostatType, constructor: Constructor) -> Self {
        Self {
            thermostat_type,
            required_credential_keys: vec![],
            supported_zones: SupportedZones::Range { start: 0, end_inclusive: 99 },
            supported_modes: &[Mode::Off, Mode::Heat, Mode::Cool, Mode::Dry, Mode::Auto, Mode::Unknown],
            switch_positions: HashMap::new(),
            constructor,
        }
    }
}

#[cfg(test)]
impl DriverRegistry {
    /// A registry carrying exactly one entry, for tests that need a fake
    /// driver in isolation rather than the full default table.
    pub(crate) fn for_test(thermostat_type: ThermostatType, entry: DriverEntry) -> Self {
        let mut entries = HashMap::new();
        entries.insert(thermostat_type, entry);
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sht31_zone_credential_is_zone_indexed() {
        let registry = DriverRegistry::with_defaults();
        let mut creds = Credentials::default();
        let err = registry
            .verify_required_credentials(ThermostatType::Sht31, "1", &creds)
            .unwrap_err();
        assert!(err.is_fatal());

        creds.insert("SHT31_REMOTE_IP_ADDRESS_1", "192.168.86.15");
        registry
            .verify_required_credentials(ThermostatType::Sht31, "1", &creds)
            .unwrap();
    }

    #[test]
    fn supported_zones_finite_rejects_unknown_zone() {
        let zones = SupportedZones::Finite(vec!["0".into(), "1".into()]);
        assert!(zones.contains("0"));
        assert!(!zones.contains("5"));
    }

    #[test]
    fn emulator_requires_no_credentials() {
        let registry = DriverRegistry::with_defaults();
        let creds = Credentials::default();
        registry
            .verify_required_credentials(ThermostatType::Emulator, "0", &creds)
            .unwrap();
    }
}
