//! In-process fake thermostat with uniform-noise perturbation, grounded on
//! `original_source/emulator_config.py`. Used by this crate's own test
//! suite and as a no-hardware dry-run family (`ThermostatType::Emulator`).

use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, Instant};

use crate::credentials::Credentials;
use crate::error::Result;
use crate::mode::Mode;
use crate::thermostat::{Thermostat, Zone};

/// Tunables for the noise model; defaults match a plausible residential
/// reading spread.
#[derive(Debug, Clone, Copy)]
pub struct EmulatorConfig {
    pub display_temp_base: f64,
    pub display_humidity_base: f64,
    pub noise_amplitude_f: f64,
    pub schedule_heat_setpoint: f64,
    pub schedule_cool_setpoint: f64,
    pub fetch_interval_sec: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            display_temp_base: 70.0,
            display_humidity_base: 45.0,
            noise_amplitude_f: 0.5,
            schedule_heat_setpoint: 70.0,
            schedule_cool_setpoint: 72.0,
            fetch_interval_sec: 0,
        }
    }
}

pub struct EmulatorThermostat {
    config: EmulatorConfig,
}

impl EmulatorThermostat {
    pub fn new(config: EmulatorConfig) -> Self {
        Self { config }
    }
}

pub(crate) fn construct(_credentials: &Credentials, _zone_id: &str) -> Result<Box<dyn Thermostat>> {
    Ok(Box::new(EmulatorThermostat::new(EmulatorConfig::default())))
}

#[async_trait]
impl Thermostat for EmulatorThermostat {
    async fn open_zone(&self, zone_id: &str) -> Result<Box<dyn Zone>> {
        Ok(Box::new(EmulatorZone::new(zone_id.to_string(), self.config)))
    }
}

/// In-process fake zone. Every setter mutates local state immediately so
/// tests can assert end-to-end scenarios without a network.
pub struct EmulatorZone {
    zone_id: String,
    config: EmulatorConfig,
    mode: Mode,
    heat_setpoint: f64,
    cool_setpoint: f64,
    hold_active: bool,
    hold_temporary: bool,
    last_fetch: Option<Instant>,
}

impl EmulatorZone {
    pub fn new(zone_id: String, config: EmulatorConfig) -> Self {
        Self {
            zone_id,
            config,
            mode: Mode::Heat,
            heat_setpoint: config.schedule_heat_setpoint,
            cool_setpoint: config.schedule_cool_setpoint,
            hold_active: false,
            hold_temporary: false,
            last_fetch: None,
        }
    }

    /// Force the zone into a given mode/setpoint, used by tests to set up
    /// an end-to-end override scenario.
    pub fn with_override(mut self, mode: Mode, heat_setpoint: f64, cool_setpoint: f64) -> Self {
        self.mode = mode;
        self.heat_setpoint = heat_setpoint;
        self.cool_setpoint = cool_setpoint;
        self.hold_active = true;
        self.hold_temporary = true;
        self
    }

    fn perturb(&self, base: f64) -> f64 {
        if self.config.noise_amplitude_f <= 0.0 {
            return base;
        }
        let mut rng = rand::thread_rng();
        base + rng.gen_range(-self.config.noise_amplitude_f..=self.config.noise_amplitude_f)
    }
}

#[async_trait]
impl Zone for EmulatorZone {
    async fn display_temp(&mut self) -> Result<f64> {
        Ok(self.perturb(self.config.display_temp_base))
    }

    async fn display_humidity(&mut self) -> Result<Option<f64>> {
        Ok(Some(self.perturb(self.config.display_humidity_base)))
    }

    fn humidity_supported(&self) -> bool {
        true
    }

    async fn system_mode(&mut self) -> Result<Mode> {
        Ok(self.mode)
    }

    async fn heat_setpoint_raw(&mut self) -> Result<f64> {
        Ok(self.heat_setpoint)
    }

    async fn cool_setpoint_raw(&mut self) -> Result<f64> {
        Ok(self.cool_setpoint)
    }

    async fn schedule_heat_setpoint(&mut self) -> Result<f64> {
        Ok(self.config.schedule_heat_setpoint)
    }

    async fn schedule_cool_setpoint(&mut self) -> Result<f64> {
        Ok(self.config.schedule_cool_setpoint)
    }

    async fn is_in_vacation_hold(&mut self) -> Result<bool> {
        Ok(self.hold_active && !self.hold_temporary)
    }

    async fn temporary_hold_until_minutes(&mut self) -> Result<i64> {
        Ok(if self.hold_temporary { 60 } else { 0 })
    }

    fn zone_name(&self) -> String {
        format!("Emulator Zone {}", self.zone_id)
    }

    async fn set_heat_setpoint(&mut self, temp: f64) -> Result<()> {
        self.heat_setpoint = temp;
        Ok(())
    }

    async fn set_cool_setpoint(&mut self, temp: f64) -> Result<()> {
        self.cool_setpoint = temp;
        Ok(())
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.mode = mode;
        Ok(())
    }

    async fn schedule_program_heat(&mut self) -> Result<()> {
        self.heat_setpoint = self.config.schedule_heat_setpoint;
        self.hold_active = false;
        self.hold_temporary = false;
        Ok(())
    }

    async fn schedule_program_cool(&mut self) -> Result<()> {
        self.cool_setpoint = self.config.schedule_cool_setpoint;
        self.hold_active = false;
        self.hold_temporary = false;
        Ok(())
    }

    async fn refresh_zone_info(&mut self, force: bool) -> Result<()> {
        let stale = self.last_fetch.map_or(true, |t| {
            t.elapsed() >= Duration::from_secs(self.config.fetch_interval_sec)
        });
        if force || stale {
            self.last_fetch = Some(Instant::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heat_override_reverts_to_schedule_on_set() {
        let mut zone = EmulatorZone::new("0".into(), EmulatorConfig::default())
            .with_override(Mode::Heat, 74.0, 72.0);
        assert_eq!(zone.heat_setpoint_raw().await.unwrap(), 74.0);
        zone.set_heat_setpoint(70.0).await.unwrap();
        assert_eq!(zone.heat_setpoint_raw().await.unwrap(), 70.0);
    }

    #[tokio::test]
    async fn display_temp_stays_within_noise_amplitude() {
        let config = EmulatorConfig {
            noise_amplitude_f: 1.0,
            display_temp_base: 70.0,
            ..Default::default()
        };
        let mut zone = EmulatorZone::new("0".into(), config);
        for _ in 0..50 {
            let t = zone.display_temp().await.unwrap();
            assert!((68.9..=71.1).contains(&t), "t={t} out of expected band");
        }
    }

    #[tokio::test]
    async fn schedule_program_clears_hold() {
        let mut zone = EmulatorZone::new("0".into(), EmulatorConfig::default())
            .with_override(Mode::Heat, 74.0, 72.0);
        assert!(zone.is_in_vacation_hold().await.unwrap() == false);
        assert_eq!(zone.temporary_hold_until_minutes().await.unwrap(), 60);
        zone.schedule_program_heat().await.unwrap();
        assert_eq!(zone.temporary_hold_until_minutes().await.unwrap(), 0);
        assert_eq!(
            zone.heat_setpoint_raw().await.unwrap(),
            EmulatorConfig::default().schedule_heat_setpoint
        );
    }
}
