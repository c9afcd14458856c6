//! Read-only environment sensor family, grounded on
//! `original_source/sht31.py` / `sht31_config.py`: a local HTTP endpoint
//! exposing aggregate statistics (`mean`/`std`) over a rolling measurement
//! window rather than an instantaneous reading. No setpoints, no mode
//! control — `supported_modes` is `[Mode::Off]` and every write capability
//! returns `NotSupported`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{Result, ThermostatError};
use crate::mode::Mode;
use crate::thermostat::{Thermostat, Zone};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Measurements {
    #[serde(rename = "Temp(F) mean")]
    temp_f_mean: f64,
    #[serde(rename = "Humidity(%RH) mean")]
    humidity_rh_mean: f64,
}

#[derive(Debug, Deserialize)]
struct Sht31Payload {
    measurements: Measurements,
}

pub struct Sht31Thermostat {
    remote_ip: String,
    client: reqwest::Client,
}

impl Sht31Thermostat {
    pub fn new(remote_ip: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("reqwest client builder with a fixed timeout cannot fail");
        Self { remote_ip, client }
    }
}

pub(crate) fn construct(credentials: &Credentials, zone_id: &str) -> Result<Box<dyn Thermostat>> {
    let remote_ip = credentials.require("SHT31_REMOTE_IP_ADDRESS_", zone_id)?;
    Ok(Box::new(Sht31Thermostat::new(remote_ip.to_string())))
}

#[async_trait]
impl Thermostat for Sht31Thermostat {
    async fn open_zone(&self, zone_id: &str) -> Result<Box<dyn Zone>> {
        Ok(Box::new(Sht31Zone {
            zone_id: zone_id.to_string(),
            remote_ip: self.remote_ip.clone(),
            client: self.client.clone(),
            cache: None,
        }))
    }
}

pub struct Sht31Zone {
    zone_id: String,
    remote_ip: String,
    client: reqwest::Client,
    cache: Option<Sht31Payload>,
}

fn not_supported(capability: &'static str) -> ThermostatError {
    ThermostatError::NotSupported { thermostat_type: "sht31".into(), capability: capability.into() }
}

#[async_trait]
impl Zone for Sht31Zone {
    async fn display_temp(&mut self) -> Result<f64> {
        Ok(self
            .cache
            .as_ref()
            .ok_or_else(|| ThermostatError::ProtocolError {
                zone_id: self.zone_id.clone(),
                message: "zone info has not been fetched yet".into(),
            })?
            .measurements
            .temp_f_mean)
    }

    async fn display_humidity(&mut self) -> Result<Option<f64>> {
        Ok(Some(
            self.cache
                .as_ref()
                .ok_or_else(|| ThermostatError::ProtocolError {
                    zone_id: self.zone_id.clone(),
                    message: "zone info has not been fetched yet".into(),
                })?
                .measurements
                .humidity_rh_mean,
        ))
    }

    fn humidity_supported(&self) -> bool {
        true
    }

    async fn system_mode(&mut self) -> Result<Mode> {
        Ok(Mode::Off)
    }

    async fn heat_setpoint_raw(&mut self) -> Result<f64> {
        Err(not_supported("heat_setpoint_raw"))
    }

    async fn cool_setpoint_raw(&mut self) -> Result<f64> {
        Err(not_supported("cool_setpoint_raw"))
    }

    async fn schedule_heat_setpoint(&mut self) -> Result<f64> {
        Err(not_supported("schedule_heat_setpoint"))
    }

    async fn schedule_cool_setpoint(&mut self) -> Result<f64> {
        Err(not_supported("schedule_cool_setpoint"))
    }

    async fn is_in_vacation_hold(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn temporary_hold_until_minutes(&mut self) -> Result<i64> {
        Ok(0)
    }

    fn zone_name(&self) -> String {
        format!("SHT31 sensor {} @ {}", self.zone_id, self.remote_ip)
    }

    async fn set_heat_setpoint(&mut self, _temp: f64) -> Result<()> {
        Err(not_supported("set_heat_setpoint"))
    }

    async fn set_cool_setpoint(&mut self, _temp: f64) -> Result<()> {
        Err(not_supported("set_cool_setpoint"))
    }

    async fn set_mode(&mut self, _mode: Mode) -> Result<()> {
        Err(not_supported("set_mode"))
    }

    async fn schedule_program_heat(&mut self) -> Result<()> {
        Err(not_supported("schedule_program_heat"))
    }

    async fn schedule_program_cool(&mut self) -> Result<()> {
        Err(not_supported("schedule_program_cool"))
    }

    async fn refresh_zone_info(&mut self, _force: bool) -> Result<()> {
        let url = format!("http://{}/measurements", self.remote_ip);
        let response = self.client.get(&url).send().await?;
        if response.status().is_server_error() {
            return Err(ThermostatError::TransientNetwork {
                zone_id: self.zone_id.clone(),
                message: format!("HTTP {} from {}", response.status(), url),
            });
        }
        let payload = response.json::<Sht31Payload>().await.map_err(|e| ThermostatError::TransientNetwork {
            zone_id: self.zone_id.clone(),
            message: format!("decode failure: {e}"),
        })?;
        self.cache = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_fails_without_zone_indexed_ip() {
        let credentials = Credentials::default();
        let err = construct(&credentials, "1").unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn write_capabilities_are_not_supported() {
        let thermostat = Sht31Thermostat::new("192.168.1.50".into());
        let mut zone = thermostat.open_zone("1").await.unwrap();
        let err = zone.set_mode(Mode::Heat).await.unwrap_err();
        assert_eq!(err.kind_tag(), "not_supported");
    }
}
