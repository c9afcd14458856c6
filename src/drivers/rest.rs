//! Generic cloud/LAN REST driver covering every family whose wire protocol
//! is treated as an external collaborator: `honeywell`, `kumocloud`, `kumolocal`,
//! `mmm50`, `blink`, `nest`. Each speaks the same small JSON contract —
//! a `GET {base_url}/zone/{id}` returning the fields the [`crate::thermostat::Zone`]
//! capabilities need, and a `POST {base_url}/zone/{id}/setpoint|mode` to
//! write them — leaving brand-specific session/auth handling as the
//! documented extension point [`RestThermostat::with_client`].

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::credentials::Credentials;
use crate::error::{Result, ThermostatError};
use crate::mode::Mode;
use crate::thermostat::{Thermostat, Zone};
use crate::thermostat_type::ThermostatType;

/// HTTP timeout for cloud-style REST drivers.
const REST_TIMEOUT: Duration = Duration::from_millis(2_500);
/// HTTP timeout for LAN-local mini-split drivers, whose socket responses
/// run slower.
const LAN_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Deserialize)]
struct ZonePayload {
    display_temp: f64,
    display_humidity: Option<f64>,
    mode: String,
    heat_setpoint: Option<f64>,
    cool_setpoint: Option<f64>,
    schedule_heat_setpoint: Option<f64>,
    schedule_cool_setpoint: Option<f64>,
    vacation_hold: bool,
    temporary_hold_minutes: i64,
    zone_name: Option<String>,
}

fn parse_mode(raw: &str) -> Mode {
    match raw.to_ascii_lowercase().as_str() {
        "off" => Mode::Off,
        "heat" => Mode::Heat,
        "cool" => Mode::Cool,
        "auto" => Mode::Auto,
        "dry" => Mode::Dry,
        "fan" => Mode::Fan,
        _ => Mode::Unknown,
    }
}

pub struct RestThermostat {
    thermostat_type: ThermostatType,
    base_url: String,
    client: reqwest::Client,
}

impl RestThermostat {
    pub fn new(thermostat_type: ThermostatType, base_url: String) -> Self {
        let timeout = match thermostat_type {
            ThermostatType::KumoLocal | ThermostatType::Mmm50 => LAN_TIMEOUT,
            _ => REST_TIMEOUT,
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder with a fixed timeout cannot fail");
        Self { thermostat_type, base_url, client }
    }

    /// Extension point for brand-specific session handling (cookies, OAuth)
    /// — supply a pre-configured client instead of the default one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Thermostat for RestThermostat {
    async fn open_zone(&self, zone_id: &str) -> Result<Box<dyn Zone>> {
        Ok(Box::new(RestZone {
            thermostat_type: self.thermostat_type,
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            zone_id: zone_id.to_string(),
            cache: None,
            fetch_interval: Duration::from_secs(60),
        }))
    }
}

fn base_url_for(thermostat_type: ThermostatType, credentials: &Credentials, zone_id: &str) -> String {
    let env_key = format!("{}_BASE_URL", thermostat_type.to_string().to_uppercase());
    credentials
        .get(&env_key)
        .map(str::to_string)
        .unwrap_or_else(|| format!("http://{}.invalid/{}", thermostat_type, zone_id))
}

macro_rules! rest_constructor {
    ($name:ident, $variant:ident) => {
        pub(crate) fn $name(credentials: &Credentials, zone_id: &str) -> Result<Box<dyn Thermostat>> {
            let base_url = base_url_for(ThermostatType::$variant, credentials, zone_id);
            Ok(Box::new(RestThermostat::new(ThermostatType::$variant, base_url)))
        }
    };
}

rest_constructor!(construct_honeywell, Honeywell);
rest_constructor!(construct_kumocloud, KumoCloud);
rest_constructor!(construct_kumolocal, KumoLocal);
rest_constructor!(construct_mmm50, Mmm50);
rest_constructor!(construct_blink, Blink);
rest_constructor!(construct_nest, Nest);

pub struct RestZone {
    thermostat_type: ThermostatType,
    base_url: String,
    client: reqwest::Client,
    zone_id: String,
    cache: Option<(ZonePayload, Instant)>,
    fetch_interval: Duration,
}

impl RestZone {
    fn require_cache(&self) -> Result<&ZonePayload> {
        self.cache.as_ref().map(|(p, _)| p).ok_or_else(|| ThermostatError::ProtocolError {
            zone_id: self.zone_id.clone(),
            message: "zone info has not been fetched yet".into(),
        })
    }

    async fn fetch(&self) -> Result<ZonePayload> {
        let url = format!("{}/zone/{}", self.base_url, self.zone_id);
        let response = self.client.get(&url).send().await?;
        if response.status().is_server_error() || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ThermostatError::TransientNetwork {
                zone_id: self.zone_id.clone(),
                message: format!("HTTP {} from {}", response.status(), url),
            });
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ThermostatError::AuthError {
                zone_id: self.zone_id.clone(),
                message: format!("HTTP {} from {}", response.status(), url),
            });
        }
        response.json::<ZonePayload>().await.map_err(|e| ThermostatError::TransientNetwork {
            zone_id: self.zone_id.clone(),
            message: format!("decode failure: {e}"),
        })
    }
}

#[async_trait]
impl Zone for RestZone {
    async fn display_temp(&mut self) -> Result<f64> {
        Ok(self.require_cache()?.display_temp)
    }

    async fn display_humidity(&mut self) -> Result<Option<f64>> {
        Ok(self.require_cache()?.display_humidity)
    }

    fn humidity_supported(&self) -> bool {
        self.cache.as_ref().map(|(p, _)| p.display_humidity.is_some()).unwrap_or(false)
    }

    async fn system_mode(&mut self) -> Result<Mode> {
        Ok(parse_mode(&self.require_cache()?.mode))
    }

    async fn heat_setpoint_raw(&mut self) -> Result<f64> {
        self.require_cache()?.heat_setpoint.ok_or_else(|| ThermostatError::NotSupported {
            thermostat_type: self.thermostat_type.to_string(),
            capability: "heat_setpoint_raw".into(),
        })
    }

    async fn cool_setpoint_raw(&mut self) -> Result<f64> {
        self.require_cache()?.cool_setpoint.ok_or_else(|| ThermostatError::NotSupported {
            thermostat_type: self.thermostat_type.to_string(),
            capability: "cool_setpoint_raw".into(),
        })
    }

    async fn schedule_heat_setpoint(&mut self) -> Result<f64> {
        self.require_cache()?.schedule_heat_setpoint.ok_or_else(|| ThermostatError::NotSupported {
            thermostat_type: self.thermostat_type.to_string(),
            capability: "schedule_heat_setpoint".into(),
        })
    }

    async fn schedule_cool_setpoint(&mut self) -> Result<f64> {
        self.require_cache()?.schedule_cool_setpoint.ok_or_else(|| ThermostatError::NotSupported {
            thermostat_type: self.thermostat_type.to_string(),
            capability: "schedule_cool_setpoint".into(),
        })
    }

    async fn is_in_vacation_hold(&mut self) -> Result<bool> {
        Ok(self.require_cache()?.vacation_hold)
    }

    async fn temporary_hold_until_minutes(&mut self) -> Result<i64> {
        Ok(self.require_cache()?.temporary_hold_minutes)
    }

    fn zone_name(&self) -> String {
        self.cache
            .as_ref()
            .and_then(|(p, _)| p.zone_name.clone())
            .unwrap_or_else(|| format!("{} zone {}", self.thermostat_type, self.zone_id))
    }

    async fn set_heat_setpoint(&mut self, temp: f64) -> Result<()> {
        let url = format!("{}/zone/{}/setpoint", self.base_url, self.zone_id);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "heat_setpoint": temp }))
            .send()
            .await?
            .error_for_status()
            .map_err(ThermostatError::from)?;
        self.refresh_zone_info(true).await
    }

    async fn set_cool_setpoint(&mut self, temp: f64) -> Result<()> {
        let url = format!("{}/zone/{}/setpoint", self.base_url, self.zone_id);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "cool_setpoint": temp }))
            .send()
            .await?
            .error_for_status()
            .map_err(ThermostatError::from)?;
        self.refresh_zone_info(true).await
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let url = format!("{}/zone/{}/mode", self.base_url, self.zone_id);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "mode": mode.to_string() }))
            .send()
            .await?
            .error_for_status()
            .map_err(ThermostatError::from)?;
        self.refresh_zone_info(true).await
    }

    async fn schedule_program_heat(&mut self) -> Result<()> {
        let url = format!("{}/zone/{}/schedule_program", self.base_url, self.zone_id);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "capability": "heat" }))
            .send()
            .await?
            .error_for_status()
            .map_err(ThermostatError::from)?;
        self.refresh_zone_info(true).await
    }

    async fn schedule_program_cool(&mut self) -> Result<()> {
        let url = format!("{}/zone/{}/schedule_program", self.base_url, self.zone_id);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "capability": "cool" }))
            .send()
            .await?
            .error_for_status()
            .map_err(ThermostatError::from)?;
        self.refresh_zone_info(true).await
    }

    async fn refresh_zone_info(&mut self, force: bool) -> Result<()> {
        let stale = self.cache.as_ref().map_or(true, |(_, fetched_at)| fetched_at.elapsed() >= self.fetch_interval);
        if !force && !stale {
            return Ok(());
        }
        let payload = self.fetch().await?;
        self.cache = Some((payload, Instant::now()));
        Ok(())
    }
}
