//! The capability-typed driver interface every vendor driver implements.
//! A `Thermostat` is a connection to one device family; it opens `Zone`s,
//! each an independently controlled channel.

use async_trait::async_trait;

use crate::error::Result;
use crate::mode::Mode;

/// One reading/decision cycle's worth of zone state, as produced by the
/// supervisor loop at the end of a poll.
#[derive(Debug, Clone)]
pub struct Observation {
    pub zone_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub display_temp: f64,
    pub display_humidity: Option<f64>,
    pub mode: Mode,
    /// `None` when `mode` is not a controlled mode, or the driver reports
    /// `NotSupported` for the setpoint capability.
    pub current_setpoint: Option<f64>,
    pub schedule_setpoint: Option<f64>,
    pub temperature_is_deviated: bool,
    pub hold_active: bool,
    pub hold_temporary: bool,
    pub status_message: String,
}

/// A connection to one thermostat device/account; opens zones on it.
#[async_trait]
pub trait Thermostat: Send + Sync {
    /// Open the zone identified by `zone_id` on this connection.
    async fn open_zone(&self, zone_id: &str) -> Result<Box<dyn Zone>>;
}

/// One independently-controlled thermostat channel.
///
/// Every capability either succeeds or returns a typed
/// [`crate::error::ThermostatError`] — `NotSupported` when the family
/// simply does not have the capability, never a silently-defaulted value.
#[async_trait]
pub trait Zone: Send + Sync {
    // --- reads ---

    async fn display_temp(&mut self) -> Result<f64>;

    /// `Ok(None)` when humidity is not reported by this family; use
    /// [`Zone::humidity_supported`] to distinguish "not supported" from
    /// "supported but momentarily unavailable" in logs.
    async fn display_humidity(&mut self) -> Result<Option<f64>>;

    fn humidity_supported(&self) -> bool;

    async fn system_mode(&mut self) -> Result<Mode>;

    async fn heat_setpoint_raw(&mut self) -> Result<f64>;

    async fn cool_setpoint_raw(&mut self) -> Result<f64>;

    async fn schedule_heat_setpoint(&mut self) -> Result<f64>;

    async fn schedule_cool_setpoint(&mut self) -> Result<f64>;

    async fn is_in_vacation_hold(&mut self) -> Result<bool>;

    /// Minutes remaining on a temporary hold, if one is active.
    async fn temporary_hold_until_minutes(&mut self) -> Result<i64>;

    fn zone_name(&self) -> String;

    // --- writes ---

    async fn set_heat_setpoint(&mut self, temp: f64) -> Result<()>;

    async fn set_cool_setpoint(&mut self, temp: f64) -> Result<()>;

    async fn set_mode(&mut self, mode: Mode) -> Result<()>;

    /// Clear any hold and return heat control to the device's own schedule.
    async fn schedule_program_heat(&mut self) -> Result<()>;

    /// Clear any hold and return cool control to the device's own schedule.
    async fn schedule_program_cool(&mut self) -> Result<()>;

    // --- control ---

    /// Refresh the cached device snapshot. A no-op if the cache is still
    /// fresh relative to the zone's fetch interval, unless `force` is set.
    async fn refresh_zone_info(&mut self, force: bool) -> Result<()>;
}
