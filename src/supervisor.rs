//! Per-zone supervisor loop, grounded line-for-line on
//! `original_source/Supervise.py`'s connect/poll nested loops. One
//! `tokio::task` per zone; `LoopState` mirrors that connect/poll/reconnect
//! shape one for one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alert::AlertSink;
use crate::config::SupervisorConfig;
use crate::credentials::Credentials;
use crate::error::ThermostatError;
use crate::mode::Mode;
use crate::policy::{self, RevertCapability};
use crate::registry::DriverRegistry;
use crate::retry::execute_with_retries;
use crate::thermostat::Observation;

/// Private loop state, matching the connect/poll/reconnect shape one for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Init,
    Connected,
    Polling,
    Reconnect,
    ConnectionFailed,
    Done,
}

/// Terminal result of a zone's supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// The configured poll count ceiling was reached.
    BoundedCompletion { polls: u64 },
    /// `AuthError`, either from credential verification or a capability call.
    FatalAuthError { polls: u64 },
    /// The orchestrator's stop flag was observed at a sleep boundary.
    StoppedByRequest { polls: u64 },
}

impl ZoneOutcome {
    pub fn poll_count(&self) -> u64 {
        match self {
            ZoneOutcome::BoundedCompletion { polls }
            | ZoneOutcome::FatalAuthError { polls }
            | ZoneOutcome::StoppedByRequest { polls } => *polls,
        }
    }
}

/// Run one zone's supervisor loop to completion: connect → poll → detect →
/// revert → sleep → reconnect.
pub async fn run_supervisor_loop(
    config: &SupervisorConfig,
    credentials: &Credentials,
    registry: &DriverRegistry,
    alert_sink: &dyn AlertSink,
    stop: &Arc<AtomicBool>,
) -> ZoneOutcome {
    let mut state = LoopState::Init;
    let mut total_polls: u64 = 0;
    let mut cached_target_mode = config.target_mode;

    loop {
        match state {
            LoopState::Init => {
                let Ok(thermostat_type) = config.thermostat_type() else {
                    return ZoneOutcome::FatalAuthError { polls: total_polls };
                };
                if let Err(err) = registry.verify_required_credentials(thermostat_type, &config.zone_id, credentials) {
                    log::error!("zone {} failed credential check: {err}", config.zone_id);
                    alert_sink
                        .send_alert(
                            &format!("[fatal] zone {} credential check", config.zone_id),
                            &err.to_string(),
                        )
                        .await;
                    return ZoneOutcome::FatalAuthError { polls: total_polls };
                }

                let entry = match registry.get(thermostat_type) {
                    Some(e) => e,
                    None => return ZoneOutcome::FatalAuthError { polls: total_polls },
                };
                let thermostat = match entry.construct(credentials, &config.zone_id) {
                    Ok(t) => t,
                    Err(err) => {
                        log::error!("zone {} driver construction failed: {err}", config.zone_id);
                        return ZoneOutcome::FatalAuthError { polls: total_polls };
                    }
                };
                let mut zone = match thermostat.open_zone(&config.zone_id).await {
                    Ok(z) => z,
                    Err(err) if err.is_fatal() => return ZoneOutcome::FatalAuthError { polls: total_polls },
                    Err(_) => {
                        state = LoopState::Reconnect;
                        continue;
                    }
                };

                let epoch_start = Instant::now();
                let mut previous_mode: Option<Mode> = None;
                let mut policy_violation_alerted = false;
                let mut protocol_error_alerted = false;
                state = LoopState::Connected;

                'epoch: loop {
                    let refresh_result = execute_with_retries(
                        &config.zone_id,
                        "refresh_zone_info",
                        config.retry_max_attempts,
                        Duration::from_secs(config.retry_delay_sec),
                        alert_sink,
                        || zone.refresh_zone_info(false),
                    )
                    .await;

                    match refresh_result {
                        Ok(()) => {}
                        Err(err) if err.is_fatal() => {
                            state = LoopState::ConnectionFailed;
                            break 'epoch;
                        }
                        Err(_) => {
                            state = LoopState::Reconnect;
                            break 'epoch;
                        }
                    }

                    let observation = match build_observation(config, zone.as_mut()).await {
                        Ok(obs) => obs,
                        Err(err) if err.is_fatal() => {
                            state = LoopState::ConnectionFailed;
                            break 'epoch;
                        }
                        Err(err) => {
                            if !protocol_error_alerted {
                                alert_sink
                                    .send_alert(&format!("[protocol] zone {} mode unreadable", config.zone_id), &err.to_string())
                                    .await;
                                protocol_error_alerted = true;
                            }
                            total_polls += 1;
                            if should_stop(config, total_polls, epoch_start, stop) {
                                break;
                            }
                            tokio::select! {
                                _ = tokio::time::sleep(Duration::from_secs(config.poll_interval_sec)) => {}
                            }
                            continue;
                        }
                    };

                    if previous_mode != Some(observation.mode) {
                        log::info!("zone {} mode changed to {}", config.zone_id, observation.mode);
                        previous_mode = Some(observation.mode);
                    }

                    // Safe mode-transition rule fires before deviation correction (tie-break).
                    if let Some(target) = cached_target_mode {
                        if observation.mode != target && observation.mode != Mode::Unknown {
                            let safe_mode = policy::safe_target_mode(observation.mode, target);
                            if let Err(err) =
                                execute_with_retries(&config.zone_id, "set_mode", config.retry_max_attempts, Duration::from_secs(config.retry_delay_sec), alert_sink, || {
                                    zone.set_mode(safe_mode)
                                })
                                .await
                            {
                                if err.is_fatal() {
                                    state = LoopState::ConnectionFailed;
                                    break 'epoch;
                                }
                            }
                            cached_target_mode = Some(target);
                        }
                    }

                    if observation.mode == Mode::Unknown {
                        if !protocol_error_alerted {
                            alert_sink
                                .send_alert(
                                    &format!("[protocol] zone {} reported an unrecognized mode", config.zone_id),
                                    "no reversion attempted; driver reported a mode outside the known set",
                                )
                                .await;
                            protocol_error_alerted = true;
                        }
                    } else if let Some(current_setpoint) = observation.current_setpoint {
                        let policy_state = policy::policy_for(
                            observation.mode,
                            config.flag_all_deviations,
                            config.max_scheduled_heat_allowed,
                            config.min_scheduled_cool_allowed,
                        );
                        let schedule_setpoint = observation.schedule_setpoint.unwrap_or(current_setpoint);

                        if !policy_violation_alerted && policy::global_limit_violated(&policy_state, schedule_setpoint) {
                            alert_sink
                                .send_alert(
                                    &format!("[policy] zone {} schedule outside limits", config.zone_id),
                                    &format!("schedule setpoint {schedule_setpoint} is outside the configured global limit"),
                                )
                                .await;
                            policy_violation_alerted = true;
                        }

                        let should_check = config.flag_all_deviations || observation.mode.is_controlled_mode();
                        if should_check
                            && policy::is_deviated(
                                &policy_state,
                                current_setpoint,
                                schedule_setpoint,
                                config.tolerance,
                                config.flag_all_deviations,
                            )
                        {
                            alert_sink
                                .send_alert(
                                    &format!("[deviation] {} deviation on zone {}", observation.mode, config.zone_id),
                                    &format!("current {current_setpoint} vs schedule {schedule_setpoint}"),
                                )
                                .await;

                            let revert_result = match policy_state.revert_setpoint_fn {
                                RevertCapability::SetHeatSetpoint => {
                                    Some(execute_with_retries(&config.zone_id, "set_heat_setpoint", config.retry_max_attempts, Duration::from_secs(config.retry_delay_sec), alert_sink, || {
                                        zone.set_heat_setpoint(schedule_setpoint)
                                    })
                                    .await)
                                }
                                RevertCapability::SetCoolSetpoint => {
                                    Some(execute_with_retries(&config.zone_id, "set_cool_setpoint", config.retry_max_attempts, Duration::from_secs(config.retry_delay_sec), alert_sink, || {
                                        zone.set_cool_setpoint(schedule_setpoint)
                                    })
                                    .await)
                                }
                                RevertCapability::None => None,
                            };
                            if let Some(Err(err)) = revert_result {
                                if err.is_fatal() {
                                    state = LoopState::ConnectionFailed;
                                    break 'epoch;
                                }
                            }
                        }
                    }

                    total_polls += 1;
                    if let Some(limit) = config.measurement_limit {
                        if total_polls > limit {
                            state = LoopState::Done;
                            break 'epoch;
                        }
                    }
                    if epoch_start.elapsed() > Duration::from_secs(config.reconnect_interval_sec) {
                        state = LoopState::Reconnect;
                        break 'epoch;
                    }
                    if stop.load(Ordering::SeqCst) {
                        return ZoneOutcome::StoppedByRequest { polls: total_polls };
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(config.poll_interval_sec)) => {}
                    }
                    if stop.load(Ordering::SeqCst) {
                        return ZoneOutcome::StoppedByRequest { polls: total_polls };
                    }
                }
            }
            LoopState::Reconnect => {
                state = LoopState::Init;
            }
            LoopState::ConnectionFailed => {
                return ZoneOutcome::FatalAuthError { polls: total_polls };
            }
            LoopState::Done => {
                return ZoneOutcome::BoundedCompletion { polls: total_polls };
            }
            LoopState::Connected | LoopState::Polling => unreachable!("handled inline within Init's epoch loop"),
        }
    }
}

fn should_stop(config: &SupervisorConfig, polls: u64, epoch_start: Instant, stop: &Arc<AtomicBool>) -> bool {
    config.measurement_limit.map(|l| polls > l).unwrap_or(false)
        || epoch_start.elapsed() > Duration::from_secs(config.reconnect_interval_sec)
        || stop.load(Ordering::SeqCst)
}

async fn build_observation(
    config: &SupervisorConfig,
    zone: &mut dyn crate::thermostat::Zone,
) -> Result<Observation, ThermostatError> {
    let display_temp = zone.display_temp().await?;
    let display_humidity = zone.display_humidity().await.ok().flatten();
    let mode = zone.system_mode().await?;

    let current_setpoint = match mode {
        Mode::Heat => zone.heat_setpoint_raw().await.ok(),
        Mode::Cool | Mode::Dry => zone.cool_setpoint_raw().await.ok(),
        _ => None,
    };
    let schedule_setpoint = match mode {
        Mode::Heat => zone.schedule_heat_setpoint().await.ok(),
        Mode::Cool | Mode::Dry => zone.schedule_cool_setpoint().await.ok(),
        _ => None,
    };

    let hold_active = zone.is_in_vacation_hold().await.unwrap_or(false);
    let hold_temporary = zone.temporary_hold_until_minutes().await.unwrap_or(0) > 0;

    let temperature_is_deviated = match (current_setpoint, schedule_setpoint) {
        (Some(current), Some(schedule)) if mode.is_controlled_mode() => {
            let policy_state = policy::policy_for(mode, config.flag_all_deviations, config.max_scheduled_heat_allowed, config.min_scheduled_cool_allowed);
            policy::is_deviated(&policy_state, current, schedule, config.tolerance, config.flag_all_deviations)
        }
        _ => false,
    };

    Ok(Observation {
        zone_id: config.zone_id.clone(),
        timestamp: chrono::Utc::now(),
        display_temp,
        display_humidity,
        mode,
        current_setpoint,
        schedule_setpoint,
        temperature_is_deviated,
        hold_active,
        hold_temporary,
        status_message: zone.zone_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::NullAlertSink;
    use crate::config::SupervisorConfig;
    use crate::registry::{DriverEntry, DriverRegistry};
    use crate::thermostat_type::ThermostatType;

    /// Fake driver reporting a mode outside the known set, for the
    /// unknown-mode alert test below. No family's wire format produces this
    /// in practice; `rest::parse_mode` already falls back to `Mode::Unknown`
    /// for an unrecognized vendor string.
    struct UnknownModeZone;

    #[async_trait::async_trait]
    impl crate::thermostat::Zone for UnknownModeZone {
        async fn display_temp(&mut self) -> crate::error::Result<f64> {
            Ok(70.0)
        }
        async fn display_humidity(&mut self) -> crate::error::Result<Option<f64>> {
            Ok(None)
        }
        fn humidity_supported(&self) -> bool {
            false
        }
        async fn system_mode(&mut self) -> crate::error::Result<Mode> {
            Ok(Mode::Unknown)
        }
        async fn heat_setpoint_raw(&mut self) -> crate::error::Result<f64> {
            Ok(70.0)
        }
        async fn cool_setpoint_raw(&mut self) -> crate::error::Result<f64> {
            Ok(72.0)
        }
        async fn schedule_heat_setpoint(&mut self) -> crate::error::Result<f64> {
            Ok(70.0)
        }
        async fn schedule_cool_setpoint(&mut self) -> crate::error::Result<f64> {
            Ok(72.0)
        }
        async fn is_in_vacation_hold(&mut self) -> crate::error::Result<bool> {
            Ok(false)
        }
        async fn temporary_hold_until_minutes(&mut self) -> crate::error::Result<i64> {
            Ok(0)
        }
        fn zone_name(&self) -> String {
            "unknown-mode-zone".into()
        }
        async fn set_heat_setpoint(&mut self, _temp: f64) -> crate::error::Result<()> {
            Ok(())
        }
        async fn set_cool_setpoint(&mut self, _temp: f64) -> crate::error::Result<()> {
            Ok(())
        }
        async fn set_mode(&mut self, _mode: Mode) -> crate::error::Result<()> {
            Ok(())
        }
        async fn schedule_program_heat(&mut self) -> crate::error::Result<()> {
            Ok(())
        }
        async fn schedule_program_cool(&mut self) -> crate::error::Result<()> {
            Ok(())
        }
        async fn refresh_zone_info(&mut self, _force: bool) -> crate::error::Result<()> {
            Ok(())
        }
    }

    struct UnknownModeThermostat;

    #[async_trait::async_trait]
    impl crate::thermostat::Thermostat for UnknownModeThermostat {
        async fn open_zone(&self, _zone_id: &str) -> crate::error::Result<Box<dyn crate::thermostat::Zone>> {
            Ok(Box::new(UnknownModeZone))
        }
    }

    fn construct_unknown_mode(
        _credentials: &Credentials,
        _zone_id: &str,
    ) -> crate::error::Result<Box<dyn crate::thermostat::Thermostat>> {
        Ok(Box::new(UnknownModeThermostat))
    }

    fn base_config() -> SupervisorConfig {
        SupervisorConfig {
            thermostat_type: "emulator".into(),
            zone_id: "0".into(),
            poll_interval_sec: 0,
            reconnect_interval_sec: 3_600,
            tolerance: 2.0,
            target_mode: None,
            measurement_limit: Some(2),
            flag_all_deviations: false,
            max_scheduled_heat_allowed: 74.0,
            min_scheduled_cool_allowed: 68.0,
            retry_max_attempts: 1,
            retry_delay_sec: 0,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn bounded_run_completes_after_measurement_limit() {
        let registry = DriverRegistry::with_defaults();
        let credentials = Credentials::default();
        let sink = NullAlertSink;
        let stop = Arc::new(AtomicBool::new(false));
        let outcome = run_supervisor_loop(&base_config(), &credentials, &registry, &sink, &stop).await;
        assert_eq!(outcome, ZoneOutcome::BoundedCompletion { polls: 3 });
    }

    #[tokio::test]
    async fn unknown_thermostat_type_is_fatal() {
        let mut config = base_config();
        config.thermostat_type = "bogus".into();
        let registry = DriverRegistry::with_defaults();
        let credentials = Credentials::default();
        let sink = NullAlertSink;
        let stop = Arc::new(AtomicBool::new(false));
        let outcome = run_supervisor_loop(&config, &credentials, &registry, &sink, &stop).await;
        assert_eq!(outcome, ZoneOutcome::FatalAuthError { polls: 0 });
    }

    #[tokio::test]
    async fn missing_credentials_is_fatal_before_any_poll() {
        let mut config = base_config();
        config.thermostat_type = "honeywell".into();
        let registry = DriverRegistry::with_defaults();
        let credentials = Credentials::default();
        let sink = NullAlertSink;
        let stop = Arc::new(AtomicBool::new(false));
        let outcome = run_supervisor_loop(&config, &credentials, &registry, &sink, &stop).await;
        assert_eq!(outcome, ZoneOutcome::FatalAuthError { polls: 0 });
    }

    #[tokio::test]
    async fn unknown_mode_emits_exactly_one_protocol_alert_per_epoch() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingSink {
            count: AtomicU32,
        }

        #[async_trait::async_trait]
        impl crate::alert::AlertSink for CountingSink {
            async fn send_alert(&self, subject: &str, _body: &str) -> crate::alert::AlertErrorCode {
                assert!(subject.contains("[protocol]"), "unexpected alert: {subject}");
                self.count.fetch_add(1, Ordering::SeqCst);
                crate::alert::AlertErrorCode::Ok
            }
        }

        let entry = DriverEntry::for_test(ThermostatType::Emulator, construct_unknown_mode);
        let registry = DriverRegistry::for_test(ThermostatType::Emulator, entry);
        let config = base_config();
        let credentials = Credentials::default();
        let sink = CountingSink { count: AtomicU32::new(0) };
        let stop = Arc::new(AtomicBool::new(false));

        let outcome = run_supervisor_loop(&config, &credentials, &registry, &sink, &stop).await;
        assert_eq!(outcome, ZoneOutcome::BoundedCompletion { polls: 3 });
        assert_eq!(
            sink.count.load(Ordering::SeqCst),
            1,
            "alert should fire once per epoch, not once per poll"
        );
    }
}
