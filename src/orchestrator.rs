//! Multi-zone site orchestrator, grounded on `fleet.rs`'s
//! `FleetManager` — generalized from hosts to zones: one shared,
//! mutex-guarded result map, one task per zone, joined before the
//! aggregated snapshot is returned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::alert::AlertSink;
use crate::config::SiteConfig;
use crate::registry::DriverRegistry;
use crate::supervisor::{run_supervisor_loop, ZoneOutcome};
use crate::Credentials;

/// One zone's result after its supervisor loop stops, the `Zone` analogue of
/// `fleet.rs`'s `HostSummary`.
#[derive(Debug, Clone)]
pub struct ZoneSummary {
    pub zone_id: String,
    pub thermostat_type: String,
    pub poll_count: u64,
    pub outcome: ZoneOutcome,
}

/// Aggregated result of `SuperviseAllZones`, the `Zone` analogue of
/// `fleet.rs`'s `FleetSnapshot`.
#[derive(Debug, Clone, Default)]
pub struct SiteSnapshot {
    pub zones: Vec<ZoneSummary>,
}

/// Owns a set of [`crate::config::SupervisorConfig`] entries and fans out
/// one supervisor task per enabled zone.
pub struct Orchestrator {
    site: SiteConfig,
    credentials: Credentials,
    registry: Arc<DriverRegistry>,
    alert_sink: Arc<dyn AlertSink>,
}

impl Orchestrator {
    pub fn new(site: SiteConfig, credentials: Credentials, alert_sink: Arc<dyn AlertSink>) -> Self {
        Self { site, credentials, registry: Arc::new(DriverRegistry::with_defaults()), alert_sink }
    }

    /// Print configured zones and enable/disable state.
    pub fn display_all_zones(&self) -> Vec<(String, String, bool)> {
        self.site
            .zones
            .iter()
            .map(|z| (z.thermostat_type.clone(), z.zone_id.clone(), z.enabled))
            .collect()
    }

    /// One-shot read of each enabled zone's display temperature.
    pub async fn display_all_temps(&self) -> HashMap<String, crate::error::Result<f64>> {
        let mut results = HashMap::new();
        for zone_config in self.site.zones.iter().filter(|z| z.enabled) {
            let reading = async {
                let thermostat_type = zone_config.thermostat_type().map_err(|e| {
                    crate::error::ThermostatError::InternalError(format!("{e}"))
                })?;
                self.registry.verify_required_credentials(thermostat_type, &zone_config.zone_id, &self.credentials)?;
                let entry = self.registry.get(thermostat_type).ok_or_else(|| {
                    crate::error::ThermostatError::InternalError(format!("no driver for {thermostat_type}"))
                })?;
                let thermostat = entry.construct(&self.credentials, &zone_config.zone_id)?;
                let mut zone = thermostat.open_zone(&zone_config.zone_id).await?;
                zone.refresh_zone_info(true).await?;
                zone.display_temp().await
            }
            .await;
            results.insert(zone_config.zone_id.clone(), reading);
        }
        results
    }

    /// Launch one supervisor loop per enabled zone. When `use_parallel` is
    /// true the loops run concurrently and each appends to a shared,
    /// single-mutex-guarded map as it finishes; otherwise zones run
    /// sequentially. Always joins every loop before returning.
    pub async fn supervise_all_zones(&self, measurement_limit_override: Option<u64>, use_parallel: bool, stop: Arc<AtomicBool>) -> SiteSnapshot {
        let results: Arc<Mutex<Vec<ZoneSummary>>> = Arc::new(Mutex::new(Vec::new()));
        let enabled: Vec<_> = self.site.zones.iter().filter(|z| z.enabled).cloned().collect();

        if use_parallel {
            let mut handles = Vec::new();
            for mut zone_config in enabled {
                if let Some(limit) = measurement_limit_override {
                    zone_config.measurement_limit = Some(limit);
                }
                let registry = self.registry.clone();
                let credentials = self.credentials.clone();
                let alert_sink = self.alert_sink.clone();
                let results = results.clone();
                let stop = stop.clone();
                handles.push(tokio::spawn(async move {
                    let outcome = run_supervisor_loop(&zone_config, &credentials, &registry, alert_sink.as_ref(), &stop).await;
                    let summary = ZoneSummary {
                        zone_id: zone_config.zone_id.clone(),
                        thermostat_type: zone_config.thermostat_type.clone(),
                        poll_count: outcome.poll_count(),
                        outcome,
                    };
                    results.lock().unwrap_or_else(|e| e.into_inner()).push(summary);
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }
        } else {
            for mut zone_config in enabled {
                if let Some(limit) = measurement_limit_override {
                    zone_config.measurement_limit = Some(limit);
                }
                let outcome =
                    run_supervisor_loop(&zone_config, &self.credentials, &self.registry, self.alert_sink.as_ref(), &stop).await;
                let summary = ZoneSummary {
                    zone_id: zone_config.zone_id.clone(),
                    thermostat_type: zone_config.thermostat_type.clone(),
                    poll_count: outcome.poll_count(),
                    outcome,
                };
                results.lock().unwrap_or_else(|e| e.into_inner()).push(summary);
            }
        }

        let zones = Arc::try_unwrap(results).map(|m| m.into_inner().unwrap_or_default()).unwrap_or_default();
        SiteSnapshot { zones }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::NullAlertSink;
    use crate::config::SupervisorConfig;

    fn emulator_zone(zone_id: &str) -> SupervisorConfig {
        SupervisorConfig {
            thermostat_type: "emulator".into(),
            zone_id: zone_id.into(),
            poll_interval_sec: 0,
            reconnect_interval_sec: 3_600,
            tolerance: 2.0,
            target_mode: None,
            measurement_limit: Some(1),
            flag_all_deviations: false,
            max_scheduled_heat_allowed: 74.0,
            min_scheduled_cool_allowed: 68.0,
            retry_max_attempts: 1,
            retry_delay_sec: 0,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn supervises_multiple_zones_in_parallel_and_joins() {
        let site = SiteConfig { zones: vec![emulator_zone("0"), emulator_zone("1")] };
        let orchestrator = Orchestrator::new(site, Credentials::default(), Arc::new(NullAlertSink));
        let snapshot = orchestrator.supervise_all_zones(Some(1), true, Arc::new(AtomicBool::new(false))).await;
        assert_eq!(snapshot.zones.len(), 2);
    }

    #[tokio::test]
    async fn display_all_zones_lists_configured_zones() {
        let site = SiteConfig { zones: vec![emulator_zone("0")] };
        let orchestrator = Orchestrator::new(site, Credentials::default(), Arc::new(NullAlertSink));
        let listed = orchestrator.display_all_zones();
        assert_eq!(listed, vec![("emulator".to_string(), "0".to_string(), true)]);
    }
}
