//! Thin CLI wrapper: resolves flags into a `SupervisorConfig`/
//! `Credentials` pair and hands them to the library's `Orchestrator`. CLI
//! parsing itself is treated as an external collaborator — this binary's
//! only job is the hand-off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;

use thermosuper::alert::{AlertSink, FileBackedAlertSink, NullAlertSink, SmtpAlertSink};
use thermosuper::config::SupervisorConfig;
use thermosuper::logging::{RotatingFileLog, DEFAULT_MAX_LOG_SIZE_BYTES};
use thermosuper::orchestrator::Orchestrator;
use thermosuper::Credentials;

/// Poll one thermostat zone and automatically revert energy-wasting
/// schedule overrides.
#[derive(Parser, Debug)]
#[command(name = "thermostat-supervisor", version, about)]
struct Cli {
    /// Thermostat family alias (honeywell, kumocloud, kumolocal, mmm50,
    /// sht31, emulator, blink, nest).
    thermostat_type: String,

    /// Zone identifier within that family.
    zone_id: String,

    /// Seconds between polls.
    #[arg(long, default_value_t = 300)]
    poll_interval_sec: u64,

    /// Seconds before a connection epoch is discarded and reconnected.
    #[arg(long, default_value_t = 24 * 3_600)]
    reconnect_interval_sec: u64,

    /// Allowed slack, in degrees, around the schedule setpoint.
    #[arg(long, default_value_t = 2.0)]
    tolerance_degrees: f64,

    /// Force the zone to a target mode (off, heat, cool, auto, dry, fan).
    #[arg(long, default_value = "off")]
    target_mode: String,

    /// Stop after this many polls; omit for an unbounded run.
    #[arg(long)]
    measurement_limit: Option<u64>,

    /// Report both over- and under-schedule deviations, not only the
    /// energy-wasting direction.
    #[arg(long, default_value_t = false)]
    flag_all_deviations: bool,

    /// Disable SMTP alert dispatch; log alerts instead.
    #[arg(long, default_value_t = false)]
    no_alerts: bool,

    /// Directory holding the rotating, size-limited audit log file.
    #[arg(long, default_value = "./data")]
    log_dir: String,
}

#[tokio::main]
async fn main() {
    thermosuper::logging::install_stderr_logger();
    let cli = Cli::parse();

    let target_mode = match cli.target_mode.parse() {
        Ok(m) => Some(m),
        Err(_) => {
            eprintln!("{}", format!("invalid --target-mode '{}'", cli.target_mode).red());
            std::process::exit(1);
        }
    };

    let config = SupervisorConfig {
        thermostat_type: cli.thermostat_type,
        zone_id: cli.zone_id,
        poll_interval_sec: cli.poll_interval_sec,
        reconnect_interval_sec: cli.reconnect_interval_sec,
        tolerance: cli.tolerance_degrees,
        target_mode,
        measurement_limit: cli.measurement_limit,
        flag_all_deviations: cli.flag_all_deviations,
        max_scheduled_heat_allowed: thermosuper::policy::DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED,
        min_scheduled_cool_allowed: thermosuper::policy::DEFAULT_MIN_SCHEDULED_COOL_ALLOWED,
        retry_max_attempts: 3,
        retry_delay_sec: 30,
        enabled: true,
    };

    let credential_keys = [
        "GMAIL_USERNAME",
        "GMAIL_PASSWORD",
        "TCC_USERNAME",
        "TCC_PASSWORD",
        "KUMO_USERNAME",
        "KUMO_PASSWORD",
        "BLINK_USERNAME",
        "BLINK_PASSWORD",
        "NEST_USERNAME",
        "NEST_PASSWORD",
    ];
    let mut credentials = Credentials::from_env(credential_keys);
    for key in std::env::vars().filter(|(k, _)| k.starts_with("SHT31_REMOTE_IP_ADDRESS_")) {
        credentials.insert(key.0, key.1);
    }

    let base_sink: Box<dyn AlertSink> = if cli.no_alerts {
        Box::new(NullAlertSink)
    } else {
        match SmtpAlertSink::from_credentials(&credentials, "alerts@localhost") {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                eprintln!("{}", format!("alert sink disabled: {e}").yellow());
                Box::new(NullAlertSink)
            }
        }
    };

    let log_path = std::path::Path::new(&cli.log_dir).join("supervisor.log");
    let alert_sink: Arc<dyn AlertSink> = match RotatingFileLog::open(&log_path, DEFAULT_MAX_LOG_SIZE_BYTES) {
        Ok(file) => Arc::new(FileBackedAlertSink::new(base_sink, file)),
        Err(e) => {
            eprintln!("{}", format!("durable alert log disabled ({log_path:?}): {e}").yellow());
            Arc::from(base_sink)
        }
    };

    let site = thermosuper::config::SiteConfig { zones: vec![config] };
    let orchestrator = Orchestrator::new(site, credentials, alert_sink);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst)).is_err() {
        eprintln!("{}", "warning: failed to install Ctrl-C handler".yellow());
    }

    let snapshot = orchestrator.supervise_all_zones(None, false, stop).await;
    let zone = snapshot.zones.first();
    match zone {
        Some(summary) if matches!(summary.outcome, thermosuper::supervisor::ZoneOutcome::FatalAuthError { .. }) => {
            eprintln!("{}", format!("zone {} failed fatally after {} poll(s)", summary.zone_id, summary.poll_count).red());
            std::process::exit(1);
        }
        Some(summary) => {
            println!("zone {} finished after {} poll(s)", summary.zone_id, summary.poll_count);
        }
        None => {
            eprintln!("{}", "no zone was configured".red());
            std::process::exit(1);
        }
    }
}
