//! Error types for the thermostat supervisor core.

use thiserror::Error;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, ThermostatError>;

/// The closed set of error kinds a driver or core component can raise.
///
/// Driver-layer errors are normalized into these kinds at the interface
/// boundary (`thermostat::Zone`) — raw vendor exceptions never escape a
/// driver implementation.
#[derive(Error, Debug)]
pub enum ThermostatError {
    /// Connection refused, timeout, HTTP 5xx, or a decode failure on an
    /// otherwise-200 response. Retryable via [`crate::retry::execute_with_retries`].
    #[error("transient network error on {zone_id}: {message}")]
    TransientNetwork { zone_id: String, message: String },

    /// Credential rejected, or a required credential key is missing.
    /// Fatal for the zone: the supervisor loop reports and exits.
    #[error("auth error on {zone_id}: {message}")]
    AuthError { zone_id: String, message: String },

    /// Capability not available on this thermostat family. Never surfaced
    /// as an alert — the supervisor silently skips the capability.
    #[error("capability '{capability}' not supported by {thermostat_type}")]
    NotSupported {
        thermostat_type: String,
        capability: String,
    },

    /// A schedule setpoint fell outside the configured global limits.
    /// Advisory only; does not stop supervision.
    #[error("policy violation on {zone_id}: {message}")]
    PolicyViolation { zone_id: String, message: String },

    /// The device returned a field the driver cannot interpret (e.g. an
    /// unrecognized mode code). The capability resolves to `Mode::Unknown`.
    #[error("protocol error on {zone_id}: {message}")]
    ProtocolError { zone_id: String, message: String },

    /// Any unexpected failure in core logic, not attributable to a driver.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ThermostatError {
    /// Whether this error kind is transient and worth a retry (connection
    /// errors, decode errors, HTTP 5xx) rather than surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ThermostatError::TransientNetwork { .. })
    }

    /// Whether this error kind is fatal to the owning zone's supervisor loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ThermostatError::AuthError { .. })
    }

    /// The zone id this error pertains to, if any (used to build the
    /// per-(kind, zone) alert dedup key).
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            ThermostatError::TransientNetwork { zone_id, .. }
            | ThermostatError::AuthError { zone_id, .. }
            | ThermostatError::PolicyViolation { zone_id, .. }
            | ThermostatError::ProtocolError { zone_id, .. } => Some(zone_id),
            ThermostatError::NotSupported { .. } | ThermostatError::InternalError(_) => None,
        }
    }

    /// A short, stable tag identifying the error kind, used as half of the
    /// `(kind, zone)` alert dedup key.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            ThermostatError::TransientNetwork { .. } => "transient_network",
            ThermostatError::AuthError { .. } => "auth_error",
            ThermostatError::NotSupported { .. } => "not_supported",
            ThermostatError::PolicyViolation { .. } => "policy_violation",
            ThermostatError::ProtocolError { .. } => "protocol_error",
            ThermostatError::InternalError(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for ThermostatError {
    fn from(err: reqwest::Error) -> Self {
        ThermostatError::TransientNetwork {
            zone_id: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_network_is_retryable() {
        let err = ThermostatError::TransientNetwork {
            zone_id: "0".into(),
            message: "timeout".into(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn auth_error_is_fatal_not_retryable() {
        let err = ThermostatError::AuthError {
            zone_id: "0".into(),
            message: "bad password".into(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_supported_has_no_zone_id() {
        let err = ThermostatError::NotSupported {
            thermostat_type: "sht31".into(),
            capability: "set_heat_setpoint".into(),
        };
        assert_eq!(err.zone_id(), None);
        assert_eq!(err.kind_tag(), "not_supported");
    }

    #[test]
    fn display_includes_zone_and_message() {
        let err = ThermostatError::PolicyViolation {
            zone_id: "1".into(),
            message: "schedule heat sp 80 exceeds max 74".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1"));
        assert!(msg.contains("exceeds max 74"));
    }
}
