//! Temperature/humidity value model: unit conversions, formatting, and
//! numeric validation, grounded on `original_source/utilities.py`'s
//! conversion helpers.

use crate::error::{Result, ThermostatError};

/// Temperature unit for formatting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    fn suffix(self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
            TemperatureUnit::Kelvin => 'K',
        }
    }
}

/// Relative-humidity unit for formatting purposes; closed set of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityUnit {
    RelativeHumidity,
}

/// Convert Celsius to Fahrenheit. `None` passes through unchanged.
pub fn c_to_f(value: Option<f64>) -> Option<f64> {
    value.map(|c| c * 9.0 / 5.0 + 32.0)
}

/// Convert Fahrenheit to Celsius. `None` passes through unchanged.
pub fn f_to_c(value: Option<f64>) -> Option<f64> {
    value.map(|f| (f - 32.0) * 5.0 / 9.0)
}

/// Format a raw temperature value with its unit, e.g. `"70.0°F"`.
///
/// Rejects non-finite input and rounds to `precision` decimal places.
pub fn temp_with_units(raw: f64, unit: TemperatureUnit, precision: usize) -> Result<String> {
    if !raw.is_finite() {
        return Err(ThermostatError::InternalError(format!(
            "temperature value {raw} is not a finite number"
        )));
    }
    Ok(format!("{:.*}\u{00B0}{}", precision, raw, unit.suffix()))
}

/// Format a raw humidity value with its unit, e.g. `"45.0%RH"`.
pub fn humidity_with_units(raw: f64, unit: HumidityUnit, precision: usize) -> Result<String> {
    if !raw.is_finite() {
        return Err(ThermostatError::InternalError(format!(
            "humidity value {raw} is not a finite number"
        )));
    }
    let HumidityUnit::RelativeHumidity = unit;
    Ok(format!("{:.*}%RH", precision, raw))
}

/// Validate that a value parses as a finite numeric quantity, carrying the
/// parameter name in the error on failure (mirrors `utilities.py`'s
/// `validateNumeric`).
pub fn validate_numeric(raw: &str, param_name: &str) -> Result<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
        ThermostatError::InternalError(format!(
            "parameter '{param_name}' is not numeric: {raw:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_to_f_round_trip_within_tolerance() {
        for t in [-40.0, 0.0, 32.0, 68.0, 100.0, 212.0] {
            let f = c_to_f(Some(t)).unwrap();
            let back = f_to_c(Some(f)).unwrap();
            assert!((back - t).abs() < 1e-9, "t={t} back={back}");
        }
    }

    #[test]
    fn c_to_f_none_passes_through() {
        assert_eq!(c_to_f(None), None);
        assert_eq!(f_to_c(None), None);
    }

    #[test]
    fn c_to_f_known_points() {
        assert_eq!(c_to_f(Some(0.0)), Some(32.0));
        assert_eq!(c_to_f(Some(100.0)), Some(212.0));
    }

    #[test]
    fn temp_with_units_formats_degree_sign() {
        let s = temp_with_units(70.0, TemperatureUnit::Fahrenheit, 1).unwrap();
        assert_eq!(s, "70.0\u{00B0}F");
    }

    #[test]
    fn temp_with_units_rejects_nan() {
        assert!(temp_with_units(f64::NAN, TemperatureUnit::Celsius, 1).is_err());
    }

    #[test]
    fn humidity_with_units_formats_percent_rh() {
        let s = humidity_with_units(45.25, HumidityUnit::RelativeHumidity, 1).unwrap();
        assert_eq!(s, "45.3%RH");
    }

    #[test]
    fn validate_numeric_accepts_numeric_string() {
        assert_eq!(validate_numeric("72.5", "setpoint").unwrap(), 72.5);
    }

    #[test]
    fn validate_numeric_rejects_non_numeric_string() {
        let err = validate_numeric("not-a-number", "setpoint").unwrap_err();
        assert!(err.to_string().contains("setpoint"));
    }
}
