//! Mode/setpoint policy engine: given the current mode, derives
//! deterministic policy state — which direction of setpoint deviation wastes
//! energy, which capability reverts it, whether the configured schedule
//! itself is out of bounds, and which mode transitions are unsafe to issue
//! directly to the hardware.

use crate::mode::Mode;

/// Default `maxScheduledHeatAllowed`: a heat schedule above this is flagged
/// as an unreasonable setpoint regardless of any override.
pub const DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED: f64 = 74.0;
/// Default `minScheduledCoolAllowed`, the cool-mode mirror of the above.
pub const DEFAULT_MIN_SCHEDULED_COOL_ALLOWED: f64 = 68.0;

/// How a setpoint deviation is detected against `schedule ± tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationOperator {
    GreaterThan,
    LessThan,
    NotEqual,
}

impl DeviationOperator {
    fn evaluate(self, current: f64, threshold: f64) -> bool {
        match self {
            DeviationOperator::GreaterThan => current > threshold,
            DeviationOperator::LessThan => current < threshold,
            DeviationOperator::NotEqual => (current - threshold).abs() > f64::EPSILON,
        }
    }
}

/// Advisory check on whether the schedule itself violates a global limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalLimitOperator {
    GreaterThan,
    LessThan,
}

impl GlobalLimitOperator {
    fn evaluate(self, schedule_setpoint: f64, limit: f64) -> bool {
        match self {
            GlobalLimitOperator::GreaterThan => schedule_setpoint > limit,
            GlobalLimitOperator::LessThan => schedule_setpoint < limit,
        }
    }
}

/// Which `Zone` write capability reverts a deviation, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertCapability {
    SetHeatSetpoint,
    SetCoolSetpoint,
    None,
}

/// Policy state derived from `currentMode`.
#[derive(Debug, Clone, Copy)]
pub struct PolicyState {
    pub tolerance_sign: f64,
    pub deviation_operator: DeviationOperator,
    pub global_limit: Option<f64>,
    pub global_limit_operator: Option<GlobalLimitOperator>,
    pub revert_setpoint_fn: RevertCapability,
}

/// Derive policy state for `mode`, given whether both over- and
/// under-schedule deviations should be flagged, and the configured global
/// limits (defaults above).
pub fn policy_for(
    mode: Mode,
    flag_all_deviations: bool,
    max_scheduled_heat_allowed: f64,
    min_scheduled_cool_allowed: f64,
) -> PolicyState {
    match mode {
        Mode::Heat => PolicyState {
            tolerance_sign: 1.0,
            deviation_operator: if flag_all_deviations {
                DeviationOperator::NotEqual
            } else {
                DeviationOperator::GreaterThan
            },
            global_limit: Some(max_scheduled_heat_allowed),
            global_limit_operator: Some(GlobalLimitOperator::GreaterThan),
            revert_setpoint_fn: RevertCapability::SetHeatSetpoint,
        },
        Mode::Cool => PolicyState {
            tolerance_sign: -1.0,
            deviation_operator: if flag_all_deviations {
                DeviationOperator::NotEqual
            } else {
                DeviationOperator::LessThan
            },
            global_limit: Some(min_scheduled_cool_allowed),
            global_limit_operator: Some(GlobalLimitOperator::LessThan),
            revert_setpoint_fn: RevertCapability::SetCoolSetpoint,
        },
        Mode::Dry => PolicyState {
            tolerance_sign: -1.0,
            deviation_operator: if flag_all_deviations {
                DeviationOperator::NotEqual
            } else {
                DeviationOperator::LessThan
            },
            global_limit: Some(min_scheduled_cool_allowed),
            global_limit_operator: Some(GlobalLimitOperator::LessThan),
            revert_setpoint_fn: RevertCapability::None,
        },
        Mode::Auto | Mode::Fan | Mode::Off | Mode::Unknown => PolicyState {
            tolerance_sign: 1.0,
            deviation_operator: DeviationOperator::NotEqual,
            global_limit: None,
            global_limit_operator: None,
            revert_setpoint_fn: RevertCapability::None,
        },
    }
}

/// Deviation test: `deviationOperator(currentSetpoint, scheduleSetpoint +
/// toleranceSign * toleranceDegrees)`. `flagAllDeviations` zeroes the
/// tolerance so either direction alerts.
pub fn is_deviated(
    policy: &PolicyState,
    current_setpoint: f64,
    schedule_setpoint: f64,
    tolerance_degrees: f64,
    flag_all_deviations: bool,
) -> bool {
    let effective_tolerance = if flag_all_deviations { 0.0 } else { tolerance_degrees };
    let threshold = schedule_setpoint + policy.tolerance_sign * effective_tolerance;
    policy.deviation_operator.evaluate(current_setpoint, threshold)
}

/// Global-limit check: true means the schedule itself is out of bounds —
/// purely advisory, it never blocks a write on its own.
pub fn global_limit_violated(policy: &PolicyState, schedule_setpoint: f64) -> bool {
    match (policy.global_limit, policy.global_limit_operator) {
        (Some(limit), Some(op)) => op.evaluate(schedule_setpoint, limit),
        _ => false,
    }
}

/// Safe-transition rule: a direct heat↔cool transition is never
/// issued. Returns the mode that should actually be written; the caller
/// retains the original `target_mode` for the next poll.
pub fn safe_target_mode(current_mode: Mode, target_mode: Mode) -> Mode {
    if target_mode == current_mode {
        return target_mode;
    }
    let unsafe_pair = (current_mode.is_heat_mode() && target_mode.is_cool_mode())
        || (current_mode.is_cool_mode() && target_mode.is_heat_mode());
    if unsafe_pair {
        Mode::Off
    } else {
        target_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_mode_reports_only_energy_wasting_deviation() {
        let policy = policy_for(Mode::Heat, false, DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED);
        // currentSetpoint=74, scheduleSetpoint=70, tolerance=2 -> scenario 1
        assert!(is_deviated(&policy, 74.0, 70.0, 2.0, false));
        // currentSetpoint=68, scheduleSetpoint=70, tolerance=2 -> scenario 2, not wasting
        assert!(!is_deviated(&policy, 68.0, 70.0, 2.0, false));
    }

    #[test]
    fn cool_mode_is_mirror_of_heat() {
        let policy = policy_for(Mode::Cool, false, DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED);
        // scenario 3: currentSetpoint=68, scheduleSetpoint=72, tolerance=2
        assert!(is_deviated(&policy, 68.0, 72.0, 2.0, false));
        assert_eq!(policy.revert_setpoint_fn, RevertCapability::SetCoolSetpoint);
    }

    #[test]
    fn flag_all_deviations_reports_either_direction() {
        let policy = policy_for(Mode::Heat, true, DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED);
        assert!(is_deviated(&policy, 68.0, 70.0, 2.0, true));
        assert!(is_deviated(&policy, 74.0, 70.0, 2.0, true));
        assert!(!is_deviated(&policy, 70.0, 70.0, 2.0, true));
    }

    #[test]
    fn dry_reversion_uses_cool_setter_never_heat() {
        let policy = policy_for(Mode::Dry, false, DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED);
        assert_eq!(policy.revert_setpoint_fn, RevertCapability::None);
    }

    #[test]
    fn global_limit_flags_unreasonable_schedule() {
        let policy = policy_for(Mode::Heat, false, DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED);
        assert!(global_limit_violated(&policy, 80.0));
        assert!(!global_limit_violated(&policy, 70.0));
    }

    #[test]
    fn unsafe_heat_to_cool_transition_substitutes_off() {
        assert_eq!(safe_target_mode(Mode::Heat, Mode::Cool), Mode::Off);
        assert_eq!(safe_target_mode(Mode::Cool, Mode::Heat), Mode::Off);
    }

    #[test]
    fn safe_transitions_pass_through() {
        assert_eq!(safe_target_mode(Mode::Off, Mode::Heat), Mode::Heat);
        assert_eq!(safe_target_mode(Mode::Heat, Mode::Off), Mode::Off);
        assert_eq!(safe_target_mode(Mode::Heat, Mode::Heat), Mode::Heat);
    }
}
