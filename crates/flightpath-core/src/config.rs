//! Calculator options, with environment overrides.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Steepest bank accepted for any turn, degrees.
const MAX_USABLE_BANK_DEG: f64 = 85.0;

/// Which speed feeds turn radius and climb distance computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    GroundSpeed,
    TrueAirspeed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPathCalculatorOptions {
    /// Climb rate used when the aircraft state has none, feet per minute.
    pub default_climb_rate_fpm: f64,
    /// Speed used when the aircraft state has none, knots.
    pub default_speed_kt: f64,
    /// Bank angle for leg geometry turns, degrees.
    pub bank_angle: f64,
    pub hold_bank_angle: f64,
    pub course_reversal_bank_angle: f64,
    pub turn_anticipation_bank_angle: f64,
    pub max_bank_angle: f64,
    pub speed_mode: SpeedMode,
    /// Let a turn that would overlap the previous one shrink that turn too.
    pub readjust_previous_turns: bool,
    /// Keep the active leg's geometry once it has been calculated.
    pub skip_active_leg_recalculation: bool,
    /// Length drawn for manual termination legs (FM/VM), nautical miles.
    pub manual_leg_length_nm: f64,
    /// Course changes beyond this many degrees become course reversals.
    pub max_course_reversal_angle: f64,
}

impl Default for FlightPathCalculatorOptions {
    fn default() -> Self {
        Self {
            default_climb_rate_fpm: 2000.0,
            default_speed_kt: 250.0,
            bank_angle: 25.0,
            hold_bank_angle: 25.0,
            course_reversal_bank_angle: 25.0,
            turn_anticipation_bank_angle: 25.0,
            max_bank_angle: 25.0,
            speed_mode: SpeedMode::GroundSpeed,
            readjust_previous_turns: false,
            skip_active_leg_recalculation: false,
            manual_leg_length_nm: 5.0,
            max_course_reversal_angle: 135.0,
        }
    }
}

impl FlightPathCalculatorOptions {
    /// Defaults overridden by `FLIGHTPATH_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_climb_rate_fpm: env_f64("FLIGHTPATH_CLIMB_RATE_FPM", defaults.default_climb_rate_fpm),
            default_speed_kt: env_f64("FLIGHTPATH_SPEED_KT", defaults.default_speed_kt),
            bank_angle: env_f64("FLIGHTPATH_BANK_ANGLE", defaults.bank_angle),
            hold_bank_angle: env_f64("FLIGHTPATH_HOLD_BANK_ANGLE", defaults.hold_bank_angle),
            course_reversal_bank_angle: env_f64(
                "FLIGHTPATH_COURSE_REVERSAL_BANK_ANGLE",
                defaults.course_reversal_bank_angle,
            ),
            turn_anticipation_bank_angle: env_f64(
                "FLIGHTPATH_TURN_ANTICIPATION_BANK_ANGLE",
                defaults.turn_anticipation_bank_angle,
            ),
            max_bank_angle: env_f64("FLIGHTPATH_MAX_BANK_ANGLE", defaults.max_bank_angle),
            speed_mode: match env::var("FLIGHTPATH_SPEED_MODE").ok().as_deref() {
                Some("tas") | Some("true_airspeed") => SpeedMode::TrueAirspeed,
                Some("gs") | Some("ground_speed") => SpeedMode::GroundSpeed,
                _ => defaults.speed_mode,
            },
            readjust_previous_turns: env_bool("FLIGHTPATH_READJUST_PREVIOUS_TURNS", defaults.readjust_previous_turns),
            skip_active_leg_recalculation: env_bool(
                "FLIGHTPATH_SKIP_ACTIVE_LEG",
                defaults.skip_active_leg_recalculation,
            ),
            manual_leg_length_nm: env_f64("FLIGHTPATH_MANUAL_LEG_NM", defaults.manual_leg_length_nm),
            max_course_reversal_angle: env_f64("FLIGHTPATH_MAX_COURSE_REVERSAL", defaults.max_course_reversal_angle),
        }
        .validated()
    }

    /// Replace values the geometry cannot work with (non-positive speeds,
    /// rates and lengths, banks outside (0, 85]) by their defaults.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f64, default: f64| if value.is_finite() && value > 0.0 { value } else { default };
        let bank = |value: f64, default: f64| {
            if value.is_finite() && value > 0.0 && value <= MAX_USABLE_BANK_DEG {
                value
            } else {
                default
            }
        };
        let validated = Self {
            default_climb_rate_fpm: positive(self.default_climb_rate_fpm, defaults.default_climb_rate_fpm),
            default_speed_kt: positive(self.default_speed_kt, defaults.default_speed_kt),
            bank_angle: bank(self.bank_angle, defaults.bank_angle),
            hold_bank_angle: bank(self.hold_bank_angle, defaults.hold_bank_angle),
            course_reversal_bank_angle: bank(self.course_reversal_bank_angle, defaults.course_reversal_bank_angle),
            turn_anticipation_bank_angle: bank(self.turn_anticipation_bank_angle, defaults.turn_anticipation_bank_angle),
            max_bank_angle: bank(self.max_bank_angle, defaults.max_bank_angle),
            manual_leg_length_nm: positive(self.manual_leg_length_nm, defaults.manual_leg_length_nm),
            max_course_reversal_angle: if (0.0..=180.0).contains(&self.max_course_reversal_angle) {
                self.max_course_reversal_angle
            } else {
                defaults.max_course_reversal_angle
            },
            ..self.clone()
        };
        if validated != self {
            warn!(?self, "invalid calculator options replaced by defaults");
        }
        validated
    }

    /// Bank angle clamped to the configured maximum.
    pub fn limited_bank(&self, bank: f64) -> f64 {
        bank.min(self.max_bank_angle)
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: FlightPathCalculatorOptions =
            serde_json::from_str(r#"{ "bank_angle": 15.0, "speed_mode": "true_airspeed" }"#).unwrap();
        assert_eq!(options.bank_angle, 15.0);
        assert_eq!(options.speed_mode, SpeedMode::TrueAirspeed);
        assert_eq!(options.default_speed_kt, 250.0);
    }

    #[test]
    fn test_validated_replaces_unusable_values() {
        let options = FlightPathCalculatorOptions {
            default_speed_kt: 0.0,
            default_climb_rate_fpm: -500.0,
            hold_bank_angle: 90.0,
            manual_leg_length_nm: f64::NAN,
            bank_angle: 30.0,
            ..Default::default()
        }
        .validated();
        assert_eq!(options.default_speed_kt, 250.0);
        assert_eq!(options.default_climb_rate_fpm, 2000.0);
        assert_eq!(options.hold_bank_angle, 25.0);
        assert_eq!(options.manual_leg_length_nm, 5.0);
        assert_eq!(options.bank_angle, 30.0);
        assert_eq!(FlightPathCalculatorOptions::default().validated(), FlightPathCalculatorOptions::default());
    }

    #[test]
    fn test_bank_limited_to_max() {
        let options = FlightPathCalculatorOptions {
            max_bank_angle: 20.0,
            ..Default::default()
        };
        assert_eq!(options.limited_bank(30.0), 20.0);
        assert_eq!(options.limited_bank(15.0), 15.0);
    }
}
