//! Aircraft kinematic state consumed for the active leg.

use serde::{Deserialize, Serialize};

use crate::config::{FlightPathCalculatorOptions, SpeedMode};
use crate::geo::GeoPoint;
use crate::path::utils::turn_radius_m;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    pub position: GeoPoint,
    /// True track over ground, degrees.
    pub track: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Knots.
    pub ground_speed: f64,
    /// Knots.
    pub true_airspeed: f64,
    /// Feet per minute; zero or negative means unknown.
    #[serde(default)]
    pub climb_rate: f64,
    /// Overrides the radius derived from speed and bank, meters.
    #[serde(default)]
    pub desired_turn_radius: Option<f64>,
}

impl AircraftState {
    /// Speed (knots) used for geometry under `options`, falling back to the
    /// configured default when the state reports nothing useful.
    pub fn planning_speed(&self, options: &FlightPathCalculatorOptions) -> f64 {
        let speed = match options.speed_mode {
            SpeedMode::GroundSpeed => self.ground_speed,
            SpeedMode::TrueAirspeed => self.true_airspeed,
        };
        if speed > 1.0 {
            speed
        } else {
            options.default_speed_kt
        }
    }

    pub fn planning_climb_rate(&self, options: &FlightPathCalculatorOptions) -> f64 {
        if self.climb_rate > 1.0 {
            self.climb_rate
        } else {
            options.default_climb_rate_fpm
        }
    }

    /// Turn radius (meters) at `bank_deg`, or the explicitly desired radius.
    pub fn turn_radius(&self, options: &FlightPathCalculatorOptions, bank_deg: f64) -> f64 {
        self.desired_turn_radius
            .filter(|r| *r > 0.0)
            .unwrap_or_else(|| turn_radius_m(self.planning_speed(options), options.limited_bank(bank_deg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AircraftState {
        AircraftState {
            position: GeoPoint::new(0.0, 0.0),
            track: 90.0,
            altitude: 1000.0,
            ground_speed: 180.0,
            true_airspeed: 200.0,
            climb_rate: 0.0,
            desired_turn_radius: None,
        }
    }

    #[test]
    fn test_speed_mode_selects_speed() {
        let mut options = FlightPathCalculatorOptions::default();
        assert_eq!(state().planning_speed(&options), 180.0);
        options.speed_mode = SpeedMode::TrueAirspeed;
        assert_eq!(state().planning_speed(&options), 200.0);
    }

    #[test]
    fn test_unknown_climb_rate_uses_default() {
        let options = FlightPathCalculatorOptions::default();
        assert_eq!(state().planning_climb_rate(&options), options.default_climb_rate_fpm);
    }

    #[test]
    fn test_desired_radius_wins() {
        let options = FlightPathCalculatorOptions::default();
        let mut s = state();
        s.desired_turn_radius = Some(1000.0);
        assert_eq!(s.turn_radius(&options, 25.0), 1000.0);
    }
}
