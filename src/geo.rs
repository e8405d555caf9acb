//! Geographic helpers for the presence protocol.
//!
//! Heading derivation is presentation logic that rides along the transport
//! layer; it lives here as pure functions so it can be tested independently
//! of any connection state.

use crate::store::models::Coordinates;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Straight-line displacement (in degrees) below which a new sample is
/// treated as GPS jitter and the previous heading is kept.
const MOVEMENT_THRESHOLD_DEG: f64 = 1e-4;

/// Great-circle distance between two points, in meters (haversine).
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` to `to`, in degrees `[0, 360)`
/// with 0 = north.
pub fn bearing(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Smooths the heading derived from successive position samples.
///
/// Every sample replaces the stored position, but the heading is only
/// recomputed when the displacement since the previous sample exceeds the
/// jitter threshold; otherwise the last reported heading stands. Keeps
/// direction markers from spinning while a player is standing still.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    last_position: Option<Coordinates>,
    heading: Option<f64>,
}

impl HeadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a position sample and return the heading to report, if any.
    pub fn observe(&mut self, position: Coordinates) -> Option<f64> {
        if let Some(previous) = self.last_position {
            let displacement = ((position.latitude - previous.latitude).powi(2)
                + (position.longitude - previous.longitude).powi(2))
            .sqrt();
            if displacement > MOVEMENT_THRESHOLD_DEG {
                self.heading = Some(bearing(previous, position));
            }
        }
        self.last_position = Some(position);
        self.heading
    }

    /// The last reported heading without feeding a new sample.
    pub fn heading(&self) -> Option<f64> {
        self.heading
    }
}
