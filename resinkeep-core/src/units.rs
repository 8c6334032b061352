//! Length / mass conversion for material of circular cross-section.
//!
//! Lengths and diameters are in mm, density in g/cm³, mass in g.

use std::f64::consts::PI;

/// mm³ per cm³
const MM3_PER_CM3: f64 = 1000.0;

fn cross_section(diameter: f64) -> f64 {
    PI * (diameter / 2.0).powi(2)
}

pub fn weight_from_length(length: f64, diameter: f64, density: f64) -> f64 {
    cross_section(diameter) * length / MM3_PER_CM3 * density
}

/// Inverse of [`weight_from_length`]. `diameter` and `density` must be
/// positive.
pub fn length_from_weight(weight: f64, diameter: f64, density: f64) -> f64 {
    weight / density * MM3_PER_CM3 / cross_section(diameter)
}
