//! Uniform, time-dependent electric and magnetic fields.
//!
//! Both fields oscillate as `intensity * sin(ω t + φ)`; a field with zero
//! frequency is static at `intensity`.

use serde::Deserialize;

fn oscillate(intensity: f64, frequency: f64, phase: f64, t: f64) -> f64 {
    if intensity == 0.0 {
        0.0
    } else if frequency == 0.0 {
        intensity
    } else {
        intensity * (frequency * t + phase).sin()
    }
}

/// In-plane electric field pointing at `angle` degrees from the x axis.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct ElectricField {
    pub intensity: f64,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub phase: f64,
    #[serde(default)]
    pub angle: f64,
}

impl ElectricField {
    /// Static field along x.
    pub fn constant(intensity: f64) -> Self {
        Self { intensity, frequency: 0.0, phase: 0.0, angle: 0.0 }
    }

    /// Field strength at time `t`.
    pub fn value(&self, t: f64) -> f64 {
        oscillate(self.intensity, self.frequency, self.phase, t)
    }

    /// Electric potential at `(x, y)` relative to the origin, for a positive
    /// unit charge: `-E(t) (x cos θ + y sin θ)`.
    pub fn potential(&self, x: f64, y: f64, t: f64) -> f64 {
        let e = self.value(t);
        let (s, c) = self.angle.to_radians().sin_cos();
        -e * (x * c + y * s)
    }
}

/// Magnetic field along z.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct MagneticField {
    pub intensity: f64,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub phase: f64,
}

impl MagneticField {
    /// Static field.
    pub fn constant(intensity: f64) -> Self {
        Self { intensity, frequency: 0.0, phase: 0.0 }
    }

    /// Field strength at time `t`.
    pub fn value(&self, t: f64) -> f64 {
        oscillate(self.intensity, self.frequency, self.phase, t)
    }
}
