//! The simulated particle.

use serde::Deserialize;
use crate::{ error::ModelError, units::ELECTRON_MASS };

#[derive(Copy, Clone, Debug, Deserialize)]
struct ParticleSpec {
    #[serde(default = "default_mass")]
    mass: f64,
    #[serde(default = "default_charge")]
    charge: f64,
}

fn default_mass() -> f64 { ELECTRON_MASS }

fn default_charge() -> f64 { -1.0 }

/// Mass and charge of the simulated particle, in user units.
///
/// Defaults to an electron.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "ParticleSpec")]
pub struct Particle {
    mass: f64,
    charge: f64,
}

impl TryFrom<ParticleSpec> for Particle {
    type Error = ModelError;

    fn try_from(spec: ParticleSpec) -> Result<Self, Self::Error> {
        Self::new(spec.mass, spec.charge)
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self { mass: default_mass(), charge: default_charge() }
    }
}

impl Particle {
    /// Create a new particle, checking that the mass is positive.
    pub fn new(mass: f64, charge: f64) -> Result<Self, ModelError> {
        ModelError::check_mass(mass)?;
        Ok(Self { mass, charge })
    }

    pub fn mass(&self) -> f64 { self.mass }

    pub fn charge(&self) -> f64 { self.charge }
}
