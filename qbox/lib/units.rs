#![allow(non_upper_case_globals)]

//! Conversion between user-facing quantities and the internal unit system, in
//! which *ħ* = 1.
//!
//! Concrete physical constants are taken from NIST.

use std::f64::consts::PI;
use serde::Deserialize;

/// Planck constant (kg m^2 s^-1)
pub const h: f64 = 6.62607015e-34;
//             +/- 0 (exact)

/// reduced Planck constant (kg m^2 s^-1)
pub const hbar: f64 = h / 2.0 / PI;
//                +/- 0 (exact)

/// elementary charge (C)
pub const e: f64 = 1.602176634e-19;
//             +/- 0 (exact)

/// electron mass (kg)
pub const me: f64 = 9.1093837015e-31;
//              +/- 0.0000000028e-31

/// unified atomic mass unit (kg)
pub const mu: f64 = 1.66053906660e-27;
//              +/- 0.00000000050e-27

/// Default mass converter: user masses (in units of 10⁻³⁰ kg / 1.66) to
/// internal units.
pub const MASS_UNIT_CONVERTER: f64 = 16.6 / 1.0545726;

/// Default energy converter: user energies (eV-like) to internal units.
pub const ENERGY_UNIT_CONVERTER: f64 = 1.6 / 1.0545726;

/// Electron mass in default user mass units.
pub const ELECTRON_MASS: f64 = 0.910938188 / 1.66;

/// Default bound on the magnitude of static potential values (user energy
/// units) before they are folded into the Hamiltonian.
pub const POTENTIAL_CLAMP: f64 = 5.0;

/// Pair of conversion factors taking user masses and energies to the internal
/// unit system.
///
/// The kinetic coupling on a grid of spacing *δx* is `1 / (2 m δx²)` with
/// `m = mass * self.mass`, and a potential `V` enters the Hamiltonian as
/// `V * self.energy`.
///
/// See [`docs/units`][crate::docs#units] for more information.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Units {
    /// Mass converter.
    pub mass: f64,
    /// Energy converter.
    pub energy: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self { mass: MASS_UNIT_CONVERTER, energy: ENERGY_UNIT_CONVERTER }
    }
}

impl Units {
    /// Identity converters: user quantities are already in units where
    /// *ħ* = 1.
    pub fn natural() -> Self { Self { mass: 1.0, energy: 1.0 } }

    /// Construct from the MKS values of the user mass, length, energy, and
    /// time units.
    pub fn from_mks(mass: f64, length: f64, energy: f64, time: f64) -> Self {
        Self {
            mass: mass * length.powi(2) / hbar / time,
            energy: energy * time / hbar,
        }
    }

    /// Convert a user mass to internal units.
    pub fn to_nat_mass(&self, m: f64) -> f64 { m * self.mass }

    /// Convert a user energy to internal units.
    pub fn to_nat_energy<T, U>(&self, x: T) -> U
    where T: std::ops::Mul<f64, Output = U>
    {
        x * self.energy
    }

    /// Convert an internal energy to user units.
    pub fn from_nat_energy<T, U>(&self, x: T) -> U
    where T: std::ops::Mul<f64, Output = U>
    {
        x * self.energy.recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mks_scales_consistent_with_hbar() {
        // time unit ħ/E and mass unit ħ t / a² make both converters unity
        let a: f64 = 1e-10;
        let en = e;
        let t = hbar / en;
        let m = hbar * t / a.powi(2);
        let uu = Units::from_mks(m, a, en, t);
        assert_relative_eq!(uu.mass, 1.0, max_relative = 1e-12);
        assert_relative_eq!(uu.energy, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn energy_round_trip() {
        let uu = Units::default();
        let v: f64 = uu.from_nat_energy(uu.to_nat_energy(2.5));
        assert_relative_eq!(v, 2.5, max_relative = 1e-15);
    }
}
