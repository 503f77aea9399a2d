//! Two-dimensional potential shapes.

use ndarray as nd;
use serde::Deserialize;
use crate::{
    error::ModelError,
    grid::Grid2,
};
use super::PotentialShape;

/// Coulomb constant in eV nm e⁻².
pub const COULOMB_CONSTANT: f64 = 2.30708 / 1.6;

fn zero() -> f64 { 0.0 }

fn neg_one() -> f64 { -1.0 }

/// Two-dimensional potential shapes. Area shapes take the value `energy`
/// inside and zero outside.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape2D {
    /// Axis-aligned `lx × ly` rectangle, optionally with rounded corners.
    Rectangular {
        center: (f64, f64),
        lx: f64,
        ly: f64,
        #[serde(default = "zero")]
        corner_radius: f64,
        energy: f64,
    },
    /// Ellipse with semi-axes `rx`, `ry`.
    Elliptical {
        center: (f64, f64),
        rx: f64,
        ry: f64,
        energy: f64,
    },
    /// Region between two concentric ellipses.
    Annular {
        center: (f64, f64),
        outer: (f64, f64),
        inner: (f64, f64),
        energy: f64,
    },
    /// Softened Coulomb potential `k r / (r² + offset)` of an ion of charge
    /// `charge` seen by a particle of charge `probe`, with
    /// `k = COULOMB_CONSTANT * probe * charge`. A neutral ion is a unit hard
    /// core of radius `offset`. A charged ion requires `offset > 0`.
    Ionic {
        center: (f64, f64),
        charge: f64,
        offset: f64,
        #[serde(default = "neg_one")]
        probe: f64,
    },
    /// `k r² + offset`.
    Harmonic {
        center: (f64, f64),
        k: f64,
        #[serde(default = "zero")]
        offset: f64,
    },
}

impl Shape2D {
    /// Check parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Ionic { charge, offset, .. } if *charge != 0.0 && !(*offset > 0.0) => {
                Err(ModelError::BadShape(
                    format!("charged ion needs a positive offset; got {}", offset)
                ))
            },
            Self::Elliptical { rx, ry, .. } if !(*rx > 0.0 && *ry > 0.0) => {
                Err(ModelError::BadShape(
                    format!("ellipse semi-axes must be positive; got ({}, {})", rx, ry)
                ))
            },
            Self::Annular { outer, inner, .. }
                if !(outer.0 > 0.0 && outer.1 > 0.0 && inner.0 > 0.0 && inner.1 > 0.0)
            => {
                Err(ModelError::BadShape(
                    format!("annulus semi-axes must be positive; got {:?}, {:?}", outer, inner)
                ))
            },
            _ => Ok(()),
        }
    }

    /// Value of the shape at a point.
    pub fn value(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Rectangular { center, lx, ly, corner_radius, energy } => {
                let (hx, hy) = (0.5 * lx, 0.5 * ly);
                let (ax, ay) = ((x - center.0).abs(), (y - center.1).abs());
                let inside
                    = if ax >= hx || ay >= hy {
                        false
                    } else if *corner_radius <= 0.0 {
                        true
                    } else {
                        let r = corner_radius.min(hx).min(hy);
                        let (cx, cy) = (ax - (hx - r), ay - (hy - r));
                        cx <= 0.0 || cy <= 0.0 || cx * cx + cy * cy < r * r
                    };
                if inside { *energy } else { 0.0 }
            },
            Self::Elliptical { center, rx, ry, energy } => {
                let u = (x - center.0) / rx;
                let v = (y - center.1) / ry;
                if u * u + v * v < 1.0 { *energy } else { 0.0 }
            },
            Self::Annular { center, outer, inner, energy } => {
                let (dx, dy) = (x - center.0, y - center.1);
                let o = (dx / outer.0).powi(2) + (dy / outer.1).powi(2);
                let i = (dx / inner.0).powi(2) + (dy / inner.1).powi(2);
                if o < 1.0 && i > 1.0 { *energy } else { 0.0 }
            },
            Self::Ionic { center, charge, offset, probe } => {
                let r2 = (x - center.0).powi(2) + (y - center.1).powi(2);
                if *charge != 0.0 {
                    let k = COULOMB_CONSTANT * probe * charge;
                    k * r2.sqrt() / (r2 + offset)
                } else if r2 > offset * offset {
                    0.0
                } else {
                    1.0
                }
            },
            Self::Harmonic { center, k, offset } => {
                k * ((x - center.0).powi(2) + (y - center.1).powi(2)) + offset
            },
        }
    }
}

/// A [`Shape2D`] flagged as either real or imaginary.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Potential2D {
    pub shape: Shape2D,
    #[serde(default)]
    pub imaginary: bool,
}

impl Potential2D {
    /// Real-valued potential.
    pub fn real(shape: Shape2D) -> Self { Self { shape, imaginary: false } }

    /// Imaginary-valued potential; positive values absorb.
    pub fn imaginary(shape: Shape2D) -> Self { Self { shape, imaginary: true } }
}

impl PotentialShape for Potential2D {
    type Grid = Grid2;

    fn sample(&self, grid: &Grid2) -> Result<nd::Array2<f64>, ModelError> {
        self.shape.validate()?;
        Ok(grid.sample(|x, y| self.shape.value(x, y)))
    }

    fn is_imaginary(&self) -> bool { self.imaginary }
}
