//! Initial-condition generators.
//!
//! Packets are specifications: propagators keep them so that a reset can
//! rebuild the wavefunction, while the sampled fields are temporaries summed
//! into the wavefunction and then normalized.

use std::fmt;
use log::warn;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::Deserialize;
use crate::{
    error::{ LengthError, ModelError },
    grid::{ Grid, Grid1, Grid2 },
    utils::wf_renormalize,
};

fn one() -> f64 { 1.0 }

fn check_positive(what: &str, v: f64) -> Result<(), ModelError> {
    (v.is_finite() && v > 0.0).then_some(())
        .ok_or_else(|| ModelError::BadPacket(format!("{what} must be positive; got {v}")))
}

/// A wave packet that can be sampled over a grid.
pub trait WavePacket: Clone + fmt::Debug + Send + Sync + 'static {
    /// Grid type over which the packet is defined.
    type Grid: Grid;

    /// Sample the (unnormalized) packet over the grid.
    fn sample(&self, grid: &Self::Grid)
        -> Result<nd::Array<C64, <Self::Grid as Grid>::Dim>, ModelError>;
}

/// One-dimensional wave packets.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet1D {
    /// `magnitude exp(-(x - center)² / sigma²) exp(i momentum x)`.
    Gaussian {
        #[serde(default = "one")]
        magnitude: f64,
        sigma: f64,
        center: f64,
        #[serde(default)]
        momentum: f64,
    },
    /// `magnitude exp(i momentum x)` on `(start, start + width)`.
    Uniform {
        #[serde(default = "one")]
        magnitude: f64,
        start: f64,
        width: f64,
        #[serde(default)]
        momentum: f64,
    },
    /// A real state, e.g. a stationary state, boosted by
    /// `exp(i momentum x)`.
    #[serde(skip)]
    Stationary {
        state: nd::Array1<f64>,
        momentum: f64,
    },
}

impl Packet1D {
    /// Check parameters against the grid.
    pub fn validate(&self, grid: &Grid1) -> Result<(), ModelError> {
        match self {
            Self::Gaussian { sigma, .. } => check_positive("sigma", *sigma),
            Self::Uniform { width, .. } => check_positive("width", *width),
            Self::Stationary { state, .. } => {
                LengthError::check_len(grid.n(), state.len())?;
                Ok(())
            },
        }
    }
}

impl WavePacket for Packet1D {
    type Grid = Grid1;

    fn sample(&self, grid: &Grid1) -> Result<nd::Array1<C64>, ModelError> {
        self.validate(grid)?;
        let x = grid.coords();
        let psi: nd::Array1<C64>
            = match self {
                Self::Gaussian { magnitude, sigma, center, momentum } => {
                    x.mapv(|xk| {
                        let u = (xk - center) / sigma;
                        C64::from_polar(magnitude * (-u * u).exp(), momentum * xk)
                    })
                },
                Self::Uniform { magnitude, start, width, momentum } => {
                    x.mapv(|xk| {
                        if xk > *start && xk < start + width {
                            C64::from_polar(*magnitude, momentum * xk)
                        } else {
                            C64::from(0.0)
                        }
                    })
                },
                Self::Stationary { state, momentum } => {
                    nd::Zip::from(&x).and(state)
                        .map_collect(|xk, sk| C64::from_polar(*sk, momentum * xk))
                },
            };
        Ok(psi)
    }
}

/// Two-dimensional wave packets.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet2D {
    /// `magnitude exp(-|r - center|² / sigma²) exp(i p·r)`.
    Gaussian {
        #[serde(default = "one")]
        magnitude: f64,
        sigma: f64,
        center: (f64, f64),
        #[serde(default)]
        momentum: (f64, f64),
    },
    /// `magnitude exp(i p·r)` on `(x, x + width) × (y, y + height)` with
    /// `corner = (x, y)`.
    UniformRectangle {
        #[serde(default = "one")]
        magnitude: f64,
        corner: (f64, f64),
        width: f64,
        height: f64,
        #[serde(default)]
        momentum: (f64, f64),
    },
}

impl Packet2D {
    /// Check parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Gaussian { sigma, .. } => check_positive("sigma", *sigma),
            Self::UniformRectangle { width, height, .. } => {
                check_positive("width", *width)?;
                check_positive("height", *height)
            },
        }
    }
}

impl WavePacket for Packet2D {
    type Grid = Grid2;

    fn sample(&self, grid: &Grid2) -> Result<nd::Array2<C64>, ModelError> {
        self.validate()?;
        let psi: nd::Array2<C64>
            = match self {
                Self::Gaussian { magnitude, sigma, center, momentum } => {
                    let s2 = sigma * sigma;
                    grid.sample(|x, y| {
                        let r2 = (x - center.0).powi(2) + (y - center.1).powi(2);
                        C64::from_polar(
                            magnitude * (-r2 / s2).exp(),
                            momentum.0 * x + momentum.1 * y,
                        )
                    })
                },
                Self::UniformRectangle { magnitude, corner, width, height, momentum } => {
                    grid.sample(|x, y| {
                        let inside
                            = x > corner.0 && x < corner.0 + width
                            && y > corner.1 && y < corner.1 + height;
                        if inside {
                            C64::from_polar(*magnitude, momentum.0 * x + momentum.1 * y)
                        } else {
                            C64::from(0.0)
                        }
                    })
                },
            };
        Ok(psi)
    }
}

/// Sum the fields of all packets over the grid and normalize the result.
///
/// An empty packet list produces the zero wavefunction.
pub fn superpose<P: WavePacket>(grid: &P::Grid, packets: &[P])
    -> Result<nd::Array<C64, <P::Grid as Grid>::Dim>, ModelError>
{
    let mut psi: nd::Array<C64, <P::Grid as Grid>::Dim>
        = nd::Array::zeros(grid.dim());
    if packets.is_empty() {
        warn!("packet::superpose: no wave packets; wavefunction is zero");
        return Ok(psi);
    }
    for packet in packets.iter() {
        psi += &packet.sample(grid)?;
    }
    wf_renormalize(&mut psi);
    Ok(psi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::utils::wf_norm;

    #[test]
    fn superposed_packets_are_normalized() {
        let grid = Grid1::new(256, -20.0, 20.0).unwrap();
        let packets = vec![
            Packet1D::Gaussian { magnitude: 1.0, sigma: 1.0, center: -5.0, momentum: 1.0 },
            Packet1D::Uniform { magnitude: 0.5, start: 5.0, width: 2.0, momentum: 0.0 },
        ];
        let psi = superpose(&grid, &packets).unwrap();
        assert_abs_diff_eq!(wf_norm(&psi), 1.0, epsilon = 1e-12);
        let peak = psi.iter().map(|z| z.norm()).fold(0.0, f64::max);
        assert_abs_diff_eq!(psi[grid.index_of(-5.0)].norm(), peak, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_phase_follows_momentum() {
        let grid = Grid2::new((40, 40), (-4.0, 4.0), (-4.0, 4.0)).unwrap();
        let p = Packet2D::Gaussian {
            magnitude: 1.0, sigma: 1.0, center: (0.0, 0.0), momentum: (2.0, -1.0) };
        let psi = p.sample(&grid).unwrap();
        let z = psi[[25, 15]];
        let expected = 2.0 * grid.x(25) - grid.y(15);
        assert_abs_diff_eq!((z / z.norm() - C64::from_polar(1.0, expected)).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn uniform_rectangle_support() {
        let grid = Grid2::new((20, 20), (0.0, 10.0), (0.0, 10.0)).unwrap();
        let p = Packet2D::UniformRectangle {
            magnitude: 1.0, corner: (2.0, 2.0), width: 3.0, height: 1.0, momentum: (0.0, 0.0) };
        let psi = p.sample(&grid).unwrap();
        let count = psi.iter().filter(|z| z.norm() > 0.0).count();
        // x in {2.5, ..., 4.5}, y in {2.5}
        assert_eq!(count, 5);
    }

    #[test]
    fn bad_packets_rejected() {
        let grid = Grid1::new(10, 0.0, 1.0).unwrap();
        let p = Packet1D::Gaussian { magnitude: 1.0, sigma: 0.0, center: 0.5, momentum: 0.0 };
        assert!(matches!(p.sample(&grid), Err(ModelError::BadPacket(_))));
        let s = Packet1D::Stationary { state: nd::Array1::zeros(11), momentum: 0.0 };
        assert!(matches!(s.validate(&grid), Err(ModelError::Length(_))));
        let empty: Vec<Packet1D> = Vec::new();
        let psi = superpose(&grid, &empty).unwrap();
        assert!(psi.iter().all(|z| *z == C64::from(0.0)));
    }
}
