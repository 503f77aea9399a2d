//! One-dimensional potential shapes.
//!
//! Oscillator- and Coulomb-type shapes are centered on the grid; barrier and
//! well shapes carry an explicit center.

use ndarray as nd;
use serde::Deserialize;
use crate::{
    error::{ LengthError, ModelError },
    grid::Grid1,
};
use super::PotentialShape;

fn zero() -> f64 { 0.0 }

fn neg_one() -> f64 { -1.0 }

fn def_k_harmonic() -> f64 { 0.01 }

fn def_well_width() -> f64 { 10.0 }

fn def_barrier_width() -> f64 { 1.0 }

fn def_barrier_height() -> f64 { 0.1 }

fn def_bell_width() -> f64 { 2.0 }

fn def_bell_height() -> f64 { 0.01 }

fn def_morse_d() -> f64 { 4.0 }

fn one() -> f64 { 1.0 }

fn def_k_array() -> f64 { 0.1 }

fn def_quartic_a() -> (f64, f64) { (-2.0, 2.0) }

fn def_quartic_v0() -> f64 { 0.5 }

/// Arrangement of ions in a [`Shape1D::CoulombWellArray`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lattice {
    /// Evenly spaced identical ions.
    #[default]
    Regular,
    /// One ion missing.
    Vacancy,
    /// One extra ion halfway between two lattice sites.
    Interstitial,
    /// Alternating weak and strong ions.
    BinaryLattice,
}

/// One-dimensional potential shapes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape1D {
    /// `depth` within `width` of `center`, `height` outside.
    SquareWell {
        #[serde(default = "zero")]
        center: f64,
        #[serde(default = "def_well_width")]
        width: f64,
        depth: f64,
        height: f64,
    },
    /// Zero within `width` of `center`, `-height` outside.
    SquareBarrier {
        #[serde(default = "zero")]
        center: f64,
        #[serde(default = "def_barrier_width")]
        width: f64,
        #[serde(default = "def_barrier_height")]
        height: f64,
    },
    /// Well of `well_width` flanked by barriers of `barrier_width`, with a
    /// linear tilt `field` about the grid center.
    SquareQuantumWell {
        #[serde(default = "zero")]
        center: f64,
        #[serde(default = "zero")]
        field: f64,
        barrier_width: f64,
        well_width: f64,
        barrier_height: f64,
        well_depth: f64,
    },
    /// Gaussian bump `height * (exp(-(x - center)² / width²) - 1)`.
    BellBarrier {
        #[serde(default = "zero")]
        center: f64,
        #[serde(default = "def_bell_width")]
        width: f64,
        #[serde(default = "def_bell_height")]
        height: f64,
    },
    /// `k x² + offset` about the grid center.
    HarmonicOscillator {
        #[serde(default = "def_k_harmonic")]
        k: f64,
        #[serde(default = "neg_one")]
        offset: f64,
    },
    /// Like [`Self::HarmonicOscillator`], ten times stiffer to the left of
    /// the center.
    AnharmonicOscillator {
        #[serde(default = "def_k_harmonic")]
        k: f64,
        #[serde(default = "neg_one")]
        offset: f64,
    },
    /// `d (1 - exp(-alpha x))² + depth` about the grid center.
    MorseWell {
        #[serde(default = "def_morse_d")]
        d: f64,
        #[serde(default = "one")]
        alpha: f64,
        #[serde(default = "neg_one")]
        depth: f64,
    },
    /// `-k / |x|` about the grid center, floored at `floor`.
    CoulombWell {
        #[serde(default = "one")]
        k: f64,
        #[serde(default = "neg_one")]
        floor: f64,
    },
    /// A row of `ions` Coulomb wells spaced by `lattice_constant` about the
    /// grid center, plus a static tilt `field x`, floored at `floor`.
    ///
    /// `defect` selects the vacancy/interstitial site and defaults to the
    /// middle ion.
    CoulombWellArray {
        ions: usize,
        lattice_constant: f64,
        #[serde(default = "zero")]
        field: f64,
        #[serde(default)]
        lattice: Lattice,
        #[serde(default)]
        defect: Option<usize>,
        #[serde(default = "def_k_array")]
        k: f64,
        #[serde(default = "neg_one")]
        floor: f64,
    },
    /// `count` single-cell spikes of `depth`, `separation` apart, centered on
    /// the grid.
    DiracComb {
        count: usize,
        separation: f64,
        #[serde(default = "neg_one")]
        depth: f64,
    },
    /// `v0 (x² - a²)² / a⁴` about the grid center, with `a` taken from
    /// `minima.0` left of center and `minima.1` right of it, plus a tilt
    /// `asymmetry x`.
    QuarticDoubleWell {
        #[serde(default = "zero")]
        asymmetry: f64,
        #[serde(default = "def_quartic_a")]
        minima: (f64, f64),
        #[serde(default = "def_quartic_v0")]
        v0: f64,
    },
    /// Tabulated values, one per grid point.
    Custom { values: Vec<f64> },
}

impl Shape1D {
    // locations of the Coulomb centers in a well array, with their strengths
    fn ion_sites(
        center: f64,
        ions: usize,
        a: f64,
        lattice: Lattice,
        defect: Option<usize>,
        k: f64,
    ) -> Vec<(f64, f64)>
    {
        let half = (ions / 2) as f64;
        let shift = if ions % 2 == 0 { 0.5 } else { 0.0 };
        let loc = |j: usize| center + (j as f64 - half + shift) * a;
        let defect = defect.unwrap_or(if ions < 3 { 0 } else { ions / 2 });
        let mut sites: Vec<(f64, f64)>
            = (0..ions)
            .filter(|j| !(lattice == Lattice::Vacancy && *j == defect))
            .map(|j| {
                let strength
                    = if lattice == Lattice::BinaryLattice {
                        (0.5 + (j % 2) as f64 * 2.0) * k
                    } else {
                        k
                    };
                (loc(j), strength)
            })
            .collect();
        if lattice == Lattice::Interstitial && defect < ions {
            sites.push((loc(defect) + 0.5 * a, k));
        }
        sites
    }
}

impl PotentialShape for Shape1D {
    type Grid = Grid1;

    fn sample(&self, grid: &Grid1) -> Result<nd::Array1<f64>, ModelError> {
        let c = grid.center();
        let x = grid.coords();
        let v: nd::Array1<f64>
            = match self {
                Self::SquareWell { center, width, depth, height } => {
                    x.mapv(|xk| {
                        if (xk - center).abs() <= 0.5 * width { *depth }
                        else { *height }
                    })
                },
                Self::SquareBarrier { center, width, height } => {
                    x.mapv(|xk| {
                        if (xk - center).abs() <= 0.5 * width { 0.0 }
                        else { -height }
                    })
                },
                Self::SquareQuantumWell {
                    center,
                    field,
                    barrier_width,
                    well_width,
                    barrier_height,
                    well_depth,
                } => {
                    let w2 = 0.5 * (barrier_width + well_width);
                    x.mapv(|xk| {
                        let r = (xk - center).abs();
                        if r < 0.5 * well_width {
                            well_depth + field * (xk - c)
                        } else if r < w2 {
                            barrier_height + field * (xk - c)
                        } else {
                            0.0
                        }
                    })
                },
                Self::BellBarrier { center, width, height } => {
                    x.mapv(|xk| {
                        let u = (xk - center) / width;
                        height * ((-u * u).exp() - 1.0)
                    })
                },
                Self::HarmonicOscillator { k, offset } => {
                    x.mapv(|xk| k * (xk - c).powi(2) + offset)
                },
                Self::AnharmonicOscillator { k, offset } => {
                    x.mapv(|xk| {
                        let kk = if xk < c { 10.0 * k } else { *k };
                        kk * (xk - c).powi(2) + offset
                    })
                },
                Self::MorseWell { d, alpha, depth } => {
                    x.mapv(|xk| {
                        let y = 1.0 - (-alpha * (xk - c)).exp();
                        d * y * y + depth
                    })
                },
                Self::CoulombWell { k, floor } => {
                    x.mapv(|xk| (-k / (xk - c).abs()).max(*floor))
                },
                Self::CoulombWellArray {
                    ions,
                    lattice_constant,
                    field,
                    lattice,
                    defect,
                    k,
                    floor,
                } => {
                    let sites = Self::ion_sites(
                        c, *ions, *lattice_constant, *lattice, *defect, *k);
                    x.mapv(|xk| {
                        let v: f64
                            = sites.iter()
                            .map(|(loc, kj)| -kj / (xk - loc).abs())
                            .sum();
                        (v + field * xk).max(*floor)
                    })
                },
                Self::DiracComb { count, separation, depth } => {
                    let length = grid.xmax() - grid.xmin();
                    let offset = 0.5 * (length - separation * *count as f64);
                    let interval = ((separation / grid.dx()).round() as usize).max(1);
                    let lo = grid.xmin() + offset;
                    let hi = grid.xmax() - offset;
                    x.iter().enumerate()
                        .map(|(i, xk)| {
                            if *xk >= lo && *xk <= hi && i % interval == 0 {
                                *depth
                            } else {
                                0.0
                            }
                        })
                        .collect()
                },
                Self::QuarticDoubleWell { asymmetry, minima, v0 } => {
                    x.mapv(|xk| {
                        let u = xk - c;
                        let a = if u < 0.0 { minima.0 } else { minima.1 };
                        let a2 = a * a;
                        v0 * (u * u - a2).powi(2) / (a2 * a2) + asymmetry * u
                    })
                },
                Self::Custom { values } => {
                    LengthError::check_len(grid.n(), values.len())?;
                    nd::Array1::from_vec(values.clone())
                },
            };
        Ok(v)
    }
}
