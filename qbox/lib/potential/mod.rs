//! Static potentials: tagged shape variants sampled over a grid, and the
//! accumulator holding the superposition of all active potentials.
//!
//! Every shape is a pure function of its parameters and the grid, so removing
//! a potential subtracts exactly the field that was added for it.

use std::fmt;
use log::debug;
use ndarray as nd;
use crate::{
    error::ModelError,
    grid::Grid,
};

pub mod line;
pub mod plane;

pub use line::{ Lattice, Shape1D };
pub use plane::{ Potential2D, Shape2D };

/// A potential variant that can be sampled over a grid.
pub trait PotentialShape: Clone + fmt::Debug + Send + Sync + 'static {
    /// Grid type over which the shape is defined.
    type Grid: Grid;

    /// Sample the potential (user energy units) over the grid.
    fn sample(&self, grid: &Self::Grid)
        -> Result<nd::Array<f64, <Self::Grid as Grid>::Dim>, ModelError>;

    /// Whether the shape contributes to the imaginary (absorbing) part of the
    /// potential.
    fn is_imaginary(&self) -> bool { false }
}

/// Bound a potential value to `[-bound, bound]`.
///
/// Applied to static potential values before they enter Hamiltonian
/// coefficients so that singular shapes cannot destabilize a fixed time step.
pub fn clamp(v: f64, bound: f64) -> f64 { v.max(-bound).min(bound) }

fn check_finite<D: nd::Dimension>(field: &nd::Array<f64, D>) -> Result<(), ModelError> {
    field.iter().all(|v| v.is_finite()).then_some(())
        .ok_or_else(|| ModelError::BadShape("sampled to non-finite values".into()))
}

/// Handle to a potential held in a [`StaticPotential`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PotentialId(u64);

/// Superposition of all active potentials over a fixed grid, kept as separate
/// real and imaginary fields.
#[derive(Clone, Debug)]
pub struct StaticPotential<S: PotentialShape> {
    grid: S::Grid,
    real: nd::Array<f64, <S::Grid as Grid>::Dim>,
    imag: nd::Array<f64, <S::Grid as Grid>::Dim>,
    entries: Vec<(PotentialId, S)>,
    next_id: u64,
}

/// Static potential over a 1D grid.
pub type LinePotential = StaticPotential<Shape1D>;

/// Static potential over a 2D grid.
pub type PlanePotential = StaticPotential<Potential2D>;

impl<S: PotentialShape> StaticPotential<S> {
    /// Create an empty (everywhere zero) potential.
    pub fn new(grid: S::Grid) -> Self {
        let dim = grid.dim();
        Self {
            grid,
            real: nd::Array::zeros(dim.clone()),
            imag: nd::Array::zeros(dim),
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub fn grid(&self) -> &S::Grid { &self.grid }

    /// Accumulated real part.
    pub fn real(&self) -> &nd::Array<f64, <S::Grid as Grid>::Dim> { &self.real }

    /// Accumulated imaginary part.
    pub fn imag(&self) -> &nd::Array<f64, <S::Grid as Grid>::Dim> { &self.imag }

    /// Return `true` if any active shape is imaginary.
    pub fn has_imaginary(&self) -> bool {
        self.entries.iter().any(|(_, s)| s.is_imaginary())
    }

    /// Number of active potentials.
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Iterate over the active potentials.
    pub fn iter(&self) -> impl Iterator<Item = (PotentialId, &S)> + '_ {
        self.entries.iter().map(|(id, s)| (*id, s))
    }

    fn target(&mut self, imaginary: bool)
        -> &mut nd::Array<f64, <S::Grid as Grid>::Dim>
    {
        if imaginary { &mut self.imag } else { &mut self.real }
    }

    /// Superpose a new potential onto the accumulated field.
    pub fn add(&mut self, shape: S) -> Result<PotentialId, ModelError> {
        let field = shape.sample(&self.grid)?;
        self.grid.check_shape(field.shape())?;
        check_finite(&field)?;
        *self.target(shape.is_imaginary()) += &field;
        let id = PotentialId(self.next_id);
        self.next_id += 1;
        debug!("potential: added {:?} as {:?}", shape, id);
        self.entries.push((id, shape));
        Ok(id)
    }

    /// Remove a potential, subtracting its field. Returns `None` if `id` is
    /// not active.
    pub fn remove(&mut self, id: PotentialId) -> Result<Option<S>, ModelError> {
        let Some(k) = self.entries.iter().position(|(idk, _)| *idk == id)
            else { return Ok(None); };
        let field = self.entries[k].1.sample(&self.grid)?;
        let (_, shape) = self.entries.remove(k);
        *self.target(shape.is_imaginary()) -= &field;
        debug!("potential: removed {:?}", id);
        Ok(Some(shape))
    }

    /// Replace a potential with a new shape, keeping its handle.
    pub fn replace(&mut self, id: PotentialId, shape: S)
        -> Result<Option<S>, ModelError>
    {
        let Some(k) = self.entries.iter().position(|(idk, _)| *idk == id)
            else { return Ok(None); };
        let new = shape.sample(&self.grid)?;
        self.grid.check_shape(new.shape())?;
        check_finite(&new)?;
        let old = self.entries[k].1.sample(&self.grid)?;
        let prev = std::mem::replace(&mut self.entries[k].1, shape);
        *self.target(prev.is_imaginary()) -= &old;
        let imaginary = self.entries[k].1.is_imaginary();
        *self.target(imaginary) += &new;
        Ok(Some(prev))
    }

    /// Remove all potentials.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.real.fill(0.0);
        self.imag.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{ Grid1, Grid2 };

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(7.0, 5.0), 5.0);
        assert_eq!(clamp(-7.0, 5.0), -5.0);
        assert_eq!(clamp(1.5, 5.0), 1.5);
        assert_eq!(clamp(f64::NEG_INFINITY, 5.0), -5.0);
        assert_eq!(clamp(3.0, f64::INFINITY), 3.0);
    }

    #[test]
    fn add_then_remove_restores_zero() {
        let grid = Grid1::new(200, -10.0, 10.0).unwrap();
        let mut pot = LinePotential::new(grid);
        let id = pot.add(Shape1D::MorseWell { d: 4.0, alpha: 1.0, depth: -1.0 })
            .unwrap();
        assert!(pot.real().iter().any(|v| *v != 0.0));
        let shape = pot.remove(id).unwrap();
        assert!(matches!(shape, Some(Shape1D::MorseWell { .. })));
        assert!(pot.real().iter().all(|v| *v == 0.0));
        assert!(pot.remove(id).unwrap().is_none());
    }

    #[test]
    fn ion_on_grid_point_round_trips() {
        // x = 0 and y = 0 fall exactly on grid points
        let grid = Grid2::new((10, 10), (-1.0, 1.0), (-1.0, 1.0)).unwrap();
        let mut pot = PlanePotential::new(grid);
        let bare = Potential2D::real(Shape2D::Ionic {
            center: (0.0, 0.0), charge: 1.0, offset: 0.0, probe: -1.0 });
        assert!(matches!(pot.add(bare), Err(ModelError::BadShape(_))));
        assert!(pot.is_empty());
        assert!(pot.real().iter().all(|v| *v == 0.0));

        let soft = Potential2D::real(Shape2D::Ionic {
            center: (0.0, 0.0), charge: 1.0, offset: 0.05, probe: -1.0 });
        let id = pot.add(soft).unwrap();
        assert!(pot.real().iter().all(|v| v.is_finite()));
        assert_eq!(pot.real()[[5, 5]], 0.0);
        assert!(pot.real()[[6, 5]] < 0.0);
        pot.remove(id).unwrap();
        assert!(pot.is_empty());
        assert!(pot.real().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn non_finite_samples_rejected() {
        let grid = Grid1::new(5, 0.0, 5.0).unwrap();
        let mut pot = LinePotential::new(grid);
        let bad = Shape1D::Custom { values: vec![0.0, 1.0, f64::NAN, 1.0, 0.0] };
        assert!(matches!(pot.add(bad.clone()), Err(ModelError::BadShape(_))));
        let id = pot.add(Shape1D::Custom { values: vec![1.0; 5] }).unwrap();
        assert!(pot.replace(id, bad).is_err());
        assert!(pot.real().iter().all(|v| *v == 1.0));
    }

    #[test]
    fn superposition_is_linear() {
        let grid = Grid2::new((32, 24), (-4.0, 4.0), (-3.0, 3.0)).unwrap();
        let a = Potential2D::real(Shape2D::Elliptical {
            center: (0.0, 0.0), rx: 2.0, ry: 1.0, energy: 0.7 });
        let b = Potential2D::real(Shape2D::Rectangular {
            center: (1.0, 0.5), lx: 2.0, ly: 2.0, corner_radius: 0.0, energy: -0.3 });
        let c = Potential2D::imaginary(Shape2D::Annular {
            center: (0.0, 0.0), outer: (3.0, 3.0), inner: (2.5, 2.5), energy: 0.1 });
        let mut pot = PlanePotential::new(grid.clone());
        let ida = pot.add(a).unwrap();
        pot.add(b.clone()).unwrap();
        pot.add(c).unwrap();
        assert!(pot.has_imaginary());
        pot.remove(ida).unwrap();
        let expected = b.sample(&grid).unwrap();
        nd::Zip::from(pot.real()).and(&expected)
            .for_each(|p, e| assert!((p - e).abs() < 1e-12));
        assert!(pot.imag().iter().any(|v| *v > 0.0));
        pot.clear();
        assert!(pot.is_empty());
        assert!(pot.imag().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn replace_keeps_handle() {
        let grid = Grid1::new(50, -5.0, 5.0).unwrap();
        let mut pot = LinePotential::new(grid);
        let id = pot.add(Shape1D::HarmonicOscillator { k: 0.01, offset: -1.0 })
            .unwrap();
        pot.replace(id, Shape1D::HarmonicOscillator { k: 0.0, offset: 0.5 })
            .unwrap();
        assert_eq!(pot.len(), 1);
        pot.real().iter().for_each(|v| assert!((v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn custom_length_checked() {
        let grid = Grid1::new(10, 0.0, 1.0).unwrap();
        let mut pot = LinePotential::new(grid);
        assert!(pot.add(Shape1D::Custom { values: vec![0.0; 9] }).is_err());
        assert!(pot.add(Shape1D::Custom { values: vec![0.0; 10] }).is_ok());
    }
}
