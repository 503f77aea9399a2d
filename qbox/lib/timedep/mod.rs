//! Time-dependent propagation of wavefunctions on 1D and 2D grids.
//!
//! All propagators implement [`Propagator`], which exposes stepping, reset,
//! and immutable [`Snapshot`]s of the state and its diagnostics. Real-time
//! propagators advance `ψ` under `exp(-i H δt)`; imaginary-time propagators
//! advance under `exp(-H δτ)` and renormalize, relaxing toward the ground
//! state.
//!
//! The real-time schemes are built on the Cayley form of the propagator,
//! ```text
//! (1 + K) ψ(t + δt) = (1 - K) ψ(t)
//! K = i (δt/2) H + Γ
//! ```
//! where `Γ` is the diagonal, dimensionless absorbing-layer damping. With
//! `Γ = 0` the update is unitary. In 2D, `H` is split into x- and y-sweeps
//! (alternating-direction implicit), each a tridiagonal solve per lane.
//!
//! See [`docs`][crate::docs] for more information.

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ ModelError, TError },
    observables::{ Energy, Expectation },
    tridiag::{ apply_into, Thomas },
};

pub mod model;
pub mod cayley1d;
pub mod direct1d;
pub mod imag1d;
pub mod cayley2d;
pub mod imag2d;

pub use model::{ Model1D, Model2D };
pub use cayley1d::Cayley1D;
pub use direct1d::{ Direct1D, DirectMethod };
pub use imag1d::ImaginaryTime1D;
pub use cayley2d::Cayley2D;
pub use imag2d::ImaginaryTime2D;

pub type TResult<T> = Result<T, TError>;

/// Default number of steps between outputs for 1D propagators.
pub const OUTPUT_INTERVAL_LINE: usize = 50;

/// Default number of steps between outputs for 2D propagators.
pub const OUTPUT_INTERVAL_PLANE: usize = 2;

/// Selects which derived quantities are computed for a [`Snapshot`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    /// Position and momentum expectation values.
    pub expectation: bool,
    /// Kinetic, potential, and total energies.
    pub energy: bool,
    /// Probability current, sampled every `current_stride` points (2D only).
    pub current_stride: Option<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self { expectation: true, energy: true, current_stride: None }
    }
}

impl Diagnostics {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.current_stride {
            Some(0) => Err(ModelError::BadStride),
            _ => Ok(()),
        }
    }
}

/// Immutable record of a propagator's state at one point in time.
#[derive(Clone, Debug)]
pub struct Snapshot<D: nd::Dimension> {
    /// Simulation time.
    pub time: f64,
    /// Number of steps taken.
    pub step: usize,
    /// Total probability `Σ |ψ|²`.
    pub norm: f64,
    /// Probability density `|ψ|²`.
    pub amplitude: nd::Array<f64, D>,
    /// Phase `arg ψ` (2D only).
    pub phase: Option<nd::Array<f64, D>>,
    pub expectation: Option<Expectation>,
    pub energy: Option<Energy>,
    /// Probability current (2D only, when enabled).
    pub current: Option<nd::Array3<f64>>,
}

/// Common interface to all time-dependent propagators.
///
/// A propagator owns its model description (grid, particle, potentials,
/// fields, packets) and the wavefunction. Packets are kept so that
/// [`reset`][Self::reset] can rebuild the initial state.
pub trait Propagator: Send {
    /// Rank of the grid.
    type Dim: nd::Dimension;

    /// Sample and superpose all wave packets into a fresh, normalized
    /// wavefunction, and set the clock to zero.
    fn build_wavefunction(&mut self) -> TResult<()>;

    /// Advance by one time step, returning `true` if an output is due.
    fn step(&mut self) -> TResult<bool>;

    /// Advance by `n` time steps.
    fn run_steps(&mut self, n: usize) -> TResult<()> {
        for _ in 0..n { self.step()?; }
        Ok(())
    }

    /// Current simulation time.
    fn time(&self) -> f64;

    /// Number of steps taken since the last (re)build.
    fn steps(&self) -> usize;

    /// Capture the current state.
    fn snapshot(&self) -> TResult<Snapshot<Self::Dim>>;

    /// Rebuild the wavefunction from the stored packets and refresh all
    /// cached coefficients.
    fn reset(&mut self) -> TResult<()>;

    /// Release the wavefunction and all working arrays. Further steps fail
    /// with [`TError::Destroyed`] until the wavefunction is rebuilt.
    fn destroy(&mut self);

    /// Number of steps between outputs.
    fn output_interval(&self) -> usize;

    /// Set the number of steps between outputs.
    fn set_output_interval(&mut self, n: usize) -> TResult<()>;
}

impl<P> Propagator for Box<P>
where P: Propagator + ?Sized
{
    type Dim = P::Dim;

    fn build_wavefunction(&mut self) -> TResult<()> { (**self).build_wavefunction() }

    fn step(&mut self) -> TResult<bool> { (**self).step() }

    fn run_steps(&mut self, n: usize) -> TResult<()> { (**self).run_steps(n) }

    fn time(&self) -> f64 { (**self).time() }

    fn steps(&self) -> usize { (**self).steps() }

    fn snapshot(&self) -> TResult<Snapshot<Self::Dim>> { (**self).snapshot() }

    fn reset(&mut self) -> TResult<()> { (**self).reset() }

    fn destroy(&mut self) { (**self).destroy() }

    fn output_interval(&self) -> usize { (**self).output_interval() }

    fn set_output_interval(&mut self, n: usize) -> TResult<()> {
        (**self).set_output_interval(n)
    }
}

/// Step counter and elapsed time shared by all propagators.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct Clock {
    pub(crate) steps: usize,
    pub(crate) time: f64,
}

impl Clock {
    // returns true if an output is due after the tick
    pub(crate) fn tick(&mut self, dt: f64, interval: usize) -> bool {
        self.steps += 1;
        self.time += dt;
        self.steps % interval == 0
    }
}

/// Working arrays for one Cayley solve `(1 + K) x' = (1 - K) x` along a lane
/// of `n` points, where `K` is tridiagonal.
pub(crate) struct CayleyLane {
    /// Sub-diagonal of `K`.
    pub(crate) lo: Vec<C64>,
    /// Diagonal of `K`.
    pub(crate) di: Vec<C64>,
    /// Super-diagonal of `K`.
    pub(crate) up: Vec<C64>,
    b: Vec<C64>,
    rhs: nd::Array1<C64>,
    thomas: Thomas<C64>,
}

impl fmt::Debug for CayleyLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CayleyLane {{ n: {} }}", self.di.len())
    }
}

impl CayleyLane {
    pub(crate) fn new(n: usize) -> Self {
        let zero = C64::from(0.0);
        Self {
            lo: vec![zero; n],
            di: vec![zero; n],
            up: vec![zero; n],
            b: vec![zero; n],
            rhs: nd::Array1::zeros(n),
            thomas: Thomas::new(n),
        }
    }

    /// Advance `lane` in place using the current contents of `lo`, `di`, and
    /// `up`.
    pub(crate) fn advance<S>(&mut self, lane: &mut nd::ArrayBase<S, nd::Ix1>)
        -> TResult<()>
    where S: nd::DataMut<Elem = C64>
    {
        apply_into(&self.lo, &self.di, &self.up, lane, &mut self.rhs);
        nd::Zip::from(&mut self.rhs).and(&*lane)
            .for_each(|r, x| { *r = *x - *r; });
        self.b.iter_mut().zip(&self.di)
            .for_each(|(bk, dk)| { *bk = 1.0 + *dk; });
        self.thomas.solve_inplace(&self.lo, &self.b, &self.up, &mut self.rhs)?;
        lane.assign(&self.rhs);
        Ok(())
    }
}

/// Working arrays for one backward-Euler diffusion solve
/// `(1 + δτ H) x' = x` along a lane of `n` points, where `H` is real,
/// symmetric, and tridiagonal with constant off-diagonal.
pub(crate) struct DiffusionLane {
    /// Diagonal of `H`.
    pub(crate) di: Vec<f64>,
    off: Vec<f64>,
    scaled: Vec<f64>,
    b: Vec<f64>,
    thomas: Thomas<f64>,
}

impl DiffusionLane {
    /// `coupling` is the off-diagonal of `H` (i.e. `-a`).
    pub(crate) fn new(n: usize, coupling: f64) -> Self {
        Self {
            di: vec![0.0; n],
            off: vec![coupling; n],
            scaled: vec![0.0; n],
            b: vec![0.0; n],
            thomas: Thomas::new(n),
        }
    }

    pub(crate) fn relax<S>(&mut self, dtau: f64, lane: &mut nd::ArrayBase<S, nd::Ix1>)
        -> TResult<()>
    where S: nd::DataMut<Elem = f64>
    {
        self.scaled.iter_mut().zip(&self.off)
            .for_each(|(sk, ok)| { *sk = dtau * ok; });
        self.b.iter_mut().zip(&self.di)
            .for_each(|(bk, dk)| { *bk = 1.0 + dtau * dk; });
        self.thomas.solve_inplace(&self.scaled, &self.b, &self.scaled, lane)?;
        Ok(())
    }
}
