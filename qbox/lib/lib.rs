#![allow(non_snake_case)]

//! Provides functions and higher-level constructs for the simulation of a
//! single non-relativistic particle on one- and two-dimensional grids via
//! finite differences.
//!
//! Provides implementations for the following numerical routines:
//! - Time-independent:
//!     - Lowest eigenpairs of the three-point Hamiltonian by symmetric
//!       tridiagonal QL iteration with implicit shifts
//! - Time-dependent:
//!     - Crank-Nicolson (Cayley) propagation in 1D, with optional absorbing
//!       layers and SLK phase friction
//!     - Direct fourth-order Runge-Kutta and midpoint propagation in 1D
//!     - Alternating-direction implicit Cayley propagation in 2D, with
//!       electric and magnetic fields, imaginary potentials, absorbing layers,
//!       and periodic sources
//!     - Implicit imaginary-time relaxation in 1D and 2D
//!
//! Propagators can be driven directly through the
//! [`Propagator`][timedep::Propagator] trait, or on a background worker
//! through a [`Session`][session::Session]. Simulations can also be described
//! in TOML and built through [`config`].
//!
//! See [`docs`] for theoretical background.

pub mod error;
pub mod units;
pub mod grid;
pub mod particle;
pub mod tridiag;
pub mod potential;
pub mod boundary;
pub mod field;
pub mod packet;
pub mod source;
pub mod observables;
pub mod solve;
pub mod timedep;
pub mod session;
pub mod config;
pub mod utils;

pub mod docs;

pub use num_complex::{ Complex32 as C32, Complex64 as C64 };

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
