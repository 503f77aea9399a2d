//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Units](#units)
//! - [Stationary states](#stationary-states)
//! - [Time dependence](#time-dependence)
//! - [Two dimensions](#two-dimensions)
//! - [Imaginary time](#imaginary-time)
//! - [Absorbing layers](#absorbing-layers)
//!
//! # Background
//! Everything in this crate works with the Schrödinger equation for a single
//! particle of mass *m* and charge *q*,
//! ```text
//!   ∂ψ     1
//! i -- = - --- ∇²ψ + V ψ
//!   ∂t     2 m
//! ```
//! discretized on a regular grid
//! ```text
//! x[i] = xmin + i δx, i ∊ {0, ..., N - 1}
//! δx = (xmax - xmin) / N
//! ```
//! with the three-point stencil for the second derivative,
//! ```text
//!          ψ[i + 1] - 2 ψ[i] + ψ[i - 1]
//! ∂²ψ[i] ≈ ----------------------------
//!                      δx²
//! ```
//! The wavefunction is taken to vanish just outside the grid. With the kinetic
//! coupling *a* = 1/(2 *m* *δx*²), the discrete Hamiltonian is the real,
//! symmetric, tridiagonal matrix
//! ```text
//! H[i, i] = 2 a + V[i]
//! H[i, i ± 1] = -a
//! ```
//! All schemes below reduce to solving or applying matrices of this shape, so
//! a single step costs *O*(*N*) work per line of the grid.
//!
//! # Units
//! Internally, *ħ* = 1. Masses and energies supplied by the user are taken to
//! the internal system by a pair of converters (see
//! [`Units`][crate::units::Units]),
//! ```text
//! m_int = m · c_m
//! V_int = V · c_E
//! ```
//! The defaults, *c*<sub>*m*</sub> = 16.6/1.0545726 and *c*<sub>*E*</sub> =
//! 1.6/1.0545726, correspond to lengths in nanometers, times in femtoseconds,
//! masses in units of 10⁻²⁸ kg, and energies in units of 10⁻¹⁹ J. Under these
//! defaults, an electron has mass 0.910938188/1.66. Choosing
//! [`Units::natural`][crate::units::Units::natural] makes both converters 1.
//!
//! Energies reported by the solvers and in snapshots are always divided by
//! *c*<sub>*E*</sub>, i.e. they are expressed in user units.
//!
//! Potentials are clamped to a symmetric range (±5 by default) before entering
//! the Hamiltonian. This keeps singular shapes like Coulomb wells from
//! producing stiff diagonals.
//!
//! # Stationary states
//! Since *H* is real, symmetric, and tridiagonal, its lowest eigenpairs can be
//! found by QL iteration with implicit shifts. Eigenvalues come out
//! in arbitrary order and are sorted afterward; eigenvectors are accumulated
//! from the plane rotations when requested and normalized so that
//! Σ *ψ*[*i*]² = 1.
//!
//! # Time dependence
//! The formal solution over one step is *ψ*(*t* + *δt*) = exp(-*i* *H* *δt*)
//! *ψ*(*t*). Replacing the exponential with its Cayley (Padé 1/1) form
//! ```text
//!                     1 - i H δt/2
//! exp(-i H δt)  ≈  --------------
//!                     1 + i H δt/2
//! ```
//! gives the Crank-Nicolson scheme,
//! ```text
//! (1 + i H δt/2) ψ(t + δt) = (1 - i H δt/2) ψ(t)
//! ```
//! which is second-order accurate, unconditionally stable, and exactly unitary
//! for Hermitian *H*. The right-hand side is a tridiagonal product and the
//! left-hand side a tridiagonal solve (see [`tridiag`][crate::tridiag]).
//!
//! For comparison, the direct schemes apply *H* explicitly,
//! ```text
//! dψ/dt = -i H ψ
//! ```
//! with either the classic fourth-order Runge-Kutta or the midpoint rule.
//! These are only conditionally stable: the step must be well below the
//! inverse of the largest eigenvalue of *H*, which grows as 1/*δx*².
//!
//! A uniform electric field of strength *E* contributes *-q E x* to the
//! potential. The SLK friction term adds a potential proportional to the
//! deviation of the local phase from its |*ψ*|²-weighted mean, damping
//! phase gradients and with them the kinetic energy.
//!
//! # Two dimensions
//! In two dimensions, *H* = *H*<sub>*x*</sub> + *H*<sub>*y*</sub> is no longer
//! tridiagonal. Splitting each Cayley step into an x-sweep and a y-sweep,
//! ```text
//! (1 + i H_x δt/2) ψ'          = (1 - i H_x δt/2) ψ(t)
//! (1 + i H_y δt/2) ψ(t + δt)   = (1 - i H_y δt/2) ψ'
//! ```
//! with each sweep carrying half the potential, keeps every solve tridiagonal
//! along one axis. Lines along the same axis are independent and are
//! processed in parallel. The splitting error is *O*(*δt*²) per unit time, so
//! energy is conserved only approximately, unlike the 1D scheme.
//!
//! A magnetic field *B* along *z* enters through the symmetric gauge
//! *A* = (*B*/2)(-*y*, *x*), expanding the kinetic term as
//! ```text
//! (p - q A)²       p²      q B               q² B²
//! ----------  =  ---  -  --- (x p_y - y p_x) + ----- (x² + y²)
//!    2 m         2 m     2 m                   8 m
//! ```
//! The cross term is a first-order derivative along the sweep axis at fixed
//! transverse coordinate, which adds antisymmetric off-diagonal terms
//! ±*q* *B* *y* / (4 *m* *δx*) to the x-sweep (and similarly for y). The
//! diamagnetic term is diagonal.
//!
//! In Suzuki mode, the diagonal parts (potential, imaginary potential, and
//! diamagnetic term) are removed from the sweeps and applied instead as
//! pointwise factors exp(-*i* *V* *δt*/2) exp(-*W* *δt*/2) before and after
//! the pair of sweeps, which are then purely kinetic.
//!
//! An imaginary potential *W* ≥ 0 enters as *V* - *i* *W*, which absorbs
//! probability at a rate proportional to *W*.
//!
//! # Imaginary time
//! Substituting *t* → -*i* *τ* turns the Schrödinger equation into a diffusion
//! equation, dψ/dτ = -*H* ψ, under which every eigencomponent decays as
//! exp(-*E*<sub>*n*</sub> *τ*). Excited components decay faster than the
//! ground state, so after renormalization any state with nonzero ground-state
//! overlap relaxes toward it. Each step here is the implicit update
//! ```text
//! (1 + H δτ) ψ(τ + δτ) = ψ(τ)
//! ```
//! which is unconditionally stable and shares the tridiagonal structure of
//! the real-time schemes; in two dimensions it is split into sweeps in the
//! same way. Degenerate ground states are not resolved: the result depends on
//! the initial state.
//!
//! # Absorbing layers
//! An outgoing wave reflects from the edge of the grid. To suppress this, a
//! layer covering a fraction *f* of each end of an axis adds a damping term
//! Γ to the diagonal of the Cayley matrices,
//! ```text
//! K = i H δt/2 + Γ
//! (1 + K) ψ(t + δt) = (1 - K) ψ(t)
//! ```
//! where Γ grows linearly with depth into the layer, reaching its maximum at
//! the grid edge. Γ vanishes in the interior, where the update
//! stays unitary. A damped cell loses a factor (1 - Γ)/(1 + Γ) ≈ exp(-2Γ) per
//! step, so the direct schemes add -2Γ to their generator.
