//! Stationary states of the one-dimensional, time-independent Schrödinger
//! equation.
//!
//! The Hamiltonian is discretized with the three-point stencil on a
//! [`Grid1`] with hard walls, giving a real symmetric tridiagonal matrix
//! ```text
//! H[i, i]     = 2a + clamp(V[i]) Ec
//! H[i, i ± 1] = -a
//! a = 1 / (2 m δx²)
//! ```
//! which is diagonalized by implicit QL iteration with shifts.

use std::cmp;
use log::{ debug, warn };
use ndarray::{ self as nd, s };
use crate::{
    error::{ LengthError, XError },
    grid::Grid1,
    packet::Packet1D,
    particle::Particle,
    potential::clamp,
    units::{ Units, POTENTIAL_CLAMP },
    utils::wf_renormalize,
};

pub type XResult<T> = Result<T, XError>;

/// Default number of states returned by [`StationarySolver::solve`].
pub const DEF_MAX_STATES: usize = 10;

/// Maximum number of QL iterations spent isolating each eigenvalue.
pub const MAX_QL_ITERS: usize = 30;

/// A single solution to the TISE.
///
/// This struct is usually only returned by a solver; you probably won't ever
/// instantiate it yourself. The wavefunction is allowed to be missing in the
/// case that `compute_wf = false` is passed to the solver.
#[derive(Clone, Debug)]
pub struct Solution {
    /// Energy, in user energy units.
    pub e: f64,
    /// Wavefunction, with unit norm and its largest component positive.
    pub wf: Option<nd::Array1<f64>>,
}

impl Solution {
    /// Compare two `Solution`s by their energy.
    pub fn cmp_energy(&self, other: &Self) -> Option<cmp::Ordering> {
        self.e.partial_cmp(&other.e)
    }

    /// Convert the wavefunction to an initial condition for a 1D propagator,
    /// boosted by `exp(i momentum x)`.
    pub fn to_packet(&self, momentum: f64) -> Option<Packet1D> {
        self.wf.as_ref()
            .map(|state| Packet1D::Stationary { state: state.clone(), momentum })
    }
}

/// Diagonalize a real symmetric tridiagonal matrix in place by implicit QL
/// iteration.
///
/// On input `d` holds the diagonal and `e[i]` the element coupling rows `i`
/// and `i + 1` (`e[n - 1]` is ignored). On output `d` holds the (unsorted)
/// eigenvalues and `e` is destroyed. If `z` is given, it must be initialized
/// to the identity and on output its `k`-th **row** is the eigenvector for
/// `d[k]`.
pub fn tqli(
    d: &mut [f64],
    e: &mut [f64],
    mut z: Option<&mut nd::Array2<f64>>,
) -> XResult<()>
{
    let n = d.len();
    LengthError::check_len(n, e.len()).map_err(|err| XError::Model(err.into()))?;
    if let Some(zz) = z.as_deref() {
        LengthError::check_len(n, zz.nrows())
            .map_err(|err| XError::Model(err.into()))?;
    }
    if n == 0 { return Ok(()); }
    e[n - 1] = 0.0;

    for l in 0..n {
        let mut iters: usize = 0;
        loop {
            let mut m = l;
            while m < n - 1 {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd { break; }
                m += 1;
            }
            if m == l { break; }
            iters += 1;
            if iters > MAX_QL_ITERS { return Err(XError::NoConvergence(l)); }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));
            let (mut sn, mut cs, mut p) = (1.0, 1.0, 0.0);
            let mut underflow = false;
            for i in (l..m).rev() {
                let f = sn * e[i];
                let b = cs * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    underflow = true;
                    break;
                }
                sn = f / r;
                cs = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * sn + 2.0 * cs * b;
                p = sn * r;
                d[i + 1] = g + p;
                g = cs * r - b;
                if let Some(zz) = z.as_deref_mut() {
                    let (mut zi, mut zj)
                        = zz.multi_slice_mut((s![i, ..], s![i + 1, ..]));
                    nd::Zip::from(&mut zi).and(&mut zj)
                        .for_each(|a, b| {
                            let f = *b;
                            *b = sn * *a + cs * f;
                            *a = cs * *a - sn * f;
                        });
                }
            }
            if underflow { continue; }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }
    Ok(())
}

/// Solver for the stationary states of a particle in a fixed 1D potential.
///
/// Solving is on demand: results are recomputed on every call to
/// [`Self::solve`], so changing the potential or particle simply means
/// calling the setters before solving again.
#[derive(Clone, Debug)]
pub struct StationarySolver {
    grid: Grid1,
    particle: Particle,
    units: Units,
    potential: nd::Array1<f64>,
    clamp: f64,
}

impl StationarySolver {
    /// Create a new solver for a potential sampled over `grid`, in user
    /// energy units.
    pub fn new(
        grid: Grid1,
        particle: Particle,
        units: Units,
        potential: nd::Array1<f64>,
    ) -> XResult<Self>
    {
        LengthError::check_len(grid.n(), potential.len())
            .map_err(|err| XError::Model(err.into()))?;
        Ok(Self { grid, particle, units, potential, clamp: POTENTIAL_CLAMP })
    }

    /// Set the bound applied to potential values; use `f64::INFINITY` to
    /// disable clamping.
    pub fn with_clamp(mut self, clamp: f64) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn grid(&self) -> &Grid1 { &self.grid }

    pub fn particle(&self) -> &Particle { &self.particle }

    pub fn set_particle(&mut self, particle: Particle) { self.particle = particle; }

    /// Replace the potential.
    pub fn set_potential(&mut self, potential: nd::Array1<f64>) -> XResult<()> {
        LengthError::check_len(self.grid.n(), potential.len())
            .map_err(|err| XError::Model(err.into()))?;
        self.potential = potential;
        Ok(())
    }

    /// Return the diagonal and off-diagonal of the Hamiltonian, in internal
    /// units.
    pub fn hamiltonian(&self) -> (nd::Array1<f64>, nd::Array1<f64>) {
        let m = self.units.to_nat_mass(self.particle.mass());
        let a = 0.5 / (m * self.grid.dx().powi(2));
        let diag: nd::Array1<f64>
            = self.potential.mapv(|v| {
                2.0 * a + self.units.to_nat_energy(clamp(v, self.clamp))
            });
        let off: nd::Array1<f64> = nd::Array1::from_elem(self.grid.n(), -a);
        (diag, off)
    }

    /// Compute the `max_states` lowest stationary states in ascending order
    /// of energy, with wavefunctions if `compute_wf` is `true`.
    pub fn solve(&self, max_states: usize, compute_wf: bool)
        -> XResult<Vec<Solution>>
    {
        let n = self.grid.n();
        XError::check_states(max_states, n)?;
        if compute_wf && max_states == 0 {
            warn!("solve: eigenvectors requested for zero states; ignoring");
        }
        let (d, e) = self.hamiltonian();
        let mut d = d.to_vec();
        let mut e = e.to_vec();
        let mut z: Option<nd::Array2<f64>>
            = (compute_wf && max_states > 0).then(|| nd::Array2::eye(n));
        tqli(&mut d, &mut e, z.as_mut())?;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| d[i].total_cmp(&d[j]));
        let sols: Vec<Solution>
            = order.into_iter()
            .take(max_states)
            .map(|k| {
                let e = self.units.from_nat_energy(d[k]);
                let wf = z.as_ref().map(|z| {
                    let mut wf = z.row(k).to_owned();
                    wf_renormalize(&mut wf);
                    let big = wf.iter().copied()
                        .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
                    if big < 0.0 { wf.mapv_inplace(|v| -v); }
                    wf
                });
                Solution { e, wf }
            })
            .collect();
        debug!("solve: found {} states on a grid of {} points", sols.len(), n);
        Ok(sols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;
    use crate::potential::{ LinePotential, Shape1D };

    #[test]
    fn clean_chain_spectrum() {
        let n = 50;
        let mut d = vec![0.0; n];
        let mut e = vec![-1.0; n];
        let mut z = nd::Array2::eye(n);
        tqli(&mut d, &mut e, Some(&mut z)).unwrap();
        d.sort_by(|a, b| a.total_cmp(b));
        let mut exact: Vec<f64>
            = (1..=n)
            .map(|k| 2.0 * (k as f64 * PI / (n as f64 + 1.0)).cos())
            .collect();
        exact.sort_by(|a, b| a.total_cmp(b));
        d.iter().zip(&exact)
            .for_each(|(dk, ek)| assert_abs_diff_eq!(dk, ek, epsilon = 1e-10));
        // eigenvectors stay orthonormal
        let g = z.dot(&z.t());
        g.indexed_iter()
            .for_each(|((i, j), gij)| {
                assert_abs_diff_eq!(*gij, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-10);
            });
    }

    #[test]
    fn eigenpairs_satisfy_hamiltonian() {
        let grid = Grid1::new(120, -6.0, 6.0).unwrap();
        let mut pot = LinePotential::new(grid.clone());
        pot.add(Shape1D::MorseWell { d: 4.0, alpha: 1.0, depth: -1.0 }).unwrap();
        let solver = StationarySolver::new(
            grid, Particle::default(), Units::default(), pot.real().clone())
            .unwrap();
        let (diag, off) = solver.hamiltonian();
        let uu = Units::default();
        let sols = solver.solve(5, true).unwrap();
        assert_eq!(sols.len(), 5);
        for sol in sols.iter() {
            let wf = sol.wf.as_ref().unwrap();
            let n = wf.len();
            let hwf: nd::Array1<f64>
                = (0..n)
                .map(|i| {
                    let mut acc = diag[i] * wf[i];
                    if i > 0 { acc += off[i - 1] * wf[i - 1]; }
                    if i + 1 < n { acc += off[i] * wf[i + 1]; }
                    acc
                })
                .collect();
            let e_nat: f64 = uu.to_nat_energy(sol.e);
            hwf.iter().zip(wf)
                .for_each(|(h, w)| assert_abs_diff_eq!(*h, e_nat * w, epsilon = 1e-8));
            let big = wf.iter().copied().fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            assert!(big > 0.0);
        }
        sols.windows(2)
            .for_each(|w| assert!(w[0].cmp_energy(&w[1]) != Some(cmp::Ordering::Greater)));
    }

    #[test]
    fn too_many_states() {
        let grid = Grid1::new(10, 0.0, 1.0).unwrap();
        let solver = StationarySolver::new(
            grid, Particle::default(), Units::natural(), nd::Array1::zeros(10))
            .unwrap();
        assert_eq!(
            solver.solve(11, false).unwrap_err(),
            XError::TooManyStates { requested: 11, dim: 10 },
        );
        assert_eq!(solver.solve(10, false).unwrap().len(), 10);
        assert!(StationarySolver::new(
            Grid1::new(10, 0.0, 1.0).unwrap(),
            Particle::default(),
            Units::natural(),
            nd::Array1::zeros(9),
        ).is_err());
    }

    #[test]
    fn stationary_packet() {
        let grid = Grid1::new(50, 0.0, 5.0).unwrap();
        let solver = StationarySolver::new(
            grid, Particle::default(), Units::natural(), nd::Array1::zeros(50))
            .unwrap();
        let sols = solver.solve(1, true).unwrap();
        let packet = sols[0].to_packet(0.0).unwrap();
        assert!(matches!(packet, Packet1D::Stationary { .. }));
        let sols = solver.solve(1, false).unwrap();
        assert!(sols[0].to_packet(0.0).is_none());
    }
}
