//! Alternating-direction Cayley propagation in 2D.
//!
//! Each step is split into an x-sweep (one tridiagonal solve along x for
//! every fixed y) and a y-sweep (along y for every fixed x). Each sweep
//! carries the kinetic term along its axis, its half of the magnetic cross
//! term, and half the potential. Lanes within a sweep are independent and
//! solved in parallel.
//!
//! With a magnetic field `B` along z in the symmetric gauge, the Hamiltonian
//! is
//! ```text
//! H = p²/2m - i (qB/2m) (y ∂x - x ∂y) + q²B² (x² + y²) / 8m + V
//! ```
//! The first-derivative terms are discretized with central differences, giving
//! Hermitian, complex off-diagonals.
//!
//! Each sweep is unitary on its own, but the composed step only approximately
//! conserves energy when a potential is present.

use log::debug;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::iter::{ IndexedParallelIterator, IntoParallelIterator, ParallelIterator };
use crate::{
    error::{ ModelError, TError },
    particle::Particle,
};
use super::{
    CayleyLane,
    Clock,
    Model2D,
    Propagator,
    Snapshot,
    TResult,
};

/// Time-independent Hamiltonian coefficients of a 2D model, in internal
/// units.
#[derive(Clone, Debug)]
pub(crate) struct PlaneCoeffs {
    pub(crate) ax: f64,
    pub(crate) ay: f64,
    pub(crate) mass: f64,
    pub(crate) xs: nd::Array1<f64>,
    pub(crate) ys: nd::Array1<f64>,
    // Ec clamp(V)
    pub(crate) real: nd::Array2<f64>,
    // Ec W; absorbs when positive
    pub(crate) imag: nd::Array2<f64>,
    pub(crate) gx: nd::Array1<f64>,
    pub(crate) gy: nd::Array1<f64>,
}

impl PlaneCoeffs {
    pub(crate) fn new(model: &Model2D) -> Self {
        let (ax, ay) = model.coupling();
        let ec = model.units.energy;
        let (gx, gy) = model.damping();
        Self {
            ax,
            ay,
            mass: model.mass_nat(),
            xs: model.grid.xaxis().coords(),
            ys: model.grid.yaxis().coords(),
            real: model.static_potential() * ec,
            imag: model.static_imaginary() * ec,
            gx,
            gy,
        }
    }

    /// Real potential at time `t` without the diamagnetic term, in internal
    /// units.
    pub(crate) fn potential(&self, model: &Model2D, t: f64) -> nd::Array2<f64> {
        match model.field_potential(t) {
            Some(f) => &self.real + &(f * model.units.energy),
            None => self.real.clone(),
        }
    }
}

/// Real-time 2D propagator.
///
/// In the default mode each sweep solves `(1 + K) ψ' = (1 - K) ψ` with half
/// the potential folded into `K`. In Suzuki mode the potential is instead
/// applied as a phase rotation `exp(-i V δt/2)` before and after a
/// kinetic-only sweep pair.
///
/// Sources fire after the step on which they are due.
pub struct Cayley2D {
    model: Model2D,
    psi: Option<nd::Array2<C64>>,
    coeffs: Option<PlaneCoeffs>,
    clock: Clock,
}

impl Cayley2D {
    /// Create a new propagator and build its initial wavefunction.
    pub fn new(model: Model2D) -> TResult<Self> {
        let mut new = Self {
            model,
            psi: None,
            coeffs: None,
            clock: Clock::default(),
        };
        new.build_wavefunction()?;
        Ok(new)
    }

    pub fn model(&self) -> &Model2D { &self.model }

    /// Mutable access to the model. All cached coefficients are rebuilt on
    /// the next step.
    pub fn model_mut(&mut self) -> &mut Model2D {
        self.coeffs = None;
        &mut self.model
    }

    /// Change the particle, invalidating mass-derived coefficients.
    pub fn set_particle(&mut self, particle: Particle) -> TResult<()> {
        ModelError::check_mass(particle.mass())?;
        self.model_mut().set_particle(particle);
        Ok(())
    }

    /// Current wavefunction, if it has not been destroyed.
    pub fn psi(&self) -> Option<&nd::Array2<C64>> { self.psi.as_ref() }
}

// multiply by exp(-i V δt/2) exp(-W δt/2)
fn rotate(
    psi: &mut nd::Array2<C64>,
    v: &nd::Array2<f64>,
    w: &nd::Array2<f64>,
    c: &PlaneCoeffs,
    dia: f64,
    hdt: f64,
) {
    nd::Zip::indexed(psi).and(v).and(w)
        .par_for_each(|(i, j), q, vk, wk| {
            let r2 = c.xs[i].powi(2) + c.ys[j].powi(2);
            let angle = -hdt * (vk + dia * r2);
            *q *= C64::from_polar((-hdt * wk).exp(), angle);
        });
}

impl Propagator for Cayley2D {
    type Dim = nd::Ix2;

    fn build_wavefunction(&mut self) -> TResult<()> {
        self.psi = Some(self.model.initial_state()?);
        self.coeffs = None;
        self.clock = Clock::default();
        Ok(())
    }

    fn step(&mut self) -> TResult<bool> {
        let Self { model, psi, coeffs, clock } = self;
        let psi = psi.as_mut().ok_or(TError::Destroyed)?;
        let c: &PlaneCoeffs = coeffs.get_or_insert_with(|| PlaneCoeffs::new(model));
        let (nx, ny) = psi.dim();
        let (dx, dy) = (model.grid.dx(), model.grid.dy());
        let t = clock.time;
        let dt = model.dt;
        let hdt = 0.5 * dt;
        let v = c.potential(model, t);
        let w = &c.imag;
        let qb = model.qb(t);
        let dia = model.diamagnetic(t);
        let suzuki = model.suzuki;
        // in Suzuki mode, potential terms leave the sweeps
        let vfrac = if suzuki { 0.0 } else { 0.5 };
        let dfrac = if suzuki { 0.0 } else { 1.0 };

        if suzuki { rotate(psi, &v, w, c, dia, hdt); }

        // x-sweep over each column psi[:, j]
        let offx = C64::new(0.0, -hdt * c.ax);
        psi.axis_iter_mut(nd::Axis(1))
            .into_par_iter()
            .enumerate()
            .try_for_each_init(
                || CayleyLane::new(nx),
                |lane, (j, mut col)| -> TResult<()> {
                    let kb = hdt * qb * c.ys[j] / (4.0 * c.mass * dx);
                    lane.lo.iter_mut().for_each(|l| { *l = offx - kb; });
                    lane.up.iter_mut().for_each(|u| { *u = offx + kb; });
                    lane.di.iter_mut().enumerate()
                        .for_each(|(i, d)| {
                            let h = 2.0 * c.ax
                                + vfrac * v[[i, j]]
                                + dfrac * dia * c.xs[i].powi(2);
                            let g = c.gx[i] + vfrac * hdt * w[[i, j]];
                            *d = C64::new(g, hdt * h);
                        });
                    lane.advance(&mut col)
                },
            )?;

        // y-sweep over each row psi[i, :]
        let offy = C64::new(0.0, -hdt * c.ay);
        psi.axis_iter_mut(nd::Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each_init(
                || CayleyLane::new(ny),
                |lane, (i, mut row)| -> TResult<()> {
                    let kb = hdt * qb * c.xs[i] / (4.0 * c.mass * dy);
                    lane.lo.iter_mut().for_each(|l| { *l = offy + kb; });
                    lane.up.iter_mut().for_each(|u| { *u = offy - kb; });
                    lane.di.iter_mut().enumerate()
                        .for_each(|(j, d)| {
                            let h = 2.0 * c.ay
                                + vfrac * v[[i, j]]
                                + dfrac * dia * c.ys[j].powi(2);
                            let g = c.gy[j] + vfrac * hdt * w[[i, j]];
                            *d = C64::new(g, hdt * h);
                        });
                    lane.advance(&mut row)
                },
            )?;

        if suzuki { rotate(psi, &v, w, c, dia, hdt); }

        let due = clock.tick(dt, model.output_interval);
        model.emit_sources(psi, clock);
        Ok(due)
    }

    fn time(&self) -> f64 { self.clock.time }

    fn steps(&self) -> usize { self.clock.steps }

    fn snapshot(&self) -> TResult<Snapshot<nd::Ix2>> {
        let psi = self.psi.as_ref().ok_or(TError::Destroyed)?;
        Ok(self.model.snapshot(psi, &self.clock))
    }

    fn reset(&mut self) -> TResult<()> {
        debug!("Cayley2D: reset");
        self.build_wavefunction()
    }

    fn destroy(&mut self) {
        debug!("Cayley2D: destroy");
        self.psi = None;
        self.coeffs = None;
    }

    fn output_interval(&self) -> usize { self.model.output_interval }

    fn set_output_interval(&mut self, n: usize) -> TResult<()> {
        ModelError::check_interval(n)?;
        self.model.output_interval = n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::{
        boundary::Boundary,
        field::MagneticField,
        grid::Grid2,
        packet::Packet2D,
        potential::{ Potential2D, Shape2D },
        source::Source,
        timedep::Diagnostics,
        units::Units,
        utils::{ wf_dot, wf_norm },
    };

    fn free_model() -> Model2D {
        let grid = Grid2::new((96, 96), (-12.0, 12.0), (-12.0, 12.0)).unwrap();
        Model2D::new(grid, Particle::new(1.0, 1.0).unwrap(), 0.01).unwrap()
            .with_units(Units::natural())
            .with_packet(Packet2D::Gaussian {
                magnitude: 1.0,
                sigma: 2.0,
                center: (0.0, 0.0),
                momentum: (1.0, 0.5),
            })
            .unwrap()
    }

    #[test]
    fn unitary_with_potential_and_field() {
        let model = free_model()
            .with_shape(Potential2D::real(Shape2D::Harmonic {
                center: (0.0, 0.0), k: 0.1, offset: 0.0 }))
            .unwrap()
            .with_bfield(MagneticField::constant(0.3));
        let mut prop = Cayley2D::new(model).unwrap();
        prop.run_steps(100).unwrap();
        assert_abs_diff_eq!(wf_norm(prop.psi().unwrap()), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn free_momentum_constant() {
        let mut prop = Cayley2D::new(free_model()).unwrap();
        let p0 = prop.snapshot().unwrap().expectation.unwrap().momentum;
        prop.run_steps(100).unwrap();
        let p1 = prop.snapshot().unwrap().expectation.unwrap().momentum;
        assert_abs_diff_eq!(p0[0], p1[0], epsilon = 1e-6);
        assert_abs_diff_eq!(p0[1], p1[1], epsilon = 1e-6);
    }

    #[test]
    fn magnetic_field_bends_momentum() {
        let grid = Grid2::new((128, 128), (-16.0, 16.0), (-16.0, 16.0)).unwrap();
        let model = Model2D::new(grid, Particle::new(1.0, 1.0).unwrap(), 0.01).unwrap()
            .with_units(Units::natural())
            .with_bfield(MagneticField::constant(0.5))
            .with_packet(Packet2D::Gaussian {
                magnitude: 1.0, sigma: 2.0, center: (0.0, 0.0), momentum: (2.0, 0.0) })
            .unwrap();
        let mut prop = Cayley2D::new(model).unwrap();
        prop.run_steps(50).unwrap();
        // canonical p_y drifts as -q B v_x t / 2
        let p = prop.snapshot().unwrap().expectation.unwrap().momentum;
        assert!(p[1] < -0.15 && p[1] > -0.35, "p_y = {}", p[1]);
    }

    #[test]
    fn absorbing_boundaries_dissipate() {
        let model = free_model()
            .with_boundaries(Boundary::absorbing_plane(), Boundary::absorbing_plane())
            .unwrap();
        let mut prop = Cayley2D::new(model).unwrap();
        prop.model_mut().clear_packets();
        prop.model_mut()
            .add_packet(Packet2D::Gaussian {
                magnitude: 1.0, sigma: 1.5, center: (6.0, 0.0), momentum: (3.0, 0.0) })
            .unwrap();
        prop.reset().unwrap();
        let mut last = wf_norm(prop.psi().unwrap());
        for _ in 0..300 {
            prop.step().unwrap();
            let norm = wf_norm(prop.psi().unwrap());
            assert!(norm <= last + 1e-12);
            last = norm;
        }
        assert!(last < 0.9);
    }

    #[test]
    fn suzuki_close_to_plain() {
        let model = free_model()
            .with_shape(Potential2D::real(Shape2D::Harmonic {
                center: (0.0, 0.0), k: 0.05, offset: 0.0 }))
            .unwrap();
        let mut plain = Cayley2D::new(model.clone()).unwrap();
        let mut suzuki = Cayley2D::new(model.with_suzuki(true)).unwrap();
        plain.run_steps(50).unwrap();
        suzuki.run_steps(50).unwrap();
        assert_abs_diff_eq!(wf_norm(suzuki.psi().unwrap()), 1.0, epsilon = 1e-10);
        let overlap = wf_dot(plain.psi().unwrap(), suzuki.psi().unwrap()).norm();
        assert!(overlap > 0.999);
    }

    #[test]
    fn sources_fire_on_schedule() {
        let grid = Grid2::new((32, 32), (-4.0, 4.0), (-4.0, 4.0)).unwrap();
        let model = Model2D::new(grid, Particle::default(), 0.01).unwrap()
            .with_source(Source::point((0.0, 0.0), 0.5).with_period(0.05))
            .unwrap();
        let mut prop = Cayley2D::new(model).unwrap();
        assert_eq!(wf_norm(prop.psi().unwrap()), 0.0);
        prop.run_steps(4).unwrap();
        assert_eq!(wf_norm(prop.psi().unwrap()), 0.0);
        prop.step().unwrap();
        let after_first = wf_norm(prop.psi().unwrap());
        assert!(after_first > 0.0);
        prop.run_steps(5).unwrap();
        assert!(wf_norm(prop.psi().unwrap()) > after_first);
    }

    #[test]
    fn snapshot_carries_phase_and_current() {
        let model = free_model()
            .with_diagnostics(Diagnostics {
                current_stride: Some(4),
                ..Default::default()
            })
            .unwrap();
        let mut prop = Cayley2D::new(model).unwrap();
        assert!(!prop.step().unwrap());
        assert!(prop.step().unwrap());
        let snap = prop.snapshot().unwrap();
        assert_eq!(snap.step, 2);
        assert_eq!(snap.phase.unwrap().dim(), (96, 96));
        assert_eq!(snap.current.unwrap().shape(), &[24, 24, 2]);
    }
}
