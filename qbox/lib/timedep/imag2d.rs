//! Imaginary-time relaxation toward the ground state in 2D.

use log::{ debug, trace };
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::iter::{ IndexedParallelIterator, IntoParallelIterator, ParallelIterator };
use crate::{
    error::{ ModelError, TError },
    particle::Particle,
    utils::{ wf_norm, wf_renormalize },
};
use super::{
    cayley2d::PlaneCoeffs,
    Clock,
    DiffusionLane,
    Model2D,
    Propagator,
    Snapshot,
    TResult,
};

/// Propagator advancing a real wavefunction under `exp(-H δτ)`, split into an
/// x-sweep `(1 + δτ H_x) ψ' = ψ` and a y-sweep `(1 + δτ H_y) ψ'' = ψ'`, each
/// carrying half the potential, and renormalizing after every step.
///
/// The wavefunction is the real part of the superposed packets. Magnetic
/// fields enter only through the diamagnetic term; absorbing boundaries,
/// imaginary potentials, and sources are ignored. As in 1D, degenerate ground
/// states are not resolved.
pub struct ImaginaryTime2D {
    model: Model2D,
    psi: Option<nd::Array2<f64>>,
    coeffs: Option<PlaneCoeffs>,
    clock: Clock,
}

impl ImaginaryTime2D {
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

    /// Current (real) wavefunction, if it has not been destroyed.
    pub fn psi(&self) -> Option<&nd::Array2<f64>> { self.psi.as_ref() }
}

impl Propagator for ImaginaryTime2D {
    type Dim = nd::Ix2;

    fn build_wavefunction(&mut self) -> TResult<()> {
        let mut psi = self.model.initial_state()?.mapv(|q| q.re);
        ModelError::check_norm(wf_norm(&psi))?;
        wf_renormalize(&mut psi);
        self.psi = Some(psi);
        self.coeffs = None;
        self.clock = Clock::default();
        Ok(())
    }

    fn step(&mut self) -> TResult<bool> {
        let Self { model, psi, coeffs, clock } = self;
        let psi = psi.as_mut().ok_or(TError::Destroyed)?;
        let c: &PlaneCoeffs = coeffs.get_or_insert_with(|| PlaneCoeffs::new(model));
        let (nx, ny) = psi.dim();
        let t = clock.time;
        let dtau = model.dt;
        let v = c.potential(model, t);
        let dia = model.diamagnetic(t);

        psi.axis_iter_mut(nd::Axis(1))
            .into_par_iter()
            .enumerate()
            .try_for_each_init(
                || DiffusionLane::new(nx, -c.ax),
                |lane, (j, mut col)| -> TResult<()> {
                    lane.di.iter_mut().enumerate()
                        .for_each(|(i, d)| {
                            *d = 2.0 * c.ax + 0.5 * v[[i, j]] + dia * c.xs[i].powi(2);
                        });
                    lane.relax(dtau, &mut col)
                },
            )?;

        psi.axis_iter_mut(nd::Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each_init(
                || DiffusionLane::new(ny, -c.ay),
                |lane, (i, mut row)| -> TResult<()> {
                    lane.di.iter_mut().enumerate()
                        .for_each(|(j, d)| {
                            *d = 2.0 * c.ay + 0.5 * v[[i, j]] + dia * c.ys[j].powi(2);
                        });
                    lane.relax(dtau, &mut row)
                },
            )?;

        let norm = wf_renormalize(psi);
        trace!("ImaginaryTime2D: step {}, norm before renormalization {:.8e}",
            clock.steps, norm);
        Ok(clock.tick(dtau, model.output_interval))
    }

    fn time(&self) -> f64 { self.clock.time }

    fn steps(&self) -> usize { self.clock.steps }

    fn snapshot(&self) -> TResult<Snapshot<nd::Ix2>> {
        let psi = self.psi.as_ref().ok_or(TError::Destroyed)?;
        Ok(self.model.snapshot(&psi.mapv(C64::from), &self.clock))
    }

    fn reset(&mut self) -> TResult<()> {
        debug!("ImaginaryTime2D: reset");
        self.build_wavefunction()
    }

    fn destroy(&mut self) {
        debug!("ImaginaryTime2D: destroy");
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
