//! Imaginary-time relaxation toward the ground state in 1D.

use log::{ debug, trace };
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ ModelError, TError },
    particle::Particle,
    utils::{ wf_norm, wf_renormalize },
};
use super::{
    cayley1d::LineCoeffs,
    Clock,
    DiffusionLane,
    Model1D,
    Propagator,
    Snapshot,
    TResult,
};

/// Propagator advancing a real wavefunction under `exp(-H δτ)` with the
/// implicit update `(1 + δτ H) ψ' = ψ`, renormalizing after every step.
///
/// Excited components decay faster than the ground state, so any initial
/// state with nonzero ground-state overlap converges to it. Degenerate ground
/// states (e.g. a symmetric double well) are not resolved: the result depends
/// on where the initial packets sit. Absorbing boundaries and the SLK term are
/// ignored.
pub struct ImaginaryTime1D {
    model: Model1D,
    psi: Option<nd::Array1<f64>>,
    lane: Option<DiffusionLane>,
    coeffs: Option<LineCoeffs>,
    clock: Clock,
}

impl ImaginaryTime1D {
    /// Create a new propagator and build its initial wavefunction.
    pub fn new(model: Model1D) -> TResult<Self> {
        let mut new = Self {
            model,
            psi: None,
            lane: None,
            coeffs: None,
            clock: Clock::default(),
        };
        new.build_wavefunction()?;
        Ok(new)
    }

    pub fn model(&self) -> &Model1D { &self.model }

    /// Mutable access to the model. All cached coefficients are rebuilt on
    /// the next step.
    pub fn model_mut(&mut self) -> &mut Model1D {
        self.coeffs = None;
        self.lane = None;
        &mut self.model
    }

    /// Change the particle, invalidating mass-derived coefficients.
    pub fn set_particle(&mut self, particle: Particle) -> TResult<()> {
        ModelError::check_mass(particle.mass())?;
        self.model_mut().set_particle(particle);
        Ok(())
    }

    /// Current (real) wavefunction, if it has not been destroyed.
    pub fn psi(&self) -> Option<&nd::Array1<f64>> { self.psi.as_ref() }
}

impl Propagator for ImaginaryTime1D {
    type Dim = nd::Ix1;

    fn build_wavefunction(&mut self) -> TResult<()> {
        let mut psi = self.model.initial_state()?.mapv(|q| q.re);
        ModelError::check_norm(wf_norm(&psi))?;
        wf_renormalize(&mut psi);
        self.psi = Some(psi);
        self.coeffs = None;
        self.lane = None;
        self.clock = Clock::default();
        Ok(())
    }

    fn step(&mut self) -> TResult<bool> {
        let Self { model, psi, lane, coeffs, clock } = self;
        let psi = psi.as_mut().ok_or(TError::Destroyed)?;
        let coeffs = coeffs.get_or_insert_with(|| LineCoeffs::new(model));
        let lane
            = lane.get_or_insert_with(|| {
                DiffusionLane::new(model.grid.n(), -coeffs.coupling)
            });
        let diag = coeffs.diagonal(model, clock.time, None);
        lane.di.iter_mut().zip(&diag).for_each(|(l, d)| { *l = *d; });
        lane.relax(model.dt, psi)?;
        let norm = wf_renormalize(psi);
        trace!("ImaginaryTime1D: step {}, norm before renormalization {:.8e}",
            clock.steps, norm);
        Ok(clock.tick(model.dt, model.output_interval))
    }

    fn time(&self) -> f64 { self.clock.time }

    fn steps(&self) -> usize { self.clock.steps }

    fn snapshot(&self) -> TResult<Snapshot<nd::Ix1>> {
        let psi = self.psi.as_ref().ok_or(TError::Destroyed)?;
        Ok(self.model.snapshot(&psi.mapv(C64::from), &self.clock))
    }

    fn reset(&mut self) -> TResult<()> {
        debug!("ImaginaryTime1D: reset");
        self.build_wavefunction()
    }

    fn destroy(&mut self) {
        debug!("ImaginaryTime1D: destroy");
        self.psi = None;
        self.lane = None;
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
        grid::Grid1,
        packet::Packet1D,
        potential::Shape1D,
        solve::StationarySolver,
        units::Units,
    };

    fn harmonic_model(center: f64) -> Model1D {
        let grid = Grid1::new(201, -10.0, 10.0).unwrap();
        Model1D::new(grid, Particle::new(1.0, 0.0).unwrap(), 0.05).unwrap()
            .with_units(Units::natural())
            .with_clamp(f64::INFINITY)
            .with_shape(Shape1D::HarmonicOscillator { k: 0.5, offset: 0.0 })
            .unwrap()
            .with_packet(Packet1D::Gaussian {
                magnitude: 1.0, sigma: 3.0, center, momentum: 0.0 })
            .unwrap()
    }

    #[test]
    fn relaxes_to_oscillator_ground_state() {
        let mut prop = ImaginaryTime1D::new(harmonic_model(2.0)).unwrap();
        let mut last = f64::INFINITY;
        for _ in 0..40 {
            prop.run_steps(10).unwrap();
            let e = prop.snapshot().unwrap().energy.unwrap().total;
            assert!(e <= last + 1e-10);
            last = e;
        }
        // ħω / 2 with ω = 1, up to discretization error
        assert_abs_diff_eq!(last, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn matches_stationary_solver() {
        let model = harmonic_model(-1.0);
        let solver = StationarySolver::new(
            model.grid().clone(),
            *model.particle(),
            *model.units(),
            model.static_potential(),
        ).unwrap()
            .with_clamp(f64::INFINITY);
        let ground = &solver.solve(1, true).unwrap()[0];
        let mut prop = ImaginaryTime1D::new(model).unwrap();
        prop.run_steps(600).unwrap();
        let e = prop.snapshot().unwrap().energy.unwrap().total;
        assert_abs_diff_eq!(e, ground.e, epsilon = 1e-6);
        let wf = ground.wf.as_ref().unwrap();
        let overlap: f64 = prop.psi().unwrap().dot(wf).abs();
        assert_abs_diff_eq!(overlap, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_initial_state_rejected() {
        let grid = Grid1::new(64, -5.0, 5.0).unwrap();
        let model = Model1D::new(grid, Particle::new(1.0, 0.0).unwrap(), 0.05).unwrap();
        assert_eq!(
            ImaginaryTime1D::new(model).err(),
            Some(TError::Model(ModelError::ZeroNorm)),
        );
    }

    #[test]
    fn stays_normalized() {
        let mut prop = ImaginaryTime1D::new(harmonic_model(0.0)).unwrap();
        prop.run_steps(25).unwrap();
        let snap = prop.snapshot().unwrap();
        assert_abs_diff_eq!(snap.norm, 1.0, epsilon = 1e-12);
        assert_eq!(snap.step, 25);
        prop.destroy();
        assert!(prop.snapshot().is_err());
    }
}
