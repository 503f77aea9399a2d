//! Explicit Runge-Kutta propagation in 1D.
//!
//! The generator `h = -i δt H - 2Γ` is formed as a dense matrix and applied
//! with matrix-vector products. The layer term is doubled so that its decay
//! per step matches the `(1 - Γ) / (1 + Γ)` of the Cayley propagators. These
//! schemes are only conditionally stable:
//! `δt` must be small compared to `1 / max|E|`, where `max|E| ≈ 4a` is
//! dominated by the kinetic coupling.

use log::debug;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::Deserialize;
use crate::{
    error::{ ModelError, TError },
    particle::Particle,
};
use super::{
    cayley1d::{ LineCoeffs, SlkPhase },
    Clock,
    Model1D,
    Propagator,
    Snapshot,
    TResult,
};

/// Explicit integration scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectMethod {
    /// Classical fourth-order Runge-Kutta.
    #[default]
    RungeKutta4,
    /// Second-order midpoint rule.
    Midpoint,
}

/// Real-time propagator advancing `ψ` with an explicit Runge-Kutta scheme.
pub struct Direct1D {
    model: Model1D,
    method: DirectMethod,
    psi: Option<nd::Array1<C64>>,
    h: Option<nd::Array2<C64>>,
    coeffs: Option<LineCoeffs>,
    slk: Option<SlkPhase>,
    clock: Clock,
}

impl Direct1D {
    /// Create a new propagator and build its initial wavefunction.
    pub fn new(model: Model1D, method: DirectMethod) -> TResult<Self> {
        let mut new = Self {
            model,
            method,
            psi: None,
            h: None,
            coeffs: None,
            slk: None,
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
        self.h = None;
        &mut self.model
    }

    pub fn method(&self) -> DirectMethod { self.method }

    pub fn set_method(&mut self, method: DirectMethod) { self.method = method; }

    /// Change the particle, invalidating mass-derived coefficients.
    pub fn set_particle(&mut self, particle: Particle) -> TResult<()> {
        ModelError::check_mass(particle.mass())?;
        self.model_mut().set_particle(particle);
        Ok(())
    }

    /// Current wavefunction, if it has not been destroyed.
    pub fn psi(&self) -> Option<&nd::Array1<C64>> { self.psi.as_ref() }
}

// off-diagonal part of the generator; the diagonal is written every step
fn generator(n: usize, coupling: f64, dt: f64) -> nd::Array2<C64> {
    let off = C64::new(0.0, dt * coupling);
    let mut h: nd::Array2<C64> = nd::Array2::zeros((n, n));
    for i in 0..n - 1 {
        h[[i, i + 1]] = off;
        h[[i + 1, i]] = off;
    }
    h
}

impl Propagator for Direct1D {
    type Dim = nd::Ix1;

    fn build_wavefunction(&mut self) -> TResult<()> {
        let psi = self.model.initial_state()?;
        self.slk = (self.model.slk != 0.0).then(|| SlkPhase::new(&psi));
        self.psi = Some(psi);
        self.coeffs = None;
        self.h = None;
        self.clock = Clock::default();
        Ok(())
    }

    fn step(&mut self) -> TResult<bool> {
        let Self { model, method, psi, h, coeffs, slk, clock } = self;
        let psi = psi.as_mut().ok_or(TError::Destroyed)?;
        let coeffs = coeffs.get_or_insert_with(|| LineCoeffs::new(model));
        let dt = model.dt;
        let h = h.get_or_insert_with(|| {
            generator(model.grid.n(), coeffs.coupling, dt)
        });

        let friction
            = (model.slk != 0.0).then(|| {
                slk.get_or_insert_with(|| SlkPhase::new(psi))
                    .friction(psi, model.slk, model.mass_nat())
            });
        let diag = coeffs.diagonal(model, clock.time, friction);
        h.diag_mut().iter_mut().zip(diag.iter().zip(&coeffs.damping))
            .for_each(|(hk, (d, g))| { *hk = C64::new(-2.0 * g, -dt * d); });

        match method {
            DirectMethod::RungeKutta4 => {
                let f1 = h.dot(&*psi);
                let f2 = h.dot(&(&*psi + &(&f1 * 0.5)));
                let f3 = h.dot(&(&*psi + &(&f2 * 0.5)));
                let f4 = h.dot(&(&*psi + &f3));
                nd::Zip::from(&mut *psi)
                    .and(&f1).and(&f2).and(&f3).and(&f4)
                    .for_each(|q, k1, k2, k3, k4| {
                        *q += (*k1 + 2.0 * *k2 + 2.0 * *k3 + *k4) / 6.0;
                    });
            },
            DirectMethod::Midpoint => {
                let f1 = h.dot(&*psi);
                let f2 = h.dot(&(&*psi + &(&f1 * 0.5)));
                *psi += &f2;
            },
        }
        Ok(clock.tick(dt, model.output_interval))
    }

    fn time(&self) -> f64 { self.clock.time }

    fn steps(&self) -> usize { self.clock.steps }

    fn snapshot(&self) -> TResult<Snapshot<nd::Ix1>> {
        let psi = self.psi.as_ref().ok_or(TError::Destroyed)?;
        Ok(self.model.snapshot(psi, &self.clock))
    }

    fn reset(&mut self) -> TResult<()> {
        debug!("Direct1D: reset");
        self.build_wavefunction()
    }

    fn destroy(&mut self) {
        debug!("Direct1D: destroy");
        self.psi = None;
        self.h = None;
        self.coeffs = None;
        self.slk = None;
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
        grid::Grid1,
        packet::Packet1D,
        potential::Shape1D,
        timedep::Cayley1D,
        units::Units,
        utils::{ wf_dot, wf_norm },
    };

    fn harmonic_model() -> Model1D {
        let grid = Grid1::new(201, -10.0, 10.0).unwrap();
        Model1D::new(grid, Particle::new(1.0, 0.0).unwrap(), 0.002).unwrap()
            .with_units(Units::natural())
            .with_clamp(f64::INFINITY)
            .with_shape(Shape1D::HarmonicOscillator { k: 0.5, offset: 0.0 })
            .unwrap()
            .with_packet(Packet1D::Gaussian {
                magnitude: 1.0, sigma: 1.5, center: 1.0, momentum: 0.5 })
            .unwrap()
    }

    #[test]
    fn method_from_str() {
        #[derive(Deserialize)]
        struct M { method: DirectMethod }
        let m: M = toml::from_str("method = \"runge_kutta4\"").unwrap();
        assert_eq!(m.method, DirectMethod::RungeKutta4);
        let m: M = toml::from_str("method = \"midpoint\"").unwrap();
        assert_eq!(m.method, DirectMethod::Midpoint);
    }

    #[test]
    fn rk4_nearly_unitary() {
        let mut prop = Direct1D::new(harmonic_model(), DirectMethod::RungeKutta4).unwrap();
        prop.run_steps(500).unwrap();
        assert_abs_diff_eq!(wf_norm(prop.psi().unwrap()), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn rk4_agrees_with_cayley() {
        let mut direct = Direct1D::new(harmonic_model(), DirectMethod::RungeKutta4).unwrap();
        let mut cayley = Cayley1D::new(harmonic_model()).unwrap();
        direct.run_steps(500).unwrap();
        cayley.run_steps(500).unwrap();
        let overlap = wf_dot(direct.psi().unwrap(), cayley.psi().unwrap()).norm();
        assert!(overlap > 0.999);
    }

    #[test]
    fn midpoint_tracks_rk4() {
        let mut rk = Direct1D::new(harmonic_model(), DirectMethod::RungeKutta4).unwrap();
        let mut mid = Direct1D::new(harmonic_model(), DirectMethod::Midpoint).unwrap();
        rk.run_steps(200).unwrap();
        mid.run_steps(200).unwrap();
        let x_rk = rk.snapshot().unwrap().expectation.unwrap().position[0];
        let x_mid = mid.snapshot().unwrap().expectation.unwrap().position[0];
        assert_abs_diff_eq!(x_rk, x_mid, epsilon = 1e-3);
    }

    #[test]
    fn absorbs_like_cayley() {
        let model = || {
            let grid = Grid1::new(201, -10.0, 10.0).unwrap();
            Model1D::new(grid, Particle::new(1.0, 0.0).unwrap(), 0.002).unwrap()
                .with_units(Units::natural())
                .with_boundary(Boundary::Absorbing { length_fraction: 0.1, absorption: 0.001 })
                .unwrap()
                .with_packet(Packet1D::Gaussian {
                    magnitude: 1.0, sigma: 1.0, center: 4.0, momentum: 4.0 })
                .unwrap()
        };
        let mut direct = Direct1D::new(model(), DirectMethod::RungeKutta4).unwrap();
        let mut cayley = Cayley1D::new(model()).unwrap();
        direct.run_steps(1000).unwrap();
        cayley.run_steps(1000).unwrap();
        let n_direct = wf_norm(direct.psi().unwrap());
        let n_cayley = wf_norm(cayley.psi().unwrap());
        assert!(n_cayley < 0.5);
        assert_abs_diff_eq!(n_direct, n_cayley, epsilon = 2e-2);
    }

    #[test]
    fn destroyed_steps_fail() {
        let mut prop = Direct1D::new(harmonic_model(), DirectMethod::Midpoint).unwrap();
        prop.destroy();
        assert_eq!(prop.step().unwrap_err(), TError::Destroyed);
        prop.reset().unwrap();
        assert!(prop.step().is_ok());
    }
}
