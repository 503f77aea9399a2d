//! Crank-Nicolson (Cayley) propagation in 1D.

use log::debug;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ ModelError, TError },
    particle::Particle,
};
use super::{
    CayleyLane,
    Clock,
    Model1D,
    Propagator,
    Snapshot,
    TResult,
};

/// Tracks the continuous (unwrapped) phase of the wavefunction for the
/// Schrödinger-Langevin-Kostin friction term.
#[derive(Clone, Debug)]
pub(crate) struct SlkPhase {
    phase: nd::Array1<f64>,
    folded: nd::Array1<f64>,
}

impl SlkPhase {
    pub(crate) fn new(psi: &nd::Array1<C64>) -> Self {
        let phase = psi.mapv(|q| q.arg());
        Self { folded: phase.clone(), phase }
    }

    /// Update the unwrapped phase from the current wavefunction and return
    /// the friction term `slk (φ - ⟨φ⟩) / m` for each grid point, in
    /// internal units.
    pub(crate) fn friction(&mut self, psi: &nd::Array1<C64>, slk: f64, mass: f64)
        -> nd::Array1<f64>
    {
        use std::f64::consts::{ PI, TAU };
        nd::Zip::from(&mut self.phase).and(&mut self.folded).and(psi)
            .for_each(|ph, fo, q| {
                let new = q.arg();
                let mut change = new - *fo;
                if change > PI {
                    change -= TAU;
                } else if change < -PI {
                    change += TAU;
                }
                *ph += change;
                *fo = new;
            });
        let (acc, norm)
            = self.phase.iter().zip(psi)
            .fold((0.0, 0.0), |(acc, norm), (ph, q)| {
                let rho = q.norm_sqr();
                (acc + ph * rho, norm + rho)
            });
        let mean = if norm > 0.0 { acc / norm } else { 0.0 };
        self.phase.mapv(|ph| slk * (ph - mean) / mass)
    }
}

/// Time-independent Hamiltonian coefficients of a 1D model, in internal
/// units.
#[derive(Clone, Debug)]
pub(crate) struct LineCoeffs {
    pub(crate) coupling: f64,
    // 2a + Ec clamp(V)
    pub(crate) diag: nd::Array1<f64>,
    pub(crate) damping: nd::Array1<f64>,
}

impl LineCoeffs {
    pub(crate) fn new(model: &Model1D) -> Self {
        let coupling = model.coupling();
        let ec = model.units.energy;
        let diag = model.static_potential().mapv(|v| 2.0 * coupling + ec * v);
        Self { coupling, diag, damping: model.damping() }
    }

    /// Full Hamiltonian diagonal at time `t`, adding the field and any
    /// friction term.
    pub(crate) fn diagonal(
        &self,
        model: &Model1D,
        t: f64,
        friction: Option<nd::Array1<f64>>,
    ) -> nd::Array1<f64>
    {
        let mut d = self.diag.clone();
        if let Some(f) = model.field_potential(t) {
            d.scaled_add(model.units.energy, &f);
        }
        if let Some(f) = friction { d += &f; }
        d
    }
}

/// Real-time propagator solving `(1 + K) ψ' = (1 - K) ψ` with
/// `K = i (δt/2) H + Γ` at every step.
///
/// Unconditionally stable and, without an absorbing boundary, unitary to
/// round-off.
pub struct Cayley1D {
    model: Model1D,
    psi: Option<nd::Array1<C64>>,
    lane: Option<CayleyLane>,
    coeffs: Option<LineCoeffs>,
    slk: Option<SlkPhase>,
    clock: Clock,
}

impl Cayley1D {
    /// Create a new propagator and build its initial wavefunction.
    pub fn new(model: Model1D) -> TResult<Self> {
        let mut new = Self {
            model,
            psi: None,
            lane: None,
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
        &mut self.model
    }

    /// Change the particle, invalidating mass-derived coefficients.
    pub fn set_particle(&mut self, particle: Particle) -> TResult<()> {
        ModelError::check_mass(particle.mass())?;
        self.model_mut().set_particle(particle);
        Ok(())
    }

    /// Current wavefunction, if it has not been destroyed.
    pub fn psi(&self) -> Option<&nd::Array1<C64>> { self.psi.as_ref() }
}

impl Propagator for Cayley1D {
    type Dim = nd::Ix1;

    fn build_wavefunction(&mut self) -> TResult<()> {
        let psi = self.model.initial_state()?;
        self.slk = (self.model.slk != 0.0).then(|| SlkPhase::new(&psi));
        self.lane = Some(CayleyLane::new(self.model.grid.n()));
        self.psi = Some(psi);
        self.coeffs = None;
        self.clock = Clock::default();
        Ok(())
    }

    fn step(&mut self) -> TResult<bool> {
        let Self { model, psi, lane, coeffs, slk, clock } = self;
        let (Some(psi), Some(lane)) = (psi.as_mut(), lane.as_mut())
            else { return Err(TError::Destroyed); };
        let coeffs = coeffs.get_or_insert_with(|| LineCoeffs::new(model));
        let hdt = 0.5 * model.dt;
        let off = C64::new(0.0, -hdt * coeffs.coupling);
        lane.lo.iter_mut().for_each(|l| *l = off);
        lane.up.iter_mut().for_each(|u| *u = off);

        let friction
            = (model.slk != 0.0).then(|| {
                slk.get_or_insert_with(|| SlkPhase::new(psi))
                    .friction(psi, model.slk, model.mass_nat())
            });
        let diag = coeffs.diagonal(model, clock.time, friction);
        lane.di.iter_mut().zip(diag.iter().zip(&coeffs.damping))
            .for_each(|(d, (h, g))| { *d = C64::new(*g, hdt * h); });
        lane.advance(psi)?;
        Ok(clock.tick(model.dt, model.output_interval))
    }

    fn time(&self) -> f64 { self.clock.time }

    fn steps(&self) -> usize { self.clock.steps }

    fn snapshot(&self) -> TResult<Snapshot<nd::Ix1>> {
        let psi = self.psi.as_ref().ok_or(TError::Destroyed)?;
        Ok(self.model.snapshot(psi, &self.clock))
    }

    fn reset(&mut self) -> TResult<()> {
        debug!("Cayley1D: reset");
        self.build_wavefunction()
    }

    fn destroy(&mut self) {
        debug!("Cayley1D: destroy");
        self.psi = None;
        self.lane = None;
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
