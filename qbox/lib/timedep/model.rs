//! Physical and numerical description of a simulation, shared by all
//! propagators of the same rank.
//!
//! Models hold everything needed to (re)build a propagator's state: grid,
//! particle, unit converters, static potential, fields, boundaries, time step,
//! and the wave packets of the initial condition. Energies are stored in user
//! units; conversion to internal units happens when Hamiltonian coefficients
//! are formed.

use log::trace;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    boundary::Boundary,
    error::ModelError,
    field::{ ElectricField, MagneticField },
    grid::{ Grid, Grid1, Grid2 },
    observables::{
        self as obs,
        Energy,
        Expectation,
    },
    packet::{ superpose, Packet1D, Packet2D },
    particle::Particle,
    potential::{ clamp, LinePotential, PlanePotential, Potential2D, PotentialId, Shape1D },
    source::Source,
    units::{ Units, POTENTIAL_CLAMP },
};
use super::{ Clock, Diagnostics, Snapshot, OUTPUT_INTERVAL_LINE, OUTPUT_INTERVAL_PLANE };

fn check_grid<G: Grid + PartialEq>(expected: &G, got: &G) -> Result<(), ModelError> {
    (expected == got).then_some(()).ok_or(ModelError::GridMismatch)
}

/// Description of a 1D simulation.
#[derive(Clone, Debug)]
pub struct Model1D {
    pub(crate) grid: Grid1,
    pub(crate) particle: Particle,
    pub(crate) units: Units,
    pub(crate) potential: LinePotential,
    pub(crate) field: Option<ElectricField>,
    pub(crate) boundary: Boundary,
    pub(crate) dt: f64,
    pub(crate) clamp: f64,
    pub(crate) slk: f64,
    pub(crate) packets: Vec<Packet1D>,
    pub(crate) output_interval: usize,
    pub(crate) diagnostics: Diagnostics,
}

impl Model1D {
    /// Create a new model with no potential, fields, boundary, or packets,
    /// default units, and the default potential clamp.
    pub fn new(grid: Grid1, particle: Particle, dt: f64) -> Result<Self, ModelError> {
        ModelError::check_time_step(dt)?;
        ModelError::check_mass(particle.mass())?;
        Ok(Self {
            potential: LinePotential::new(grid.clone()),
            grid,
            particle,
            units: Units::default(),
            field: None,
            boundary: Boundary::None,
            dt,
            clamp: POTENTIAL_CLAMP,
            slk: 0.0,
            packets: Vec::new(),
            output_interval: OUTPUT_INTERVAL_LINE,
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Add a potential shape.
    pub fn with_shape(mut self, shape: Shape1D) -> Result<Self, ModelError> {
        self.potential.add(shape)?;
        Ok(self)
    }

    /// Replace the static potential.
    pub fn with_potential(mut self, potential: LinePotential) -> Result<Self, ModelError> {
        check_grid(&self.grid, potential.grid())?;
        self.potential = potential;
        Ok(self)
    }

    pub fn with_field(mut self, field: ElectricField) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Result<Self, ModelError> {
        boundary.validate()?;
        self.boundary = boundary;
        Ok(self)
    }

    /// Set the bound on static potential values; `f64::INFINITY` disables
    /// clamping.
    pub fn with_clamp(mut self, clamp: f64) -> Self {
        self.clamp = clamp;
        self
    }

    /// Set the Schrödinger-Langevin-Kostin friction coefficient.
    pub fn with_slk(mut self, slk: f64) -> Self {
        self.slk = slk;
        self
    }

    pub fn with_packet(mut self, packet: Packet1D) -> Result<Self, ModelError> {
        self.add_packet(packet)?;
        Ok(self)
    }

    pub fn with_output_interval(mut self, n: usize) -> Result<Self, ModelError> {
        ModelError::check_interval(n)?;
        self.output_interval = n;
        Ok(self)
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Result<Self, ModelError> {
        diagnostics.validate()?;
        self.diagnostics = diagnostics;
        Ok(self)
    }

    pub fn grid(&self) -> &Grid1 { &self.grid }

    pub fn particle(&self) -> &Particle { &self.particle }

    pub fn units(&self) -> &Units { &self.units }

    pub fn potential(&self) -> &LinePotential { &self.potential }

    pub fn field(&self) -> Option<&ElectricField> { self.field.as_ref() }

    pub fn boundary(&self) -> &Boundary { &self.boundary }

    pub fn time_step(&self) -> f64 { self.dt }

    pub fn slk(&self) -> f64 { self.slk }

    pub fn output_interval(&self) -> usize { self.output_interval }

    pub fn packets(&self) -> &[Packet1D] { &self.packets }

    pub fn diagnostics(&self) -> &Diagnostics { &self.diagnostics }

    pub fn set_particle(&mut self, particle: Particle) { self.particle = particle; }

    pub fn set_field(&mut self, field: Option<ElectricField>) { self.field = field; }

    pub fn set_boundary(&mut self, boundary: Boundary) -> Result<(), ModelError> {
        boundary.validate()?;
        self.boundary = boundary;
        Ok(())
    }

    pub fn set_time_step(&mut self, dt: f64) -> Result<(), ModelError> {
        ModelError::check_time_step(dt)?;
        self.dt = dt;
        Ok(())
    }

    pub fn set_slk(&mut self, slk: f64) { self.slk = slk; }

    pub fn set_clamp(&mut self, clamp: f64) { self.clamp = clamp; }

    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) -> Result<(), ModelError> {
        diagnostics.validate()?;
        self.diagnostics = diagnostics;
        Ok(())
    }

    /// Superpose a new potential shape.
    pub fn add_shape(&mut self, shape: Shape1D) -> Result<PotentialId, ModelError> {
        self.potential.add(shape)
    }

    /// Remove a potential shape.
    pub fn remove_shape(&mut self, id: PotentialId) -> Result<Option<Shape1D>, ModelError> {
        self.potential.remove(id)
    }

    /// Add a wave packet to the initial condition.
    pub fn add_packet(&mut self, packet: Packet1D) -> Result<(), ModelError> {
        packet.validate(&self.grid)?;
        self.packets.push(packet);
        Ok(())
    }

    pub fn clear_packets(&mut self) { self.packets.clear(); }

    /// Particle mass in internal units.
    pub fn mass_nat(&self) -> f64 { self.units.to_nat_mass(self.particle.mass()) }

    /// Kinetic coupling `a = 1 / (2 m δx²)` in internal units.
    pub fn coupling(&self) -> f64 {
        0.5 / (self.mass_nat() * self.grid.dx().powi(2))
    }

    /// Clamped static potential, in user units.
    pub fn static_potential(&self) -> nd::Array1<f64> {
        self.potential.real().mapv(|v| clamp(v, self.clamp))
    }

    /// Potential energy of the particle in the electric field at time `t`, in
    /// user units, measured from the grid center.
    pub fn field_potential(&self, t: f64) -> Option<nd::Array1<f64>> {
        let field = self.field.as_ref()?;
        let q = self.particle.charge();
        let xc = self.grid.center();
        Some(self.grid.coords().mapv(|x| q * field.potential(x - xc, 0.0, t)))
    }

    /// Total potential at time `t`, in user units.
    pub fn potential_at(&self, t: f64) -> nd::Array1<f64> {
        let mut v = self.static_potential();
        if let Some(f) = self.field_potential(t) { v += &f; }
        v
    }

    /// Absorbing-layer damping for every grid point.
    pub fn damping(&self) -> nd::Array1<f64> { self.boundary.profile(self.grid.n()) }

    pub(crate) fn initial_state(&self) -> Result<nd::Array1<C64>, ModelError> {
        superpose(&self.grid, &self.packets)
    }

    pub(crate) fn snapshot(&self, psi: &nd::Array1<C64>, clock: &Clock)
        -> Snapshot<nd::Ix1>
    {
        let amplitude: nd::Array1<f64> = psi.mapv(|q| q.norm_sqr());
        let norm = amplitude.sum();
        let expectation
            = self.diagnostics.expectation.then(|| Expectation {
                position: nd::array![obs::position_1d(psi, &self.grid)],
                momentum: nd::array![obs::momentum_1d(psi, &self.grid)],
            });
        let energy
            = self.diagnostics.energy.then(|| {
                let kin = obs::kinetic_energy_1d(
                    psi, &self.grid, self.particle.mass(), &self.units);
                let pot = obs::potential_energy(psi, &self.potential_at(clock.time));
                Energy::new(kin, pot)
            });
        trace!(
            "snapshot: t = {:.5}, norm = {:.8}, energy = {:?}",
            clock.time, norm, energy.map(|e| e.total),
        );
        Snapshot {
            time: clock.time,
            step: clock.steps,
            norm,
            amplitude,
            phase: None,
            expectation,
            energy,
            current: None,
        }
    }
}

/// Description of a 2D simulation.
#[derive(Clone, Debug)]
pub struct Model2D {
    pub(crate) grid: Grid2,
    pub(crate) particle: Particle,
    pub(crate) units: Units,
    pub(crate) potential: PlanePotential,
    pub(crate) efield: Option<ElectricField>,
    pub(crate) bfield: Option<MagneticField>,
    pub(crate) xboundary: Boundary,
    pub(crate) yboundary: Boundary,
    pub(crate) dt: f64,
    pub(crate) clamp: f64,
    pub(crate) packets: Vec<Packet2D>,
    pub(crate) sources: Vec<Source>,
    pub(crate) suzuki: bool,
    pub(crate) output_interval: usize,
    pub(crate) diagnostics: Diagnostics,
}

impl Model2D {
    /// Create a new model with no potential, fields, boundaries, sources, or
    /// packets, default units, and the default potential clamp.
    pub fn new(grid: Grid2, particle: Particle, dt: f64) -> Result<Self, ModelError> {
        ModelError::check_time_step(dt)?;
        ModelError::check_mass(particle.mass())?;
        Ok(Self {
            potential: PlanePotential::new(grid.clone()),
            grid,
            particle,
            units: Units::default(),
            efield: None,
            bfield: None,
            xboundary: Boundary::None,
            yboundary: Boundary::None,
            dt,
            clamp: POTENTIAL_CLAMP,
            packets: Vec::new(),
            sources: Vec::new(),
            suzuki: false,
            output_interval: OUTPUT_INTERVAL_PLANE,
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Add a potential.
    pub fn with_shape(mut self, shape: Potential2D) -> Result<Self, ModelError> {
        self.potential.add(shape)?;
        Ok(self)
    }

    /// Replace the static potential.
    pub fn with_potential(mut self, potential: PlanePotential) -> Result<Self, ModelError> {
        check_grid(&self.grid, potential.grid())?;
        self.potential = potential;
        Ok(self)
    }

    pub fn with_efield(mut self, field: ElectricField) -> Self {
        self.efield = Some(field);
        self
    }

    pub fn with_bfield(mut self, field: MagneticField) -> Self {
        self.bfield = Some(field);
        self
    }

    pub fn with_boundaries(mut self, x: Boundary, y: Boundary) -> Result<Self, ModelError> {
        self.set_boundaries(x, y)?;
        Ok(self)
    }

    /// Set the bound on static potential values; `f64::INFINITY` disables
    /// clamping.
    pub fn with_clamp(mut self, clamp: f64) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn with_packet(mut self, packet: Packet2D) -> Result<Self, ModelError> {
        self.add_packet(packet)?;
        Ok(self)
    }

    pub fn with_source(mut self, source: Source) -> Result<Self, ModelError> {
        self.add_source(source)?;
        Ok(self)
    }

    /// Use the symmetric potential-kinetic-potential splitting.
    pub fn with_suzuki(mut self, suzuki: bool) -> Self {
        self.suzuki = suzuki;
        self
    }

    pub fn with_output_interval(mut self, n: usize) -> Result<Self, ModelError> {
        ModelError::check_interval(n)?;
        self.output_interval = n;
        Ok(self)
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Result<Self, ModelError> {
        diagnostics.validate()?;
        self.diagnostics = diagnostics;
        Ok(self)
    }

    pub fn grid(&self) -> &Grid2 { &self.grid }

    pub fn particle(&self) -> &Particle { &self.particle }

    pub fn units(&self) -> &Units { &self.units }

    pub fn potential(&self) -> &PlanePotential { &self.potential }

    pub fn efield(&self) -> Option<&ElectricField> { self.efield.as_ref() }

    pub fn bfield(&self) -> Option<&MagneticField> { self.bfield.as_ref() }

    pub fn boundaries(&self) -> (&Boundary, &Boundary) { (&self.xboundary, &self.yboundary) }

    pub fn time_step(&self) -> f64 { self.dt }

    pub fn packets(&self) -> &[Packet2D] { &self.packets }

    pub fn sources(&self) -> &[Source] { &self.sources }

    pub fn suzuki(&self) -> bool { self.suzuki }

    pub fn output_interval(&self) -> usize { self.output_interval }

    pub fn diagnostics(&self) -> &Diagnostics { &self.diagnostics }

    pub fn set_particle(&mut self, particle: Particle) { self.particle = particle; }

    pub fn set_efield(&mut self, field: Option<ElectricField>) { self.efield = field; }

    pub fn set_bfield(&mut self, field: Option<MagneticField>) { self.bfield = field; }

    pub fn set_boundaries(&mut self, x: Boundary, y: Boundary) -> Result<(), ModelError> {
        x.validate()?;
        y.validate()?;
        self.xboundary = x;
        self.yboundary = y;
        Ok(())
    }

    pub fn set_time_step(&mut self, dt: f64) -> Result<(), ModelError> {
        ModelError::check_time_step(dt)?;
        self.dt = dt;
        Ok(())
    }

    pub fn set_clamp(&mut self, clamp: f64) { self.clamp = clamp; }

    pub fn set_suzuki(&mut self, suzuki: bool) { self.suzuki = suzuki; }

    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) -> Result<(), ModelError> {
        diagnostics.validate()?;
        self.diagnostics = diagnostics;
        Ok(())
    }

    /// Superpose a new potential.
    pub fn add_shape(&mut self, shape: Potential2D) -> Result<PotentialId, ModelError> {
        self.potential.add(shape)
    }

    /// Remove a potential.
    pub fn remove_shape(&mut self, id: PotentialId)
        -> Result<Option<Potential2D>, ModelError>
    {
        self.potential.remove(id)
    }

    /// Add a wave packet to the initial condition.
    pub fn add_packet(&mut self, packet: Packet2D) -> Result<(), ModelError> {
        packet.validate()?;
        self.packets.push(packet);
        Ok(())
    }

    pub fn clear_packets(&mut self) { self.packets.clear(); }

    /// Add a periodic source.
    pub fn add_source(&mut self, source: Source) -> Result<(), ModelError> {
        source.validate()?;
        self.sources.push(source);
        Ok(())
    }

    /// Remove and return the `k`-th source, if it exists.
    pub fn remove_source(&mut self, k: usize) -> Option<Source> {
        (k < self.sources.len()).then(|| self.sources.remove(k))
    }

    pub fn clear_sources(&mut self) { self.sources.clear(); }

    /// Particle mass in internal units.
    pub fn mass_nat(&self) -> f64 { self.units.to_nat_mass(self.particle.mass()) }

    /// Kinetic couplings `(ax, ay)` in internal units.
    pub fn coupling(&self) -> (f64, f64) {
        let m = self.mass_nat();
        (0.5 / (m * self.grid.dx().powi(2)), 0.5 / (m * self.grid.dy().powi(2)))
    }

    /// `q B(t)`, or zero without a magnetic field.
    pub fn qb(&self, t: f64) -> f64 {
        self.bfield.as_ref()
            .map(|b| self.particle.charge() * b.value(t))
            .unwrap_or(0.0)
    }

    /// Coefficient `q² B² / 8m` of the diamagnetic term, in internal units.
    pub fn diamagnetic(&self, t: f64) -> f64 {
        self.qb(t).powi(2) / (8.0 * self.mass_nat())
    }

    /// Clamped real part of the static potential, in user units.
    pub fn static_potential(&self) -> nd::Array2<f64> {
        self.potential.real().mapv(|v| clamp(v, self.clamp))
    }

    /// Imaginary (absorbing) part of the static potential, in user units.
    pub fn static_imaginary(&self) -> &nd::Array2<f64> { self.potential.imag() }

    /// Potential energy of the particle in the electric field at time `t`, in
    /// user units.
    pub fn field_potential(&self, t: f64) -> Option<nd::Array2<f64>> {
        let field = self.efield.as_ref()?;
        let q = self.particle.charge();
        Some(self.grid.sample(|x, y| q * field.potential(x, y, t)))
    }

    /// Real potential seen by the particle at time `t`, including the
    /// diamagnetic term, in user units.
    pub fn potential_at(&self, t: f64) -> nd::Array2<f64> {
        let mut v = self.static_potential();
        if let Some(f) = self.field_potential(t) { v += &f; }
        let dia = self.diamagnetic(t);
        if dia != 0.0 {
            let ec: f64 = self.units.from_nat_energy(dia);
            v += &self.grid.sample(|x, y| ec * (x * x + y * y));
        }
        v
    }

    /// Absorbing-layer damping along each axis.
    pub fn damping(&self) -> (nd::Array1<f64>, nd::Array1<f64>) {
        (
            self.xboundary.profile(self.grid.nx()),
            self.yboundary.profile(self.grid.ny()),
        )
    }

    pub(crate) fn initial_state(&self) -> Result<nd::Array2<C64>, ModelError> {
        superpose(&self.grid, &self.packets)
    }

    /// Add every source due at the current step.
    pub(crate) fn emit_sources(&self, psi: &mut nd::Array2<C64>, clock: &Clock) {
        self.sources.iter()
            .filter(|s| s.due(clock.steps, self.dt))
            .for_each(|s| s.emit(psi, &self.grid));
    }

    pub(crate) fn snapshot(&self, psi: &nd::Array2<C64>, clock: &Clock)
        -> Snapshot<nd::Ix2>
    {
        let amplitude: nd::Array2<f64> = psi.mapv(|q| q.norm_sqr());
        let phase: nd::Array2<f64> = psi.mapv(|q| q.arg());
        let norm = amplitude.sum();
        let expectation
            = self.diagnostics.expectation.then(|| {
                let (x, y) = obs::position_2d(psi, &self.grid);
                let (px, py) = obs::momentum_2d(psi, &self.grid);
                Expectation {
                    position: nd::array![x, y],
                    momentum: nd::array![px, py],
                }
            });
        let energy
            = self.diagnostics.energy.then(|| {
                let kin = obs::kinetic_energy_2d(
                    psi, &self.grid, self.particle.mass(), &self.units);
                let pot = obs::potential_energy(psi, &self.potential_at(clock.time));
                Energy::new(kin, pot)
            });
        let current
            = self.diagnostics.current_stride.map(|stride| {
                obs::current_2d(
                    psi, &self.grid, self.particle.mass(), &self.units, stride)
            });
        trace!(
            "snapshot: t = {:.5}, norm = {:.8}, energy = {:?}",
            clock.time, norm, energy.map(|e| e.total),
        );
        Snapshot {
            time: clock.time,
            step: clock.steps,
            norm,
            amplitude,
            phase: Some(phase),
            expectation,
            energy,
            current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn line_model_validation() {
        let grid = Grid1::new(100, -10.0, 10.0).unwrap();
        assert_eq!(
            Model1D::new(grid.clone(), Particle::default(), 0.0).unwrap_err(),
            ModelError::BadTimeStep(0.0),
        );
        let model = Model1D::new(grid.clone(), Particle::default(), 0.01).unwrap();
        assert!(model.clone().with_output_interval(0).is_err());
        assert!(model.clone()
            .with_boundary(Boundary::Absorbing { length_fraction: 0.9, absorption: 0.1 })
            .is_err());
        let other = LinePotential::new(Grid1::new(50, -10.0, 10.0).unwrap());
        assert!(model.clone().with_potential(other).is_err());
        let bad = Packet1D::Stationary { state: nd::Array1::zeros(99), momentum: 0.0 };
        assert!(model.with_packet(bad).is_err());
    }

    #[test]
    fn line_potential_includes_field_and_clamp() {
        let grid = Grid1::new(10, 0.0, 10.0).unwrap();
        let model = Model1D::new(grid, Particle::new(1.0, 2.0).unwrap(), 0.01).unwrap()
            .with_shape(Shape1D::Custom { values: vec![10.0; 10] }).unwrap()
            .with_field(ElectricField::constant(0.5));
        let v = model.potential_at(0.0);
        // clamp(10) + 2 * (-0.5) * (x - 5)
        assert_abs_diff_eq!(v[0], 5.0 + 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v[5], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v[9], 5.0 - 4.0, epsilon = 1e-12);
    }

    #[test]
    fn plane_potential_diamagnetic_term() {
        let grid = Grid2::new((8, 8), (-2.0, 2.0), (-2.0, 2.0)).unwrap();
        let model = Model2D::new(grid.clone(), Particle::new(1.0, 1.0).unwrap(), 0.01)
            .unwrap()
            .with_units(Units::natural())
            .with_bfield(MagneticField::constant(2.0));
        let v = model.potential_at(0.0);
        // q²B²/8m (x² + y²) = 0.5 (x² + y²)
        let (x, y) = (grid.x(1), grid.y(6));
        assert_abs_diff_eq!(v[[1, 6]], 0.5 * (x * x + y * y), epsilon = 1e-12);
        assert_abs_diff_eq!(model.qb(1.0), 2.0, epsilon = 1e-15);
    }

    #[test]
    fn sources_managed() {
        let grid = Grid2::new((8, 8), (-2.0, 2.0), (-2.0, 2.0)).unwrap();
        let mut model = Model2D::new(grid, Particle::default(), 0.01).unwrap();
        assert!(model.add_source(Source::point((0.0, 0.0), 1.0).with_period(-1.0)).is_err());
        model.add_source(Source::point((0.0, 0.0), 1.0)).unwrap();
        assert_eq!(model.sources().len(), 1);
        assert!(model.remove_source(3).is_none());
        assert!(model.remove_source(0).is_some());
        assert!(model.sources().is_empty());
    }
}
