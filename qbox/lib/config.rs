//! Simulation descriptions read from TOML.
//!
//! A description is tagged by the rank of its grid:
//! ```toml
//! kind = "line"
//! time_step = 0.002
//! propagator = "cayley"
//!
//! [grid]
//! n = 1024
//! xmin = -10.0
//! xmax = 10.0
//!
//! [[potentials]]
//! shape = "square_barrier"
//! width = 0.5
//! height = 3.0
//!
//! [[packets]]
//! kind = "gaussian"
//! sigma = 1.0
//! center = -4.0
//! momentum = 5.0
//! ```
//! Everything other than the grid and time step is optional and takes the
//! same defaults as the builders on [`Model1D`] and [`Model2D`].

use std::{ fs, path::Path };
use log::debug;
use ndarray as nd;
use serde::Deserialize;
use crate::{
    boundary::Boundary,
    error::ConfigError,
    field::{ ElectricField, MagneticField },
    grid::{ Grid1, Grid2 },
    packet::{ Packet1D, Packet2D },
    particle::Particle,
    potential::{ Potential2D, Shape1D },
    solve::StationarySolver,
    source::Source,
    timedep::{
        Cayley1D,
        Cayley2D,
        Diagnostics,
        Direct1D,
        DirectMethod,
        ImaginaryTime1D,
        ImaginaryTime2D,
        Model1D,
        Model2D,
        Propagator,
        OUTPUT_INTERVAL_LINE,
        OUTPUT_INTERVAL_PLANE,
    },
    units::{ Units, POTENTIAL_CLAMP },
};

pub type CResult<T> = Result<T, ConfigError>;

/// A boxed 1D propagator.
pub type LinePropagator = Box<dyn Propagator<Dim = nd::Ix1>>;

/// A boxed 2D propagator.
pub type PlanePropagator = Box<dyn Propagator<Dim = nd::Ix2>>;

fn def_clamp() -> f64 { POTENTIAL_CLAMP }

fn def_interval_line() -> usize { OUTPUT_INTERVAL_LINE }

fn def_interval_plane() -> usize { OUTPUT_INTERVAL_PLANE }

/// Time-stepping scheme for a 1D simulation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineScheme {
    #[default]
    Cayley,
    RungeKutta4,
    Midpoint,
    ImaginaryTime,
}

/// Time-stepping scheme for a 2D simulation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneScheme {
    #[default]
    Cayley,
    ImaginaryTime,
}

/// Description of a 1D simulation.
#[derive(Clone, Debug, Deserialize)]
pub struct LineConfig {
    pub grid: Grid1,
    #[serde(default)]
    pub particle: Particle,
    #[serde(default)]
    pub units: Units,
    pub time_step: f64,
    #[serde(default)]
    pub propagator: LineScheme,
    #[serde(default)]
    pub potentials: Vec<Shape1D>,
    #[serde(default)]
    pub packets: Vec<Packet1D>,
    pub field: Option<ElectricField>,
    #[serde(default)]
    pub boundary: Boundary,
    #[serde(default)]
    pub slk: f64,
    #[serde(default = "def_clamp")]
    pub clamp: f64,
    #[serde(default = "def_interval_line")]
    pub output_interval: usize,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl LineConfig {
    /// Validate the description and assemble a model from it.
    pub fn model(&self) -> CResult<Model1D> {
        let mut model
            = Model1D::new(self.grid.clone(), self.particle, self.time_step)?
            .with_units(self.units)
            .with_clamp(self.clamp)
            .with_slk(self.slk)
            .with_boundary(self.boundary)?
            .with_output_interval(self.output_interval)?
            .with_diagnostics(self.diagnostics)?;
        if let Some(field) = self.field {
            model = model.with_field(field);
        }
        for shape in self.potentials.iter() {
            model.add_shape(shape.clone())?;
        }
        for packet in self.packets.iter() {
            model.add_packet(packet.clone())?;
        }
        Ok(model)
    }

    /// Build the selected propagator.
    pub fn build(&self) -> CResult<LinePropagator> {
        let model = self.model()?;
        debug!("building {:?} propagator over {} points",
            self.propagator, self.grid.n());
        let prop: LinePropagator
            = match self.propagator {
                LineScheme::Cayley
                    => Box::new(Cayley1D::new(model)?),
                LineScheme::RungeKutta4
                    => Box::new(Direct1D::new(model, DirectMethod::RungeKutta4)?),
                LineScheme::Midpoint
                    => Box::new(Direct1D::new(model, DirectMethod::Midpoint)?),
                LineScheme::ImaginaryTime
                    => Box::new(ImaginaryTime1D::new(model)?),
            };
        Ok(prop)
    }

    /// Build a stationary-state solver for the static potential. Packets,
    /// fields, and boundaries play no part.
    pub fn solver(&self) -> CResult<StationarySolver> {
        let model = self.model()?;
        let solver
            = StationarySolver::new(
                self.grid.clone(),
                self.particle,
                self.units,
                model.static_potential(),
            )?
            .with_clamp(self.clamp);
        Ok(solver)
    }
}

/// Description of a 2D simulation.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaneConfig {
    pub grid: Grid2,
    #[serde(default)]
    pub particle: Particle,
    #[serde(default)]
    pub units: Units,
    pub time_step: f64,
    #[serde(default)]
    pub propagator: PlaneScheme,
    #[serde(default)]
    pub potentials: Vec<Potential2D>,
    #[serde(default)]
    pub packets: Vec<Packet2D>,
    pub efield: Option<ElectricField>,
    pub bfield: Option<MagneticField>,
    #[serde(default)]
    pub xboundary: Boundary,
    #[serde(default)]
    pub yboundary: Boundary,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub suzuki: bool,
    #[serde(default = "def_clamp")]
    pub clamp: f64,
    #[serde(default = "def_interval_plane")]
    pub output_interval: usize,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl PlaneConfig {
    /// Validate the description and assemble a model from it.
    pub fn model(&self) -> CResult<Model2D> {
        let mut model
            = Model2D::new(self.grid.clone(), self.particle, self.time_step)?
            .with_units(self.units)
            .with_clamp(self.clamp)
            .with_suzuki(self.suzuki)
            .with_boundaries(self.xboundary, self.yboundary)?
            .with_output_interval(self.output_interval)?
            .with_diagnostics(self.diagnostics)?;
        if let Some(field) = self.efield {
            model = model.with_efield(field);
        }
        if let Some(field) = self.bfield {
            model = model.with_bfield(field);
        }
        for shape in self.potentials.iter() {
            model.add_shape(shape.clone())?;
        }
        for packet in self.packets.iter() {
            model.add_packet(packet.clone())?;
        }
        for source in self.sources.iter() {
            model.add_source(source.clone())?;
        }
        Ok(model)
    }

    /// Build the selected propagator.
    pub fn build(&self) -> CResult<PlanePropagator> {
        let model = self.model()?;
        debug!("building {:?} propagator over {}x{} points",
            self.propagator, self.grid.nx(), self.grid.ny());
        let prop: PlanePropagator
            = match self.propagator {
                PlaneScheme::Cayley
                    => Box::new(Cayley2D::new(model)?),
                PlaneScheme::ImaginaryTime
                    => Box::new(ImaginaryTime2D::new(model)?),
            };
        Ok(prop)
    }
}

/// A complete simulation description.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Simulation {
    Line(LineConfig),
    Plane(PlaneConfig),
}

/// A propagator built from a [`Simulation`].
pub enum Built {
    Line(LinePropagator),
    Plane(PlanePropagator),
}

impl Simulation {
    /// Parse a description from TOML text.
    pub fn from_toml_str(s: &str) -> CResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validate the description and build its propagator.
    pub fn build(&self) -> CResult<Built> {
        match self {
            Self::Line(config) => config.build().map(Built::Line),
            Self::Plane(config) => config.build().map(Built::Plane),
        }
    }
}

/// Read a [`Simulation`] from a TOML file.
pub fn read_toml<P>(path: P) -> CResult<Simulation>
where P: AsRef<Path>
{
    let path = path.as_ref();
    let contents
        = fs::read_to_string(path)
        .map_err(|source| {
            ConfigError::Io { path: path.display().to_string(), source }
        })?;
    Simulation::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::error::ModelError;

    const LINE: &str = r#"
        kind = "line"
        time_step = 0.002
        propagator = "runge_kutta4"
        clamp = 1e300
        output_interval = 10

        [grid]
        n = 201
        xmin = -10.0
        xmax = 10.0

        [particle]
        mass = 1.0
        charge = 0.0

        [units]
        mass = 1.0
        energy = 1.0

        [[potentials]]
        shape = "harmonic_oscillator"
        k = 0.5
        offset = 0.0

        [[packets]]
        kind = "gaussian"
        sigma = 1.5
        center = 1.0
    "#;

    const PLANE: &str = r#"
        kind = "plane"
        time_step = 0.01
        suzuki = true

        [grid]
        nx = 32
        ny = 24
        xmin = -8.0
        xmax = 8.0
        ymin = -6.0
        ymax = 6.0

        [bfield]
        intensity = 0.5

        [xboundary]
        kind = "absorbing"
        length_fraction = 0.1
        absorption = 0.01

        [[potentials]]
        imaginary = true
        shape = { kind = "harmonic", center = [0.0, 0.0], k = 0.01 }

        [[packets]]
        kind = "gaussian"
        sigma = 1.0
        center = [-2.0, 0.0]
        momentum = [1.0, 0.0]

        [[sources]]
        kind = "point"
        center = [3.0, 0.0]
        period = 0.05
    "#;

    #[test]
    fn line_description() {
        let Simulation::Line(config) = Simulation::from_toml_str(LINE).unwrap()
            else { panic!("expected a line description") };
        assert_eq!(config.propagator, LineScheme::RungeKutta4);
        assert_eq!(config.boundary, Boundary::None);
        assert_eq!(config.potentials.len(), 1);
        let prop = config.build().unwrap();
        assert_eq!(prop.output_interval(), 10);
        let snap = prop.snapshot().unwrap();
        assert_abs_diff_eq!(snap.norm, 1.0, epsilon = 1e-12);
        assert_eq!(snap.amplitude.len(), 201);
    }

    #[test]
    fn plane_description() {
        let sim = Simulation::from_toml_str(PLANE).unwrap();
        let Simulation::Plane(ref config) = sim
            else { panic!("expected a plane description") };
        assert!(config.suzuki);
        assert_eq!(config.propagator, PlaneScheme::Cayley);
        assert_eq!(config.output_interval, OUTPUT_INTERVAL_PLANE);
        assert!(config.xboundary.is_absorbing());
        assert!(!config.yboundary.is_absorbing());
        assert_eq!(config.sources.len(), 1);
        let Built::Plane(mut prop) = sim.build().unwrap()
            else { panic!("expected a 2D propagator") };
        assert_eq!(prop.snapshot().unwrap().amplitude.dim(), (32, 24));
        prop.run_steps(5).unwrap();
        assert_eq!(prop.steps(), 5);
    }

    #[test]
    fn defaults_fill_in() {
        let sim = Simulation::from_toml_str(r#"
            kind = "line"
            time_step = 0.01
            grid = { n = 64, xmin = 0.0, xmax = 1.0 }
        "#).unwrap();
        let Simulation::Line(config) = sim
            else { panic!("expected a line description") };
        assert_eq!(config.units, Units::default());
        assert_eq!(config.clamp, POTENTIAL_CLAMP);
        assert_eq!(config.output_interval, OUTPUT_INTERVAL_LINE);
        assert_eq!(config.diagnostics, Diagnostics::default());
        assert!(config.packets.is_empty());
    }

    #[test]
    fn invalid_descriptions_rejected() {
        let bad_grid = Simulation::from_toml_str(r#"
            kind = "line"
            time_step = 0.01
            grid = { n = 2, xmin = 0.0, xmax = 1.0 }
        "#);
        assert!(matches!(bad_grid, Err(ConfigError::Parse(_))));

        let bad_kind = Simulation::from_toml_str(r#"
            kind = "volume"
            time_step = 0.01
        "#);
        assert!(matches!(bad_kind, Err(ConfigError::Parse(_))));

        let Simulation::Line(mut config) = Simulation::from_toml_str(LINE).unwrap()
            else { panic!("expected a line description") };
        config.time_step = -1.0;
        assert!(matches!(
            config.build(),
            Err(ConfigError::Model(ModelError::BadTimeStep(_))),
        ));
        config.time_step = 0.01;
        config.output_interval = 0;
        assert!(matches!(
            config.build(),
            Err(ConfigError::Model(ModelError::BadInterval)),
        ));
    }

    #[test]
    fn missing_file() {
        let err = read_toml("/nonexistent/qbox/simulation.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn solver_from_line_description() {
        let Simulation::Line(config) = Simulation::from_toml_str(LINE).unwrap()
            else { panic!("expected a line description") };
        let states = config.solver().unwrap().solve(2, false).unwrap();
        assert_abs_diff_eq!(states[0].e, 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(states[1].e, 1.5, epsilon = 5e-3);
    }
}
