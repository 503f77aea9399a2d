//! Periodic emitters injecting amplitude into a 2D wavefunction.

use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::Deserialize;
use crate::{
    error::ModelError,
    grid::Grid2,
};

/// Default firing period.
pub const DEF_PERIOD: f64 = 5.0;

/// Default emitted amplitude.
pub const DEF_AMPLITUDE: f64 = 0.1;

fn def_period() -> f64 { DEF_PERIOD }

fn def_amplitude() -> f64 { DEF_AMPLITUDE }

fn def_sigma() -> f64 { 1.0 }

/// Spatial envelope of a [`Source`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Emitter {
    /// Normalized Gaussian spot `exp(-r² / 2σ²) / (√(2π) σ)`.
    Point {
        center: (f64, f64),
        #[serde(default = "def_sigma")]
        sigma: f64,
    },
    /// Uniform `width × height` rectangle around `center`.
    PlaneWave {
        center: (f64, f64),
        width: f64,
        height: f64,
    },
}

/// A periodic emitter. Each firing adds
/// `amplitude * envelope(x, y) * exp(i p·r)` to the wavefunction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Source {
    #[serde(default = "def_period")]
    pub period: f64,
    #[serde(default = "def_amplitude")]
    pub amplitude: f64,
    #[serde(default)]
    pub momentum: (f64, f64),
    #[serde(flatten)]
    pub emitter: Emitter,
}

impl Source {
    /// Point source with default period and amplitude.
    pub fn point(center: (f64, f64), sigma: f64) -> Self {
        Self {
            period: DEF_PERIOD,
            amplitude: DEF_AMPLITUDE,
            momentum: (0.0, 0.0),
            emitter: Emitter::Point { center, sigma },
        }
    }

    /// Plane-wave source with default period and amplitude.
    pub fn plane_wave(center: (f64, f64), width: f64, height: f64) -> Self {
        Self {
            period: DEF_PERIOD,
            amplitude: DEF_AMPLITUDE,
            momentum: (0.0, 0.0),
            emitter: Emitter::PlaneWave { center, width, height },
        }
    }

    pub fn with_momentum(mut self, px: f64, py: f64) -> Self {
        self.momentum = (px, py);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    /// Check that the period and envelope are usable.
    pub fn validate(&self) -> Result<(), ModelError> {
        (self.period.is_finite() && self.period > 0.0).then_some(())
            .ok_or(ModelError::BadPeriod(self.period))?;
        match self.emitter {
            Emitter::Point { sigma, .. } if !(sigma > 0.0) => {
                Err(ModelError::BadPacket(
                    format!("source sigma must be positive; got {sigma}")))
            },
            Emitter::PlaneWave { width, height, .. }
                if !(width > 0.0 && height > 0.0) =>
            {
                Err(ModelError::BadPacket(
                    format!("source extent must be positive; got {width} × {height}")))
            },
            _ => Ok(()),
        }
    }

    /// Number of steps between firings for time step `dt`, never less than
    /// one.
    pub fn interval(&self, dt: f64) -> usize {
        let k = (self.period / dt).round();
        if k < 1.0 { 1 } else { k as usize }
    }

    /// Return `true` if the source fires at step number `step`.
    pub fn due(&self, step: usize, dt: f64) -> bool {
        step >= 1 && step % self.interval(dt) == 0
    }

    /// Add one emission to `psi`.
    pub fn emit<S>(&self, psi: &mut nd::ArrayBase<S, nd::Ix2>, grid: &Grid2)
    where S: nd::DataMut<Elem = C64>
    {
        let (px, py) = self.momentum;
        let phase = |x: f64, y: f64| -> C64 {
            if px == 0.0 && py == 0.0 {
                C64::from(1.0)
            } else {
                C64::cis(px * x + py * y)
            }
        };
        match self.emitter {
            Emitter::Point { center, sigma } => {
                let a = 0.5 / (sigma * sigma);
                let b = self.amplitude / ((std::f64::consts::TAU).sqrt() * sigma);
                psi.indexed_iter_mut()
                    .for_each(|((i, j), q)| {
                        let (x, y) = (grid.x(i), grid.y(j));
                        let r2 = (x - center.0).powi(2) + (y - center.1).powi(2);
                        *q += phase(x, y) * (b * (-a * r2).exp());
                    });
            },
            Emitter::PlaneWave { center, width, height } => {
                let (x0, x1) = (center.0 - 0.5 * width, center.0 + 0.5 * width);
                let (y0, y1) = (center.1 - 0.5 * height, center.1 + 0.5 * height);
                psi.indexed_iter_mut()
                    .for_each(|((i, j), q)| {
                        let (x, y) = (grid.x(i), grid.y(j));
                        if x > x0 && x < x1 && y > y0 && y < y1 {
                            *q += phase(x, y) * self.amplitude;
                        }
                    });
            },
        }
    }
}
