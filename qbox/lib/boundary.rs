//! Grid-edge boundary treatments.
//!
//! An absorbing layer adds a damping coefficient that grows linearly with
//! depth into a band of `⌊length_fraction * n⌋` cells at each end of an axis.
//! The coefficient is dimensionless and per step: it is added to the real part
//! of the Cayley operator `K = i (δt/2) H + Γ` (see [`timedep`][crate::timedep]).

use ndarray as nd;
use serde::Deserialize;
use crate::error::ModelError;

/// Default absorbing layer, as a fraction of the axis length.
pub const DEF_LENGTH_FRACTION: f64 = 0.1;

/// Default absorption per cell of depth for 1D grids.
pub const DEF_ABSORPTION_LINE: f64 = 0.001;

/// Default absorption per cell of depth for 2D grids.
pub const DEF_ABSORPTION_PLANE: f64 = 0.01;

/// Boundary treatment along one axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Boundary {
    /// Hard wall: the wavefunction vanishes just outside the grid.
    #[default]
    None,
    /// Absorbing layer at both ends of the axis.
    Absorbing {
        length_fraction: f64,
        absorption: f64,
    },
}

impl Boundary {
    /// Absorbing layer with the default 1D parameters.
    pub fn absorbing_line() -> Self {
        Self::Absorbing {
            length_fraction: DEF_LENGTH_FRACTION,
            absorption: DEF_ABSORPTION_LINE,
        }
    }

    /// Absorbing layer with the default 2D parameters.
    pub fn absorbing_plane() -> Self {
        Self::Absorbing {
            length_fraction: DEF_LENGTH_FRACTION,
            absorption: DEF_ABSORPTION_PLANE,
        }
    }

    pub fn is_absorbing(&self) -> bool { matches!(self, Self::Absorbing { .. }) }

    /// Check that the layer fits within half the axis and that absorption is
    /// non-negative.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::None => Ok(()),
            Self::Absorbing { length_fraction: f, absorption: a } => {
                ((0.0..=0.5).contains(f) && *a >= 0.0 && a.is_finite())
                    .then_some(())
                    .ok_or(ModelError::BadBoundary(*f, *a))
            },
        }
    }

    /// Width of the layer in cells for an axis of `n` points.
    pub fn layer(&self, n: usize) -> usize {
        match self {
            Self::None => 0,
            Self::Absorbing { length_fraction, .. } => {
                (length_fraction * n as f64) as usize
            },
        }
    }

    /// Damping coefficient at cell `i` of an axis of `n` points.
    pub fn damping(&self, i: usize, n: usize) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Absorbing { absorption, .. } => {
                let lg = self.layer(n);
                if i < lg {
                    absorption * (lg - i) as f64
                } else if i + lg > n {
                    absorption * (i + lg - n) as f64
                } else {
                    0.0
                }
            },
        }
    }

    /// Damping coefficients for every cell of an axis of `n` points.
    pub fn profile(&self, n: usize) -> nd::Array1<f64> {
        (0..n).map(|i| self.damping(i, n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn layer_grows_toward_edges() {
        let b = Boundary::Absorbing { length_fraction: 0.1, absorption: 0.01 };
        let p = b.profile(100);
        assert_eq!(b.layer(100), 10);
        assert_abs_diff_eq!(p[0], 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(p[9], 0.01, epsilon = 1e-15);
        assert_eq!(p[10], 0.0);
        assert_eq!(p[50], 0.0);
        assert_eq!(p[90], 0.0);
        assert_abs_diff_eq!(p[91], 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(p[99], 0.09, epsilon = 1e-15);
        assert!(Boundary::None.profile(10).iter().all(|d| *d == 0.0));
    }

    #[test]
    fn validation() {
        assert!(Boundary::absorbing_plane().validate().is_ok());
        assert!(Boundary::Absorbing { length_fraction: 0.7, absorption: 0.1 }
            .validate().is_err());
        assert!(Boundary::Absorbing { length_fraction: 0.1, absorption: -0.1 }
            .validate().is_err());
    }

    #[test]
    fn deserialize() {
        let b: Boundary = toml::from_str(
            "kind = \"absorbing\"\nlength_fraction = 0.2\nabsorption = 0.05").unwrap();
        assert_eq!(b, Boundary::Absorbing { length_fraction: 0.2, absorption: 0.05 });
    }
}
