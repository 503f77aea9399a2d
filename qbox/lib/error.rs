//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use thiserror::Error;

/// Returned when an operation requiring equal-length arrays encounters arrays
/// with unequal length.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("encountered arrays with incompatible lengths; got {0} and {1}")]
pub struct LengthError(pub usize, pub usize);

impl LengthError {
    pub(crate) fn check_len(expected: usize, got: usize) -> Result<(), Self> {
        (expected == got).then_some(()).ok_or(Self(expected, got))
    }
}

/// Returned from the [tridiagonal solver][crate::tridiag].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TridiagError {
    /// Returned when the system has no rows.
    #[error("tridiagonal system must have at least one row")]
    Empty,

    /// Returned when a pivot vanishes (or is non-finite) during forward
    /// elimination.
    #[error("zero pivot encountered at row {0}")]
    ZeroPivot(usize),

    /// [`LengthError`]
    #[error("array length error: {0}")]
    Length(#[from] LengthError),
}

/// Returned when constructing or resizing a [grid][crate::grid].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// Returned when a grid axis has fewer than three points.
    #[error("grid axes must have at least 3 points; got {0}")]
    TooFewPoints(usize),

    /// Returned when a grid axis has non-increasing or non-finite bounds.
    #[error("grid extent must satisfy min < max; got ({0}, {1})")]
    BadExtent(f64, f64),
}

impl GridError {
    pub(crate) fn check_axis(n: usize, min: f64, max: f64) -> Result<(), Self> {
        (n >= 3).then_some(()).ok_or(Self::TooFewPoints(n))?;
        (min.is_finite() && max.is_finite() && min < max)
            .then_some(())
            .ok_or(Self::BadExtent(min, max))
    }
}

/// Returned when a physical or numerical precondition on the simulated model
/// is violated.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ModelError {
    /// [`GridError`]
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// Returned when a non-positive or non-finite mass is encountered.
    #[error("particle mass must be positive; got {0}")]
    BadMass(f64),

    /// Returned when a non-positive or non-finite time step is encountered.
    #[error("time step must be positive; got {0}")]
    BadTimeStep(f64),

    /// Returned when an output interval of zero is requested.
    #[error("output interval must be greater than 0")]
    BadInterval,

    /// Returned when a current-field stride of zero is requested.
    #[error("current stride must be greater than 0")]
    BadStride,

    /// Returned when an array does not match the shape of the grid.
    #[error("array shape {got:?} does not match grid shape {expected:?}")]
    Shape { expected: Vec<usize>, got: Vec<usize> },

    /// Returned when a field was sampled over a grid other than the model's.
    #[error("field was sampled over a different grid")]
    GridMismatch,

    /// Returned when a wave packet cannot be sampled on the grid.
    #[error("bad wave packet: {0}")]
    BadPacket(String),

    /// Returned when a potential shape has parameters that cannot be sampled,
    /// or samples to non-finite values.
    #[error("bad potential shape: {0}")]
    BadShape(String),

    /// Returned when an initial state has zero or non-finite norm.
    #[error("initial state has zero or non-finite norm")]
    ZeroNorm,

    /// Returned when an absorbing layer fraction is outside `[0, 0.5]` or the
    /// absorption coefficient is negative.
    #[error("absorbing layer must have fraction in [0, 0.5] and non-negative absorption; got ({0}, {1})")]
    BadBoundary(f64, f64),

    /// Returned when a source period is non-positive.
    #[error("source period must be positive; got {0}")]
    BadPeriod(f64),

    /// [`LengthError`]
    #[error("array length error: {0}")]
    Length(#[from] LengthError),
}

impl ModelError {
    pub(crate) fn check_mass(mass: f64) -> Result<(), Self> {
        (mass.is_finite() && mass > 0.0).then_some(()).ok_or(Self::BadMass(mass))
    }

    pub(crate) fn check_time_step(dt: f64) -> Result<(), Self> {
        (dt.is_finite() && dt > 0.0).then_some(()).ok_or(Self::BadTimeStep(dt))
    }

    pub(crate) fn check_norm(norm: f64) -> Result<(), Self> {
        (norm.is_finite() && norm > 0.0).then_some(()).ok_or(Self::ZeroNorm)
    }

    pub(crate) fn check_interval(interval: usize) -> Result<(), Self> {
        (interval != 0).then_some(()).ok_or(Self::BadInterval)
    }

    pub(crate) fn check_shape(expected: &[usize], got: &[usize])
        -> Result<(), Self>
    {
        (expected == got).then_some(())
            .ok_or_else(|| Self::Shape {
                expected: expected.to_vec(),
                got: got.to_vec(),
            })
    }
}

/// Returned from the stationary-state solver.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum XError {
    /// Returned when more states are requested than the grid can hold.
    #[error("requested {requested} states from a grid of dimension {dim}")]
    TooManyStates { requested: usize, dim: usize },

    /// Returned when the QL iteration fails to isolate an eigenvalue.
    #[error("solve: eigenvalue {0} failed to converge")]
    NoConvergence(usize),

    /// [`ModelError`]
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl XError {
    pub(crate) fn check_states(requested: usize, dim: usize)
        -> Result<(), Self>
    {
        (requested <= dim).then_some(())
            .ok_or(Self::TooManyStates { requested, dim })
    }
}

/// Returned from time-dependent propagators.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TError {
    /// [`TridiagError`]
    #[error("tridiagonal solve failed: {0}")]
    Tridiag(#[from] TridiagError),

    /// [`ModelError`]
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Returned when stepping a propagator whose arrays have been released.
    #[error("propagator has been destroyed")]
    Destroyed,
}

impl From<GridError> for TError {
    fn from(err: GridError) -> Self { Self::Model(err.into()) }
}

impl From<LengthError> for TError {
    fn from(err: LengthError) -> Self { Self::Model(err.into()) }
}

/// Returned when loading a simulation description.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when the file cannot be read.
    #[error("could not read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    /// Returned when the contents are not a valid simulation description.
    #[error("could not parse simulation description: {0}")]
    Parse(#[from] toml::de::Error),

    /// [`ModelError`]
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Returned when a propagator cannot be built from a valid description.
    #[error("could not build propagator: {0}")]
    Build(#[from] TError),

    /// Returned when a stationary solver cannot be built from a valid
    /// description.
    #[error("could not build solver: {0}")]
    Solver(#[from] XError),
}

impl From<GridError> for ConfigError {
    fn from(err: GridError) -> Self { Self::Model(err.into()) }
}

/// Returned from [`Session`][crate::session::Session] control operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SessionError {
    /// Returned when the worker thread is gone.
    #[error("session worker has shut down")]
    Disconnected,

    /// Returned when the worker thread cannot be started.
    #[error("could not start session worker: {0}")]
    Spawn(String),

    /// [`TError`]
    #[error("propagation error: {0}")]
    Propagation(#[from] TError),
}
