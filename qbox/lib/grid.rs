//! Uniform finite-difference grids in one and two dimensions.
//!
//! Grid points sit at `x[i] = xmin + i δx` for `i ∊ {0, ..., n - 1}` with
//! `δx = (xmax - xmin) / n`, so the upper bound is never sampled.

use std::fmt;
use ndarray as nd;
use ndarray::Dimension;
use serde::Deserialize;
use crate::error::GridError;

/// Common interface over grids of different rank, used to tie arrays sampled
/// over a grid to a concrete [`nd::Dimension`].
pub trait Grid: Clone + fmt::Debug + Send + Sync + 'static {
    /// Array dimension of fields sampled over the grid.
    type Dim: nd::Dimension;

    /// Array shape of fields sampled over the grid.
    fn dim(&self) -> Self::Dim;

    /// Total number of grid points.
    fn size(&self) -> usize { self.dim().size() }

    /// Return `Ok` if `shape` matches the grid.
    fn check_shape(&self, shape: &[usize]) -> Result<(), crate::error::ModelError> {
        crate::error::ModelError::check_shape(self.dim().slice(), shape)
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
struct Grid1Spec {
    n: usize,
    xmin: f64,
    xmax: f64,
}

/// One-dimensional grid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Grid1Spec")]
pub struct Grid1 {
    n: usize,
    xmin: f64,
    xmax: f64,
    dx: f64,
}

impl TryFrom<Grid1Spec> for Grid1 {
    type Error = GridError;

    fn try_from(spec: Grid1Spec) -> Result<Self, Self::Error> {
        Self::new(spec.n, spec.xmin, spec.xmax)
    }
}

impl Grid1 {
    /// Create a new grid of `n` points over `[xmin, xmax)`.
    pub fn new(n: usize, xmin: f64, xmax: f64) -> Result<Self, GridError> {
        GridError::check_axis(n, xmin, xmax)?;
        Ok(Self { n, xmin, xmax, dx: (xmax - xmin) / n as f64 })
    }

    pub fn n(&self) -> usize { self.n }

    pub fn xmin(&self) -> f64 { self.xmin }

    pub fn xmax(&self) -> f64 { self.xmax }

    /// Grid spacing.
    pub fn dx(&self) -> f64 { self.dx }

    /// Coordinate of the `i`-th point.
    pub fn x(&self, i: usize) -> f64 { self.xmin + i as f64 * self.dx }

    /// Midpoint of the grid extent.
    pub fn center(&self) -> f64 { (self.xmin + self.xmax) / 2.0 }

    /// All grid coordinates.
    pub fn coords(&self) -> nd::Array1<f64> {
        (0..self.n).map(|i| self.x(i)).collect()
    }

    /// Index of the grid point closest to `x`, clamped to the grid.
    pub fn index_of(&self, x: f64) -> usize {
        let k = ((x - self.xmin) / self.dx).round();
        if k <= 0.0 { 0 } else { (k as usize).min(self.n - 1) }
    }

    /// Change the extent, recomputing the spacing.
    pub fn set_extent(&mut self, xmin: f64, xmax: f64) -> Result<(), GridError> {
        *self = Self::new(self.n, xmin, xmax)?;
        Ok(())
    }

    /// Change the number of points, recomputing the spacing.
    pub fn set_points(&mut self, n: usize) -> Result<(), GridError> {
        *self = Self::new(n, self.xmin, self.xmax)?;
        Ok(())
    }
}

impl Grid for Grid1 {
    type Dim = nd::Ix1;

    fn dim(&self) -> nd::Ix1 { nd::Dim(self.n) }
}

#[derive(Copy, Clone, Debug, Deserialize)]
struct Grid2Spec {
    nx: usize,
    ny: usize,
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

/// Two-dimensional grid. Fields sampled over it are indexed `[i, j]` with `i`
/// along x.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Grid2Spec")]
pub struct Grid2 {
    x: Grid1,
    y: Grid1,
}

impl TryFrom<Grid2Spec> for Grid2 {
    type Error = GridError;

    fn try_from(spec: Grid2Spec) -> Result<Self, Self::Error> {
        Self::new((spec.nx, spec.ny), (spec.xmin, spec.xmax), (spec.ymin, spec.ymax))
    }
}

impl Grid2 {
    /// Create a new grid of `nx × ny` points over `[xmin, xmax) × [ymin,
    /// ymax)`.
    pub fn new(n: (usize, usize), xlim: (f64, f64), ylim: (f64, f64))
        -> Result<Self, GridError>
    {
        Ok(Self {
            x: Grid1::new(n.0, xlim.0, xlim.1)?,
            y: Grid1::new(n.1, ylim.0, ylim.1)?,
        })
    }

    /// Grid along x.
    pub fn xaxis(&self) -> &Grid1 { &self.x }

    /// Grid along y.
    pub fn yaxis(&self) -> &Grid1 { &self.y }

    pub fn nx(&self) -> usize { self.x.n }

    pub fn ny(&self) -> usize { self.y.n }

    pub fn dx(&self) -> f64 { self.x.dx }

    pub fn dy(&self) -> f64 { self.y.dx }

    pub fn x(&self, i: usize) -> f64 { self.x.x(i) }

    pub fn y(&self, j: usize) -> f64 { self.y.x(j) }

    pub fn xmin(&self) -> f64 { self.x.xmin }

    pub fn ymin(&self) -> f64 { self.y.xmin }

    /// Change the extents, recomputing the spacings.
    pub fn set_extent(&mut self, xlim: (f64, f64), ylim: (f64, f64))
        -> Result<(), GridError>
    {
        let x = Grid1::new(self.x.n, xlim.0, xlim.1)?;
        let y = Grid1::new(self.y.n, ylim.0, ylim.1)?;
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Change the number of points, recomputing the spacings.
    pub fn set_points(&mut self, n: (usize, usize)) -> Result<(), GridError> {
        let x = Grid1::new(n.0, self.x.xmin, self.x.xmax)?;
        let y = Grid1::new(n.1, self.y.xmin, self.y.xmax)?;
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Sample a function of `(x, y)` over the grid.
    pub fn sample<A, F>(&self, mut f: F) -> nd::Array2<A>
    where F: FnMut(f64, f64) -> A
    {
        nd::Array2::from_shape_fn(
            (self.x.n, self.y.n), |(i, j)| f(self.x(i), self.y(j)))
    }
}

impl Grid for Grid2 {
    type Dim = nd::Ix2;

    fn dim(&self) -> nd::Ix2 { nd::Dim((self.x.n, self.y.n)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spacing_follows_extent() {
        let mut grid = Grid1::new(100, -10.0, 10.0).unwrap();
        assert_abs_diff_eq!(grid.dx(), 0.2, epsilon = 1e-15);
        grid.set_extent(0.0, 5.0).unwrap();
        assert_abs_diff_eq!(grid.dx(), 0.05, epsilon = 1e-15);
        grid.set_points(50).unwrap();
        assert_abs_diff_eq!(grid.dx(), 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(grid.x(49), 4.9, epsilon = 1e-12);
    }

    #[test]
    fn rejects_degenerate_axes() {
        assert_eq!(Grid1::new(2, 0.0, 1.0), Err(GridError::TooFewPoints(2)));
        assert_eq!(Grid1::new(10, 1.0, 1.0), Err(GridError::BadExtent(1.0, 1.0)));
        let mut grid = Grid2::new((10, 10), (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert!(grid.set_extent((0.0, 1.0), (2.0, -2.0)).is_err());
        assert_abs_diff_eq!(grid.dy(), 0.1, epsilon = 1e-15);
    }

    #[test]
    fn nearest_index() {
        let grid = Grid1::new(20, 0.0, 2.0).unwrap();
        assert_eq!(grid.index_of(0.52), 5);
        assert_eq!(grid.index_of(-3.0), 0);
        assert_eq!(grid.index_of(10.0), 19);
    }

    #[test]
    fn grid2_shape() {
        let grid = Grid2::new((4, 6), (0.0, 1.0), (0.0, 3.0)).unwrap();
        assert_eq!(grid.dim(), nd::Dim((4, 6)));
        let f = grid.sample(|x, y| x + y);
        assert_eq!(f.shape(), &[4, 6]);
        assert_abs_diff_eq!(f[[2, 3]], 0.5 + 1.5, epsilon = 1e-12);
        assert!(grid.check_shape(&[4, 6]).is_ok());
        assert!(grid.check_shape(&[6, 4]).is_err());
    }
}
