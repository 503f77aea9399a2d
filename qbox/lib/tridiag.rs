//! Direct *O*(*n*) solution of tridiagonal linear systems via the Thomas
//! algorithm.
//!
//! Systems are given in the form
//! ```text
//! a[i] x[i - 1] + b[i] x[i] + c[i] x[i + 1] = d[i]
//! ```
//! where `a[0]` and `c[n - 1]` are ignored. The same code serves real and
//! complex coefficients in single or double precision through
//! [`ComplexFloat`].
//!
//! No pivoting is performed. The schemes built on top of this module produce
//! matrices that are diagonally dominant or have positive-definite Hermitian
//! part, for which elimination without pivoting is stable; a vanishing pivot is
//! reported as [`TridiagError::ZeroPivot`].

use ndarray as nd;
use num_complex::ComplexFloat;
use num_traits::{ Float, Zero };
use crate::{
    Arr1,
    error::{ LengthError, TridiagError },
};

pub type TDResult<T> = Result<T, TridiagError>;

fn check_pivot<T: ComplexFloat>(p: T, row: usize) -> TDResult<()> {
    let mag = p.abs();
    (Float::is_finite(mag) && mag >= T::Real::min_positive_value())
        .then_some(())
        .ok_or(TridiagError::ZeroPivot(row))
}

/// Reusable workspace for repeated solves of same-sized systems.
#[derive(Clone, Debug)]
pub struct Thomas<T> {
    cp: Vec<T>,
}

impl<T: ComplexFloat> Thomas<T> {
    /// Allocate scratch space for systems of `n` rows.
    pub fn new(n: usize) -> Self { Self { cp: vec![T::zero(); n] } }

    /// Solve in place: on entry `x` holds the right-hand side, on exit the
    /// solution.
    ///
    /// If the elimination fails, `x` is left in a partially updated state.
    pub fn solve_inplace<S>(
        &mut self,
        a: &[T],
        b: &[T],
        c: &[T],
        x: &mut nd::ArrayBase<S, nd::Ix1>,
    ) -> TDResult<()>
    where S: nd::DataMut<Elem = T>
    {
        let n = x.len();
        if n == 0 { return Err(TridiagError::Empty); }
        LengthError::check_len(n, a.len())?;
        LengthError::check_len(n, b.len())?;
        LengthError::check_len(n, c.len())?;
        if self.cp.len() != n { self.cp.resize(n, T::zero()); }
        let cp = &mut self.cp;

        check_pivot(b[0], 0)?;
        cp[0] = if n > 1 { c[0] / b[0] } else { T::zero() };
        x[0] = x[0] / b[0];
        for i in 1..n {
            let m = b[i] - a[i] * cp[i - 1];
            check_pivot(m, i)?;
            cp[i] = if i < n - 1 { c[i] / m } else { T::zero() };
            x[i] = (x[i] - a[i] * x[i - 1]) / m;
        }
        for i in (0..n - 1).rev() {
            x[i] = x[i] - cp[i] * x[i + 1];
        }
        Ok(())
    }
}

/// Solve a tridiagonal system, returning the solution as a new array.
pub fn solve<S, T, U, V, A>(
    a: &Arr1<S>,
    b: &Arr1<T>,
    c: &Arr1<U>,
    d: &Arr1<V>,
) -> TDResult<nd::Array1<A>>
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    U: nd::Data<Elem = A>,
    V: nd::Data<Elem = A>,
    A: ComplexFloat,
{
    let n = d.len();
    let a: Vec<A> = a.to_vec();
    let b: Vec<A> = b.to_vec();
    let c: Vec<A> = c.to_vec();
    let mut x: nd::Array1<A> = d.to_owned();
    Thomas::new(n).solve_inplace(&a, &b, &c, &mut x)?;
    Ok(x)
}

/// Compute the product of a tridiagonal matrix with a vector, writing the
/// result into `out`.
///
/// *Panics if the arrays have unequal lengths*.
pub fn apply_into<S, T, A>(
    a: &[A],
    b: &[A],
    c: &[A],
    x: &nd::ArrayBase<S, nd::Ix1>,
    out: &mut nd::ArrayBase<T, nd::Ix1>,
)
where
    S: nd::Data<Elem = A>,
    T: nd::DataMut<Elem = A>,
    A: ComplexFloat,
{
    let n = x.len();
    for i in 0..n {
        let mut acc = b[i] * x[i];
        if i > 0 { acc = acc + a[i] * x[i - 1]; }
        if i + 1 < n { acc = acc + c[i] * x[i + 1]; }
        out[i] = acc;
    }
}

/// Compute the product of a tridiagonal matrix with a vector.
///
/// *Panics if the arrays have unequal lengths*.
pub fn apply<S, A>(a: &[A], b: &[A], c: &[A], x: &nd::ArrayBase<S, nd::Ix1>)
    -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: ComplexFloat,
{
    let mut out: nd::Array1<A> = nd::Array1::from_elem(x.len(), A::zero());
    apply_into(a, b, c, x, &mut out);
    out
}
