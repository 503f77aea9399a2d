//! Miscellaneous tools.
//!
//! Wavefunctions on the grid are normalized so that the plain sum of squared
//! magnitudes over all points equals 1; no cell volume is included.

use std::ops::DivAssign;
use log::warn;
use ndarray::{ self as nd, Ix1, concatenate };
use num_complex::{ Complex64 as C64, ComplexFloat };
use num_traits::{ Float, Zero };
use rustfft as fft;

/// Calculate the norm (sum of squared magnitudes) of a wavefunction.
pub fn wf_norm<S, A, D>(q: &nd::ArrayBase<S, D>) -> A::Real
where
    S: nd::Data<Elem = A>,
    A: ComplexFloat,
    D: nd::Dimension,
{
    q.iter()
        .fold(A::Real::zero(), |acc, qk| acc + (qk.conj() * *qk).re())
}

/// Calculate the inner product `⟨q|p⟩` of two wavefunctions.
///
/// *Panics if the arrays have different shapes*.
pub fn wf_dot<S, T, A, D>(q: &nd::ArrayBase<S, D>, p: &nd::ArrayBase<T, D>)
    -> A
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    A: ComplexFloat,
    D: nd::Dimension,
{
    nd::Zip::from(q).and(p)
        .fold(A::zero(), |acc, qk, pk| acc + qk.conj() * *pk)
}

/// Renormalize a wavefunction in place, returning its norm before
/// renormalization.
///
/// A wavefunction with zero norm is left untouched.
pub fn wf_renormalize<S, A, D>(q: &mut nd::ArrayBase<S, D>) -> A::Real
where
    S: nd::DataMut<Elem = A>,
    A: ComplexFloat + DivAssign<A::Real>,
    D: nd::Dimension,
{
    let norm = wf_norm(q);
    if norm > A::Real::zero() && Float::is_finite(norm) {
        let scale = Float::sqrt(norm);
        q.iter_mut().for_each(|qk| { *qk /= scale; });
    } else {
        warn!("utils::wf_renormalize: wavefunction has zero or non-finite norm");
    }
    norm
}

/// Generate an array of frequency-space coordinates to accompany a FFT of `n`
/// points for sampling interval `dt`.
pub fn fft_freq(n: usize, dt: f64) -> nd::Array1<f64> {
    let m = (n + 1) / 2;
    let fp: nd::Array1<f64>
        = (0..m)
        .map(|k| k as f64 / (n as f64 * dt))
        .collect();
    let fm: nd::Array1<f64>
        = (1..n - m + 1).rev()
        .map(|k| -(k as f64) / (n as f64 * dt))
        .collect();
    concatenate!(nd::Axis(0), fp, fm)
}

/// Perform the one-dimensional, complex-valued FFT.
pub fn fft<S>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    let n: usize = x.len();
    let mut f: Vec<C64> = x.iter().copied().collect();
    let mut plan = fft::FftPlanner::new();
    let fft_plan = plan.plan_fft_forward(n);
    fft_plan.process(&mut f);
    nd::Array1::from_vec(f)
}

/// Return a copy of `x` with indices shifted to map super-Nyquist frequency
/// components to negative frequencies.
pub fn fft_shift<S, A>(x: &nd::ArrayBase<S, Ix1>) -> nd::Array1<A>
where
    S: nd::Data<Elem = A>,
    A: Clone,
{
    let n = x.len();
    let (p, m) = x.view().split_at(nd::Axis(0), (n + 1) / 2);
    concatenate!(nd::Axis(0), m, p)
}
