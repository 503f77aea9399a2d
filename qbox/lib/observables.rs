//! Expectation values and derived fields computed from a wavefunction.
//!
//! Every expectation value is divided by the current norm, so results stay
//! meaningful after an absorbing boundary has removed probability. Derivatives
//! use the same zero-ghost-cell stencils as the propagators, which makes the
//! energy observables equal to `⟨H⟩` for the discretized Hamiltonian.
//!
//! Coordinates are in user length units, momenta in internal units (*ħ* = 1,
//! i.e. wavenumbers), and energies in user energy units.

use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    grid::{ Grid1, Grid2 },
    units::Units,
    utils::{ fft, fft_freq, fft_shift, wf_norm },
};

/// Position and momentum expectation values, one entry per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Expectation {
    pub position: nd::Array1<f64>,
    pub momentum: nd::Array1<f64>,
}

/// Energy expectation values in user energy units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Energy {
    pub kinetic: f64,
    pub potential: f64,
    pub total: f64,
}

impl Energy {
    pub fn new(kinetic: f64, potential: f64) -> Self {
        Self { kinetic, potential, total: kinetic + potential }
    }
}

fn inv_norm(norm: f64) -> f64 {
    if norm > 0.0 { norm.recip() } else { 0.0 }
}

fn get1(psi: &nd::ArrayView1<C64>, i: isize) -> C64 {
    if i < 0 || i as usize >= psi.len() {
        C64::from(0.0)
    } else {
        psi[i as usize]
    }
}

// Σ ψ*ᵢ (ψᵢ₊₁ - ψᵢ₋₁) along one lane.
fn central_lane(psi: nd::ArrayView1<C64>) -> C64 {
    (0..psi.len() as isize)
        .map(|i| psi[i as usize].conj() * (get1(&psi, i + 1) - get1(&psi, i - 1)))
        .sum()
}

// Σ ψ*ᵢ (ψᵢ₊₁ - 2ψᵢ + ψᵢ₋₁) along one lane.
fn laplace_lane(psi: nd::ArrayView1<C64>) -> C64 {
    (0..psi.len() as isize)
        .map(|i| {
            let qi = psi[i as usize];
            qi.conj() * (get1(&psi, i + 1) - 2.0 * qi + get1(&psi, i - 1))
        })
        .sum()
}

/// Compute `⟨V⟩ = Σ V |ψ|² / Σ |ψ|²` for a potential `v` in any units.
///
/// *Panics if the arrays have different shapes.*
pub fn potential_energy<S, T, D>(
    psi: &nd::ArrayBase<S, D>,
    v: &nd::ArrayBase<T, D>,
) -> f64
where
    S: nd::Data<Elem = C64>,
    T: nd::Data<Elem = f64>,
    D: nd::Dimension,
{
    let norm = wf_norm(psi);
    let acc = nd::Zip::from(psi).and(v)
        .fold(0.0, |acc, q, vk| acc + vk * q.norm_sqr());
    acc * inv_norm(norm)
}

/// Compute `⟨x⟩`.
pub fn position_1d<S>(psi: &nd::ArrayBase<S, nd::Ix1>, grid: &Grid1) -> f64
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    let acc: f64
        = psi.iter().enumerate()
        .map(|(i, q)| i as f64 * q.norm_sqr())
        .sum();
    grid.xmin() + grid.dx() * acc * inv_norm(norm)
}

/// Compute `⟨p⟩` with a central difference.
pub fn momentum_1d<S>(psi: &nd::ArrayBase<S, nd::Ix1>, grid: &Grid1) -> f64
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    central_lane(psi.view()).im / (2.0 * grid.dx()) * inv_norm(norm)
}

/// Compute the kinetic energy `⟨-∂²/2m⟩` in user energy units for a particle
/// of user mass `mass`.
pub fn kinetic_energy_1d<S>(
    psi: &nd::ArrayBase<S, nd::Ix1>,
    grid: &Grid1,
    mass: f64,
    units: &Units,
) -> f64
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    let m = units.to_nat_mass(mass);
    let lap = laplace_lane(psi.view()).re / grid.dx().powi(2);
    let kin: f64 = units.from_nat_energy(-lap / (2.0 * m));
    kin * inv_norm(norm)
}

/// Compute `(⟨x⟩, ⟨y⟩)`.
pub fn position_2d<S>(psi: &nd::ArrayBase<S, nd::Ix2>, grid: &Grid2) -> (f64, f64)
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    let (sx, sy)
        = psi.indexed_iter()
        .fold((0.0, 0.0), |(sx, sy), ((i, j), q)| {
            let rho = q.norm_sqr();
            (sx + i as f64 * rho, sy + j as f64 * rho)
        });
    let k = inv_norm(norm);
    (grid.xmin() + grid.dx() * sx * k, grid.ymin() + grid.dy() * sy * k)
}

/// Compute `(⟨px⟩, ⟨py⟩)` with central differences.
pub fn momentum_2d<S>(psi: &nd::ArrayBase<S, nd::Ix2>, grid: &Grid2) -> (f64, f64)
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    let mx: C64 = psi.axis_iter(nd::Axis(1)).map(central_lane).sum();
    let my: C64 = psi.axis_iter(nd::Axis(0)).map(central_lane).sum();
    let k = inv_norm(norm);
    (mx.im / (2.0 * grid.dx()) * k, my.im / (2.0 * grid.dy()) * k)
}

/// Compute the kinetic energy in user energy units for a particle of user
/// mass `mass`.
pub fn kinetic_energy_2d<S>(
    psi: &nd::ArrayBase<S, nd::Ix2>,
    grid: &Grid2,
    mass: f64,
    units: &Units,
) -> f64
where S: nd::Data<Elem = C64>
{
    let norm = wf_norm(psi);
    let m = units.to_nat_mass(mass);
    let lx: C64 = psi.axis_iter(nd::Axis(1)).map(laplace_lane).sum();
    let ly: C64 = psi.axis_iter(nd::Axis(0)).map(laplace_lane).sum();
    let lap = lx.re / grid.dx().powi(2) + ly.re / grid.dy().powi(2);
    let kin: f64 = units.from_nat_energy(-lap / (2.0 * m));
    kin * inv_norm(norm)
}

/// Compute the probability current `Im(ψ* ∇ψ) / m` (internal units) on every
/// `stride`-th grid point along each axis.
///
/// The result has shape `(⌈nx / stride⌉, ⌈ny / stride⌉, 2)`, with the last
/// axis holding the x and y components.
pub fn current_2d<S>(
    psi: &nd::ArrayBase<S, nd::Ix2>,
    grid: &Grid2,
    mass: f64,
    units: &Units,
    stride: usize,
) -> nd::Array3<f64>
where S: nd::Data<Elem = C64>
{
    let stride = stride.max(1);
    let (nx, ny) = (grid.nx(), grid.ny());
    let m = units.to_nat_mass(mass);
    let cx = 0.5 / (grid.dx() * m);
    let cy = 0.5 / (grid.dy() * m);
    let at = |i: isize, j: isize| -> C64 {
        if i < 0 || j < 0 || i as usize >= nx || j as usize >= ny {
            C64::from(0.0)
        } else {
            psi[[i as usize, j as usize]]
        }
    };
    let mut current: nd::Array3<f64>
        = nd::Array3::zeros((nx.div_ceil(stride), ny.div_ceil(stride), 2));
    current.slice_mut(s![.., .., 0]).indexed_iter_mut()
        .for_each(|((a, b), jx)| {
            let (i, j) = ((a * stride) as isize, (b * stride) as isize);
            let z = at(i, j).conj() * (at(i + 1, j) - at(i - 1, j));
            *jx = z.im * cx;
        });
    current.slice_mut(s![.., .., 1]).indexed_iter_mut()
        .for_each(|((a, b), jy)| {
            let (i, j) = ((a * stride) as isize, (b * stride) as isize);
            let z = at(i, j).conj() * (at(i, j + 1) - at(i, j - 1));
            *jy = z.im * cy;
        });
    current
}

/// Compute the momentum-space probability density of a 1D wavefunction.
///
/// Returns `(k, ρ(k))` with wavenumbers in increasing order and `ρ` summing to
/// one.
pub fn momentum_density<S>(psi: &nd::ArrayBase<S, nd::Ix1>, grid: &Grid1)
    -> (nd::Array1<f64>, nd::Array1<f64>)
where S: nd::Data<Elem = C64>
{
    let n = psi.len();
    let k: nd::Array1<f64>
        = fft_freq(n, grid.dx()) * std::f64::consts::TAU;
    let f = fft(psi);
    let mut rho: nd::Array1<f64> = f.mapv(|z| z.norm_sqr());
    let total = rho.sum();
    rho *= inv_norm(total);
    (fft_shift(&k), fft_shift(&rho))
}
