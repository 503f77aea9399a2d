use std::{ fs::{ self, File }, path::PathBuf, sync::mpsc };
use anyhow::{ Context, Result };
use log::info;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use qbox::{
    boundary::Boundary,
    grid::Grid1,
    observables::momentum_density,
    packet::Packet1D,
    particle::Particle,
    potential::Shape1D,
    session::Session,
    timedep::{ Cayley1D, Model1D },
};

const BARRIER_CENTER: f64 = 0.0; // nm
const BARRIER_WIDTH: f64 = 0.4; // nm
const BARRIER_HEIGHT: f64 = 2.5; // 10⁻¹⁹ J
const STEPS: usize = 3000;

type Spectrum = (nd::Array1<f64>, nd::Array1<f64>);

// read the momentum distribution off the worker between steps
fn momentum_spectrum(session: &Session<Cayley1D>) -> Result<Spectrum> {
    let (tx, rx) = mpsc::channel();
    session.configure(move |prop: &mut Cayley1D| {
        let spectrum = prop.psi().map(|psi| momentum_density(psi, prop.model().grid()));
        tx.send(spectrum).ok();
    })?;
    rx.recv()?.context("propagator has been destroyed")
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp_secs()
        .init();

    let grid = Grid1::new(1024, -20.0, 20.0)?;
    let x = grid.coords();
    let model
        = Model1D::new(grid, Particle::default(), 0.005)?
        .with_shape(Shape1D::BellBarrier {
            center: BARRIER_CENTER,
            width: BARRIER_WIDTH,
            height: BARRIER_HEIGHT,
        })?
        .with_boundary(Boundary::absorbing_line())?
        .with_packet(Packet1D::Gaussian {
            magnitude: 1.0, sigma: 1.5, center: -8.0, momentum: 8.0 })?;
    let v = model.static_potential();
    let interval = model.output_interval();
    let frames = STEPS / interval;

    let session = Session::new(Cayley1D::new(model)?)?;
    let updates = session.subscribe()?;
    let (k, rho_k0) = momentum_spectrum(&session)?;
    session.run_steps(STEPS)?;

    let right: Vec<bool>
        = x.iter().map(|xk| *xk > BARRIER_CENTER + 2.0 * BARRIER_WIDTH).collect();
    let mut t: Vec<f64> = Vec::with_capacity(frames);
    let mut density: Vec<nd::Array1<f64>> = Vec::with_capacity(frames);
    let mut transmitted: Vec<f64> = Vec::with_capacity(frames);
    let mut last_step = 0;
    while density.len() < frames {
        updates.recv().context("session closed before the run finished")?;
        let snap = session.latest().context("no snapshot published")?;
        if snap.step <= last_step { continue; }
        last_step = snap.step;
        let tr: f64
            = snap.amplitude.iter().zip(&right)
            .filter_map(|(rho, r)| r.then_some(*rho))
            .sum();
        info!("t = {:.3} fs: norm {:.6}, right of barrier {:.6}", snap.time, snap.norm, tr);
        t.push(snap.time);
        transmitted.push(tr);
        density.push(snap.amplitude.clone());
    }
    session.wait_idle()?;
    if let Some(err) = session.last_error() { return Err(err.into()); }
    let (_, rho_k) = momentum_spectrum(&session)?;

    let density: nd::Array2<f64>
        = nd::stack(
            nd::Axis(0),
            &density.iter().map(|rho| rho.view()).collect::<Vec<_>>(),
        )?;
    let outdir = PathBuf::from("output");
    fs::create_dir_all(&outdir)?;
    let mut npz = NpzWriter::new(File::create(outdir.join("tunneling.npz"))?);
    npz.add_array("x", &x)?;
    npz.add_array("v", &v)?;
    npz.add_array("t", &nd::Array1::from(t))?;
    npz.add_array("density", &density)?;
    npz.add_array("transmitted", &nd::Array1::from(transmitted))?;
    npz.add_array("k", &k)?;
    npz.add_array("rho_k_initial", &rho_k0)?;
    npz.add_array("rho_k_final", &rho_k)?;
    npz.finish()?;
    Ok(())
}
