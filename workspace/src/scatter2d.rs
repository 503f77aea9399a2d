use std::{ fs::{ self, File }, path::PathBuf };
use anyhow::Result;
use log::info;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use qbox::{
    boundary::Boundary,
    field::MagneticField,
    grid::Grid2,
    packet::Packet2D,
    particle::Particle,
    potential::{ Potential2D, Shape2D },
    timedep::{ Cayley2D, Diagnostics, Model2D, Propagator },
    units::Units,
};

const STEPS: usize = 1200;

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp_secs()
        .init();

    let grid = Grid2::new((160, 160), (-16.0, 16.0), (-16.0, 16.0))?;
    let model
        = Model2D::new(grid.clone(), Particle::new(1.0, 1.0)?, 0.01)?
        .with_units(Units::natural())
        .with_shape(Potential2D::real(Shape2D::Elliptical {
            center: (0.0, 0.0), rx: 1.5, ry: 1.5, energy: 3.0 }))?
        .with_bfield(MagneticField::constant(0.15))
        .with_boundaries(Boundary::absorbing_plane(), Boundary::absorbing_plane())?
        .with_output_interval(20)?
        .with_diagnostics(Diagnostics {
            expectation: true, energy: true, current_stride: Some(4) })?
        .with_packet(Packet2D::Gaussian {
            magnitude: 1.0, sigma: 2.0, center: (-8.0, 0.5), momentum: (2.0, 0.0) })?;
    let mut prop = Cayley2D::new(model)?;

    let mut t: Vec<f64> = Vec::new();
    let mut norm: Vec<f64> = Vec::new();
    let mut momentum: Vec<[f64; 2]> = Vec::new();
    let mut density: Vec<nd::Array2<f64>> = Vec::new();
    let mut current = None;
    for _ in 0..STEPS {
        if !prop.step()? { continue; }
        let snap = prop.snapshot()?;
        if let Some(ex) = snap.expectation.as_ref() {
            info!("t = {:.2}: norm {:.6}, <p> = ({:.4}, {:.4})",
                snap.time, snap.norm, ex.momentum[0], ex.momentum[1]);
            momentum.push([ex.momentum[0], ex.momentum[1]]);
        }
        t.push(snap.time);
        norm.push(snap.norm);
        density.push(snap.amplitude);
        current = snap.current;
    }

    let density: nd::Array3<f64>
        = nd::stack(
            nd::Axis(0),
            &density.iter().map(|rho| rho.view()).collect::<Vec<_>>(),
        )?;
    let momentum: nd::Array2<f64>
        = nd::Array2::from_shape_fn((momentum.len(), 2), |(k, a)| momentum[k][a]);
    let outdir = PathBuf::from("output");
    fs::create_dir_all(&outdir)?;
    let mut npz = NpzWriter::new(File::create(outdir.join("scatter2d.npz"))?);
    npz.add_array("x", &grid.xaxis().coords())?;
    npz.add_array("y", &grid.yaxis().coords())?;
    npz.add_array("t", &nd::Array1::from(t))?;
    npz.add_array("norm", &nd::Array1::from(norm))?;
    npz.add_array("p", &momentum)?;
    npz.add_array("density", &density)?;
    if let Some(j) = current.as_ref() {
        npz.add_array("current", j)?;
    }
    npz.finish()?;
    Ok(())
}
