use std::{ env, fs::{ self, File }, path::PathBuf };
use anyhow::{ bail, Context, Result };
use log::info;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use qbox::{
    config::{ read_toml, LineScheme, Simulation },
    solve::Solution,
    timedep::Propagator,
};

const MAX_STATES: usize = 8;
const MAX_STEPS: usize = 20_000;
const E_TOL: f64 = 1e-10;

const DEFAULT: &str = r#"
    kind = "line"
    time_step = 0.01
    clamp = 1e300
    output_interval = 100

    [grid]
    n = 1000
    xmin = -5.0
    xmax = 5.0

    [particle]
    mass = 1.0
    charge = 0.0

    [units]
    mass = 1.0
    energy = 1.0

    [[potentials]]
    shape = "quartic_double_well"
    asymmetry = 0.05
    minima = [1.5, 1.5]
    v0 = 4.0

    [[packets]]
    kind = "gaussian"
    sigma = 1.0
    center = 1.0
"#;

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp_secs()
        .init();

    let sim
        = match env::args().nth(1) {
            Some(path) => read_toml(&path)
                .with_context(|| format!("loading {}", path))?,
            None => Simulation::from_toml_str(DEFAULT)?,
        };
    let Simulation::Line(config) = sim
        else { bail!("ground_state requires a line description") };

    let model = config.model()?;
    let x = model.grid().coords();
    let v = model.static_potential();

    let sols: Vec<Solution> = config.solver()?.solve(MAX_STATES, true)?;
    let energies: nd::Array1<f64> = sols.iter().map(|sol| sol.e).collect();
    sols.iter().enumerate()
        .for_each(|(n, sol)| { info!("E[{}] = {:.8}", n, sol.e); });
    let wfs: nd::Array2<f64>
        = nd::stack(
            nd::Axis(0),
            &sols.iter()
                .filter_map(|sol| sol.wf.as_ref().map(|wf| wf.view()))
                .collect::<Vec<_>>(),
        )?;

    let mut relax = config.clone();
    relax.propagator = LineScheme::ImaginaryTime;
    let mut prop = relax.build()?;
    let mut trace: Vec<f64> = Vec::new();
    let mut last = f64::INFINITY;
    while prop.steps() < MAX_STEPS {
        prop.run_steps(config.output_interval)?;
        let e = prop.snapshot()?
            .energy
            .map(|en| en.total)
            .context("energy diagnostics are disabled")?;
        trace.push(e);
        let delta = (last - e).abs();
        last = e;
        if delta < E_TOL { break; }
    }
    let snap = prop.snapshot()?;
    info!("imaginary time: E = {:.8} after {} steps", last, snap.step);
    if let Some(e0) = energies.first() {
        info!("deviation from lowest eigenvalue: {:.3e}", last - e0);
    }

    let outdir = PathBuf::from("output");
    fs::create_dir_all(&outdir)?;
    let mut npz = NpzWriter::new(File::create(outdir.join("ground_state.npz"))?);
    npz.add_array("x", &x)?;
    npz.add_array("v", &v)?;
    npz.add_array("e", &energies)?;
    npz.add_array("wf", &wfs)?;
    npz.add_array("relaxed", &snap.amplitude)?;
    npz.add_array("e_relax", &nd::Array1::from(trace))?;
    npz.finish()?;
    Ok(())
}
