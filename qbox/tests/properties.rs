use approx::assert_abs_diff_eq;
use ndarray as nd;
use qbox::{
    boundary::Boundary,
    field::MagneticField,
    grid::{ Grid1, Grid2 },
    packet::{ Packet1D, Packet2D },
    particle::Particle,
    potential::{ Potential2D, Shape1D, Shape2D },
    solve::StationarySolver,
    timedep::{ Cayley1D, Cayley2D, ImaginaryTime1D, Model1D, Model2D, Propagator },
    tridiag,
    units::Units,
    utils::wf_norm,
    C64,
};

fn natural_model(n: usize, xlim: (f64, f64), dt: f64) -> Model1D {
    let grid = Grid1::new(n, xlim.0, xlim.1).unwrap();
    Model1D::new(grid, Particle::new(1.0, 0.0).unwrap(), dt).unwrap()
        .with_units(Units::natural())
}

#[test]
fn cayley_conserves_norm() {
    let model = natural_model(256, (-16.0, 16.0), 0.01)
        .with_shape(Shape1D::HarmonicOscillator { k: 0.05, offset: 0.0 })
        .unwrap()
        .with_packet(Packet1D::Gaussian {
            magnitude: 3.0, sigma: 1.0, center: -3.0, momentum: 4.0 })
        .unwrap();
    let mut prop = Cayley1D::new(model).unwrap();
    assert_abs_diff_eq!(prop.snapshot().unwrap().norm, 1.0, epsilon = 1e-12);
    prop.run_steps(10_000).unwrap();
    assert_abs_diff_eq!(prop.snapshot().unwrap().norm, 1.0, epsilon = 1e-6);
}

#[test]
fn cayley2d_conserves_norm_in_magnetic_field() {
    for suzuki in [false, true] {
        let grid = Grid2::new((40, 40), (-10.0, 10.0), (-10.0, 10.0)).unwrap();
        let model = Model2D::new(grid, Particle::new(1.0, 1.0).unwrap(), 0.01).unwrap()
            .with_units(Units::natural())
            .with_shape(Potential2D::real(Shape2D::Harmonic {
                center: (0.0, 0.0), k: 0.02, offset: 0.0 }))
            .unwrap()
            .with_shape(Potential2D::real(Shape2D::Elliptical {
                center: (2.0, 1.0), rx: 1.5, ry: 1.0, energy: 0.5 }))
            .unwrap()
            .with_bfield(MagneticField::constant(0.4))
            .with_suzuki(suzuki)
            .with_packet(Packet2D::Gaussian {
                magnitude: 1.0, sigma: 2.0, center: (-3.0, 0.0), momentum: (1.5, 0.5) })
            .unwrap();
        let mut prop = Cayley2D::new(model).unwrap();
        assert_abs_diff_eq!(prop.snapshot().unwrap().norm, 1.0, epsilon = 1e-12);
        prop.run_steps(10_000).unwrap();
        assert_eq!(prop.steps(), 10_000);
        assert_abs_diff_eq!(prop.snapshot().unwrap().norm, 1.0, epsilon = 1e-6);
    }
}

#[test]
fn thomas_reproduces_closed_form() {
    // -x[i - 1] + 2 x[i] - x[i + 1] = 2 with x vanishing outside the system
    // is solved by x[i] = (i + 1) (n - i)
    let n = 50;
    let a = nd::Array1::from_elem(n, -1.0);
    let b = nd::Array1::from_elem(n, 2.0);
    let c = nd::Array1::from_elem(n, -1.0);
    let d = nd::Array1::from_elem(n, 2.0);
    let x = tridiag::solve(&a, &b, &c, &d).unwrap();
    x.iter().enumerate()
        .for_each(|(i, xi)| {
            assert_abs_diff_eq!(*xi, ((i + 1) * (n - i)) as f64, epsilon = 1e-9);
        });

    let z = C64::new(1.0, -2.0);
    let dz = d.mapv(|di| z * di);
    let xz = tridiag::solve(&a.mapv(C64::from), &b.mapv(C64::from), &c.mapv(C64::from), &dz)
        .unwrap();
    xz.iter().enumerate()
        .for_each(|(i, xi)| {
            let expected = z * ((i + 1) * (n - i)) as f64;
            assert_abs_diff_eq!((xi - expected).norm(), 0.0, epsilon = 1e-9);
        });
}

#[test]
fn square_well_spectrum_scales_quadratically() {
    let grid = Grid1::new(400, 0.0, 10.0).unwrap();
    let solver = StationarySolver::new(
        grid,
        Particle::new(1.0, 0.0).unwrap(),
        Units::natural(),
        nd::Array1::zeros(400),
    ).unwrap();
    let states = solver.solve(4, false).unwrap();
    let e1 = states[0].e;
    for (n, state) in states.iter().enumerate() {
        let k = (n + 1) as f64;
        assert_abs_diff_eq!(state.e / e1, k * k, epsilon = 1e-2 * k * k);
    }
}

#[test]
fn oscillator_spectrum_evenly_spaced() {
    let grid = Grid1::new(401, -10.0, 10.0).unwrap();
    let potential = grid.coords().mapv(|x| 0.5 * x * x);
    let solver = StationarySolver::new(
        grid,
        Particle::new(1.0, 0.0).unwrap(),
        Units::natural(),
        potential,
    ).unwrap()
        .with_clamp(f64::INFINITY);
    let states = solver.solve(6, true).unwrap();
    states.windows(2)
        .for_each(|w| { assert_abs_diff_eq!(w[1].e - w[0].e, 1.0, epsilon = 1e-2); });
    states.iter()
        .for_each(|s| {
            let wf = s.wf.as_ref().unwrap();
            assert_abs_diff_eq!(wf.dot(wf), 1.0, epsilon = 1e-10);
        });
}

#[test]
fn absorbing_boundary_dissipates_norm() {
    let packet = Packet1D::Gaussian {
        magnitude: 1.0, sigma: 1.0, center: 5.0, momentum: 6.0 };

    let open = natural_model(400, (-20.0, 20.0), 0.005)
        .with_boundary(Boundary::Absorbing { length_fraction: 0.1, absorption: 0.01 })
        .unwrap()
        .with_packet(packet.clone())
        .unwrap();
    let mut prop = Cayley1D::new(open).unwrap();
    let mut norms = vec![wf_norm(prop.psi().unwrap())];
    for _ in 0..1500 {
        prop.step().unwrap();
        norms.push(wf_norm(prop.psi().unwrap()));
    }
    norms.windows(2).for_each(|w| assert!(w[1] <= w[0] + 1e-12));
    // the packet front enters the layer (x > 16) after ~1.5 time units
    norms[300..700].windows(2).for_each(|w| assert!(w[1] < w[0]));
    assert!(*norms.last().unwrap() < 0.2);

    let closed = natural_model(400, (-20.0, 20.0), 0.005)
        .with_packet(packet)
        .unwrap();
    let mut prop = Cayley1D::new(closed).unwrap();
    for _ in 0..1500 {
        prop.step().unwrap();
        assert!(wf_norm(prop.psi().unwrap()) >= 1.0 - 1e-10);
    }
}

#[test]
fn imaginary_time_finds_ground_state() {
    let model = natural_model(201, (-10.0, 10.0), 0.05)
        .with_clamp(f64::INFINITY)
        .with_shape(Shape1D::HarmonicOscillator { k: 0.5, offset: 0.0 })
        .unwrap()
        .with_packet(Packet1D::Uniform {
            magnitude: 1.0, start: -1.0, width: 5.0, momentum: 0.0 })
        .unwrap();
    let mut prop = ImaginaryTime1D::new(model).unwrap();
    let mut energies = vec![prop.snapshot().unwrap().energy.unwrap().total];
    for _ in 0..50 {
        prop.run_steps(10).unwrap();
        energies.push(prop.snapshot().unwrap().energy.unwrap().total);
    }
    energies.windows(2).for_each(|w| assert!(w[1] <= w[0] + 1e-10));
    assert_abs_diff_eq!(*energies.last().unwrap(), 0.5, epsilon = 1e-3);
}

#[test]
fn free_packet_keeps_momentum() {
    let model = natural_model(1000, (-50.0, 50.0), 0.005)
        .with_packet(Packet1D::Gaussian {
            magnitude: 1.0, sigma: 3.0, center: -5.0, momentum: 2.0 })
        .unwrap();
    let mut prop = Cayley1D::new(model).unwrap();
    let p0 = prop.snapshot().unwrap().expectation.unwrap().momentum[0];
    assert_abs_diff_eq!(p0, 2.0, epsilon = 2e-2);
    let e0 = prop.snapshot().unwrap().energy.unwrap().kinetic;
    for _ in 0..10 {
        prop.run_steps(100).unwrap();
        let snap = prop.snapshot().unwrap();
        assert_abs_diff_eq!(snap.expectation.unwrap().momentum[0], p0, epsilon = 1e-6);
        assert_abs_diff_eq!(snap.energy.unwrap().kinetic, e0, epsilon = 1e-6);
    }
}
