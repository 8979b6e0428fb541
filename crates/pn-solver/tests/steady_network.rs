//! End-to-end steady-state solves on small networks.

use pn_model::{DemandModel, HydraulicOptions};
use pn_network::{DemandStatus, LinkStatus, Network, NetworkBuilder, PumpCurve};
use pn_solver::{EngineConfig, HydraulicEngine, NewtonConfig, SolveReport};

fn solve(wn: &mut Network, options: HydraulicOptions) -> SolveReport {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut engine = HydraulicEngine::new(wn, options, EngineConfig::default()).unwrap();
    engine.solve_step(wn).unwrap()
}

#[test]
fn two_reservoir_pipe_follows_hazen_williams() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_reservoir("R2", 20.0);
    b.add_pipe("P1", "R1", "R2", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();

    let report = solve(&mut wn, HydraulicOptions::default());
    let q = report.flows["P1"];
    assert!(q > 0.0);

    let k = 10.666829500036352 * 130.0f64.powf(-1.852) * 0.3f64.powf(-4.871) * 300.0;
    let headloss = q.signum() * k * q.abs().powf(1.852);
    let drop = 60.0 - 20.0;
    assert!(
        ((headloss - drop) / drop).abs() < 1e-6,
        "headloss {headloss} vs available drop {drop}"
    );
    assert!(report.residual_norm < 1e-6);
}

#[test]
fn junction_between_reservoirs_balances_mass() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_reservoir("R2", 20.0);
    b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    b.add_pipe("P2", "J1", "R2", 200.0, 0.25, 120.0, 0.0);
    let mut wn = b.build().unwrap();

    let report = solve(&mut wn, HydraulicOptions::default());
    // inflow = demand + outflow
    let balance = report.flows["P1"] - 0.02 - report.flows["P2"];
    assert!(balance.abs() < 1e-8, "mass imbalance {balance}");
    // head at J1 sits between the two fixed heads
    let h = report.heads["J1"];
    assert!(h > 20.0 && h < 60.0, "unexpected junction head {h}");
}

#[test]
fn head_pump_lifts_to_the_curve() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 10.0);
    b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
    b.add_head_pump(
        "PU1",
        "R1",
        "J1",
        PumpCurve::SinglePoint {
            flow: 0.05,
            head: 25.0,
        },
    );
    b.add_pipe("P1", "J1", "R2", 300.0, 0.3, 130.0, 0.0);
    b.add_reservoir("R2", 20.0);
    let mut wn = b.build().unwrap();

    let report = solve(&mut wn, HydraulicOptions::default());
    let q = report.flows["PU1"];
    assert!(q > 0.0);
    assert!((q - 0.02 - report.flows["P1"]).abs() < 1e-8);

    // pump relation: head gain equals the fitted curve at the solved flow
    let (a, bq) = (4.0 * 25.0 / 3.0, 25.0 / (3.0 * 0.05 * 0.05));
    let gain = report.heads["J1"] - 10.0;
    let curve = a - bq * q * q;
    assert!((gain - curve).abs() < 1e-6, "gain {gain} vs curve {curve}");
}

#[test]
fn active_fcv_pins_flow_to_setting() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_reservoir("R2", 20.0);
    b.add_junction("J1", 10.0, 0.0, 0.0, 20.0);
    b.add_junction("J2", 10.0, 0.0, 0.0, 20.0);
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    b.add_fcv("V1", "J1", "J2", 0.2, 0.03, 0.1);
    b.add_pipe("P2", "J2", "R2", 200.0, 0.25, 120.0, 0.0);
    let mut wn = b.build().unwrap();

    let report = solve(&mut wn, HydraulicOptions::default());
    assert!((report.flows["V1"] - 0.03).abs() < 1e-8);
    assert!((report.flows["P1"] - 0.03).abs() < 1e-8);
    assert_eq!(wn.link("V1").unwrap().status, LinkStatus::Active);
    assert!(report.status_rounds >= 2); // Open on the first pass, then Active
}

#[test]
fn pdd_delivers_partial_demand_at_low_pressure() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 30.0);
    b.add_junction("J1", 15.0, 0.02, 0.0, 20.0);
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();

    let options = HydraulicOptions {
        demand_model: DemandModel::PressureDependent,
        ..HydraulicOptions::default()
    };
    let report = solve(&mut wn, options);

    // available pressure < required 20 m, so delivery is partial
    let d = report.demands["J1"];
    assert!(d > 0.0 && d < 0.02, "delivered demand {d}");
    let p = report.heads["J1"] - 15.0;
    assert!(p > 0.0 && p < 20.0);
    let expected = 0.02 * (p / 20.0).sqrt();
    assert!((d - expected).abs() < 1e-6, "{d} vs sqrt relation {expected}");
    assert_eq!(
        wn.node("J1").unwrap().as_junction().unwrap().demand_status,
        DemandStatus::Partial
    );
}

#[test]
fn leaky_junction_discharges_by_the_orifice_law() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
    b.set_leak("J1", 1e-4, 0.75).unwrap();
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();

    let report = solve(&mut wn, HydraulicOptions::default());
    let pressure = report.heads["J1"] - 10.0;
    assert!(pressure > 1.0);
    let leak = report.leak_rates["J1"];
    let orifice = 0.75 * 1e-4 * (2.0 * 9.81 * pressure).sqrt();
    assert!((leak - orifice).abs() < 1e-8, "leak {leak} vs orifice {orifice}");
    // inflow covers demand plus leak
    assert!((report.flows["P1"] - 0.02 - leak).abs() < 1e-8);
}

#[test]
fn closed_system_isolation_yields_trivial_solution() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
    b.add_junction("J2", 10.0, 0.02, 0.0, 20.0);
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    b.add_pipe("P2", "J1", "J2", 200.0, 0.25, 120.0, 0.0);
    let mut wn = b.build().unwrap();
    wn.link_mut("P2").unwrap().status = LinkStatus::Closed;

    let report = solve(&mut wn, HydraulicOptions::default());
    assert!(wn.node("J2").unwrap().is_isolated);
    assert!(report.flows["P2"].abs() < 1e-8);
    // the supplied side still solves normally
    assert!((report.flows["P1"] - 0.02).abs() < 1e-8);
}

#[test]
fn closing_a_parallel_pipe_between_steps_pins_its_flow() {
    // Two pipes in parallel: closing one leaves the network connected, so
    // no isolation flag moves and only the status edit can force the
    // rebuild.
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_reservoir("R2", 20.0);
    b.add_pipe("P1", "R1", "R2", 300.0, 0.3, 130.0, 0.0);
    b.add_pipe("P2", "R1", "R2", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();

    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut engine =
        HydraulicEngine::new(&mut wn, HydraulicOptions::default(), EngineConfig::default())
            .unwrap();
    let report = engine.solve_step(&mut wn).unwrap();
    assert!(report.flows["P2"] > 0.0);

    wn.link_mut("P2").unwrap().status = LinkStatus::Closed;
    let report = engine.solve_step(&mut wn).unwrap();
    assert!(!wn.node("R2").unwrap().is_isolated);
    assert!(
        report.flows["P2"].abs() < 1e-8,
        "closed pipe still carries {} m^3/s",
        report.flows["P2"]
    );
    // the surviving pipe alone carries the full drop
    let k = 10.666829500036352 * 130.0f64.powf(-1.852) * 0.3f64.powf(-4.871) * 300.0;
    let q = report.flows["P1"];
    assert!(((k * q.abs().powf(1.852) - 40.0) / 40.0).abs() < 1e-6);
}

#[test]
fn enabling_a_leak_between_steps_adds_the_discharge() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_junction("J1", 10.0, 0.02, 0.0, 20.0);
    b.set_leak("J1", 1e-4, 0.75).unwrap();
    b.add_pipe("P1", "R1", "J1", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();
    wn.node_mut("J1").unwrap().as_junction_mut().unwrap().leak_active = false;

    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut engine =
        HydraulicEngine::new(&mut wn, HydraulicOptions::default(), EngineConfig::default())
            .unwrap();
    let report = engine.solve_step(&mut wn).unwrap();
    assert!(report.leak_rates["J1"].abs() < 1e-12);
    assert!((report.flows["P1"] - 0.02).abs() < 1e-8);

    wn.node_mut("J1").unwrap().as_junction_mut().unwrap().leak_active = true;
    let report = engine.solve_step(&mut wn).unwrap();
    let pressure = report.heads["J1"] - 10.0;
    let orifice = 0.75 * 1e-4 * (2.0 * 9.81 * pressure).sqrt();
    let leak = report.leak_rates["J1"];
    assert!((leak - orifice).abs() < 1e-8, "leak {leak} vs orifice {orifice}");
    assert!((report.flows["P1"] - 0.02 - leak).abs() < 1e-8);
}

#[test]
fn iteration_budget_failure_is_recoverable() {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R1", 60.0);
    b.add_reservoir("R2", 20.0);
    b.add_pipe("P1", "R1", "R2", 300.0, 0.3, 130.0, 0.0);
    let mut wn = b.build().unwrap();

    let config = EngineConfig {
        newton: NewtonConfig {
            max_iterations: 1,
            ..NewtonConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut engine =
        HydraulicEngine::new(&mut wn, HydraulicOptions::default(), config).unwrap();
    let err = engine.solve_step(&mut wn).unwrap_err();
    assert!(err.is_recoverable());
}
