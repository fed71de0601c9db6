use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::tc::{AlignCmd, CargoCmd, Tc};
use robot_lib::{
    data_store::DataStore,
    params::{RobotExecParams, RobotParams},
    sim::{self, SimPlant},
};
use util::params::from_str;

fn robot_params() -> RobotParams {
    RobotParams {
        exec: from_str::<RobotExecParams>(include_str!("../../params/robot_exec.toml")).unwrap(),
        arm_ctrl: from_str(include_str!("../../params/arm_ctrl.toml")).unwrap(),
        intake: from_str(include_str!("../../params/intake.toml")).unwrap(),
        hatch: from_str(include_str!("../../params/hatch.toml")).unwrap(),
        auto: from_str(include_str!("../../params/auto.toml")).unwrap(),
    }
}

fn cycle_benchmark(c: &mut Criterion) {
    let params = robot_params();
    let period_s = params.exec.cycle_period_s;
    let sim_params: sim::Params = from_str(include_str!("../../params/sim.toml")).unwrap();

    let mut plant = SimPlant::new(sim_params, params.exec.dio);
    let mut ds = DataStore::new(params).unwrap();

    plant.set_enabled(true);
    let start_tcs = [
        Tc::Cargo(CargoCmd::IntakeFloor { force: false }),
        Tc::Align(AlignCmd::HatchDeposit { force: false }),
    ];
    {
        let mut hw = plant.hardware();
        ds.run_cycle(&mut hw, &start_tcs);
    }

    c.bench_function("control cycle", |b| {
        b.iter(|| {
            {
                let mut hw = plant.hardware();
                ds.run_cycle(&mut hw, &[]);
            }
            plant.step(period_s);
        })
    });
}

criterion_group!(benches, cycle_benchmark);
criterion_main!(benches);
