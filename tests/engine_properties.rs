use std::panic::{catch_unwind, AssertUnwindSafe};

use physarum_engine::common::{FieldInit, Placement, SimParams, StrokeConfig, Vec2};
use physarum_engine::{
    Engine, EngineError, EngineState, FieldObserver, FieldView, FixedInteraction, Grid,
    InteractionSource, NoInteraction, ScriptedInteraction,
};
use proptest::prelude::*;

fn lively_params() -> SimParams {
    SimParams {
        rez: 64,
        agent_count: 500,
        seed: 1234,
        placement: Placement::Disc { radius: 0.3 },
        field_init: FieldInit::Noise { amplitude: 0.1 },
        trail_decay_factor: 0.9,
        diffusion_range: 1,
        deposit_amount: 1.0,
        sensor_count: 3,
        sensor_range: 4.0,
        sensor_angle_deg: 45.0,
        debug_sensors: true,
        mass: 1.0,
        drag: 0.1,
        speed: 1.0,
        sensor_force: 0.5,
        brush_size: 5.0,
    }
}

fn script() -> ScriptedInteraction {
    ScriptedInteraction::new(vec![
        StrokeConfig { start_tick: 5, end_tick: 12, x: 32.0, y: 32.0 },
        StrokeConfig { start_tick: 20, end_tick: 25, x: 2.0, y: 62.0 },
    ])
}

fn ready_engine(params: SimParams) -> Engine {
    let mut engine = Engine::new(params);
    engine.reset().expect("reset should succeed");
    engine
}

fn read_buffer(engine: &Engine) -> Vec<f32> {
    engine.field().unwrap().read().as_slice().to_vec()
}

fn read_mass(engine: &Engine) -> f64 {
    engine.field().unwrap().read().total_mass()
}

#[test]
fn identical_seeds_and_inputs_give_identical_runs() {
    let mut a = ready_engine(lively_params());
    let mut b = ready_engine(lively_params());
    let (mut input_a, mut input_b) = (script(), script());
    for _ in 0..30 {
        a.step(&mut input_a).unwrap();
        b.step(&mut input_b).unwrap();
    }
    assert_eq!(read_buffer(&a), read_buffer(&b));
    assert_eq!(
        a.field().unwrap().debug().as_slice(),
        b.field().unwrap().debug().as_slice()
    );
    assert_eq!(a.agents().unwrap().as_slice(), b.agents().unwrap().as_slice());
}

#[test]
fn mass_is_conserved_without_decay_or_diffusion() {
    let params = SimParams {
        trail_decay_factor: 1.0,
        diffusion_range: 0,
        field_init: FieldInit::Zero,
        deposit_amount: 1.0,
        debug_sensors: false,
        ..lively_params()
    };
    let deposited_per_cycle = params.agent_count as f64 * params.deposit_amount as f64;
    let mut engine = ready_engine(params);
    let mut input = NoInteraction;

    let mut expected = 0.0;
    for _ in 0..12 {
        let report = engine.step(&mut input).unwrap();
        if report.field_cycle {
            expected += deposited_per_cycle;
        }
        assert_eq!(read_mass(&engine), expected, "after tick {}", report.tick);
    }
    assert_eq!(expected, 6.0 * deposited_per_cycle);
}

#[test]
fn mass_decays_by_the_decay_factor_without_deposition() {
    let decay = 0.7f32;
    let params = SimParams {
        trail_decay_factor: decay,
        diffusion_range: 2,
        deposit_amount: 0.0,
        field_init: FieldInit::Noise { amplitude: 1.0 },
        ..lively_params()
    };
    let mut engine = ready_engine(params);
    let mut previous = read_mass(&engine);
    assert!(previous > 0.0);

    for _ in 0..10 {
        let report = engine.step(&mut NoInteraction).unwrap();
        let current = read_mass(&engine);
        if report.field_cycle {
            let bound = previous * decay as f64;
            assert!(current <= bound * (1.0 + 1e-5), "{current} exceeds {bound}");
            // The torus has no edges to lose mass through.
            assert!(current >= bound * (1.0 - 1e-5), "{current} lost more than decay");
        } else {
            assert_eq!(current, previous);
        }
        previous = current;
    }
}

proptest! {
    #[test]
    fn sampling_is_periodic_in_both_axes(
        xi in 0i32..8,
        yi in 0i32..8,
        fx in 0u8..4,
        fy in 0u8..4,
        kx in -3i32..=3,
        ky in -3i32..=3,
    ) {
        let mut grid = Grid::try_new(8, "test").unwrap();
        for (i, cell) in grid.as_mut_slice().iter_mut().enumerate() {
            *cell = i as f32;
        }
        let p = Vec2::new(xi as f32 + fx as f32 * 0.25, yi as f32 + fy as f32 * 0.25);
        let shifted = Vec2::new(p.x + (kx * 8) as f32, p.y + (ky * 8) as f32);
        prop_assert_eq!(grid.sample(p), grid.sample(shifted));
        prop_assert_eq!(grid.sample(p), grid.sample(Vec2::new(shifted.x, p.y)));
        prop_assert_eq!(grid.sample(p), grid.sample(Vec2::new(p.x, shifted.y)));
    }
}

#[test]
fn field_cycle_runs_on_odd_ticks_only() {
    let mut engine = ready_engine(lively_params());
    let mut input = script();
    let mut cycles = Vec::new();
    for _ in 0..10 {
        let before = read_buffer(&engine);
        let report = engine.step(&mut input).unwrap();
        if report.field_cycle {
            cycles.push(report.tick);
        } else {
            assert_eq!(read_buffer(&engine), before, "tick {} changed the field", report.tick);
        }
    }
    assert_eq!(cycles, vec![1, 3, 5, 7, 9]);
}

fn single_agent_params(deposit_amount: f32) -> SimParams {
    SimParams {
        rez: 8,
        agent_count: 1,
        field_init: FieldInit::Zero,
        trail_decay_factor: 0.5,
        diffusion_range: 0,
        deposit_amount,
        sensor_force: 0.0,
        drag: 0.0,
        speed: 0.25,
        ..SimParams::default()
    }
}

fn place_single_agent(engine: &mut Engine) {
    let rez = engine.params().rez;
    let (_, agents) = engine.scenario_mut().unwrap();
    assert!(agents.place(0, Vec2::new(4.0, 4.0), Vec2::new(1.0, 0.0), rez));
}

#[test]
fn single_agent_scenario() {
    let mut engine = ready_engine(single_agent_params(1.0));
    place_single_agent(&mut engine);

    // Tick 0: motion only
    engine.step(&mut NoInteraction).unwrap();
    let agent = *engine.agents().unwrap().get(0).unwrap();
    assert_eq!(agent.position, Vec2::new(4.25, 4.0));
    assert_eq!(agent.heading, Vec2::new(1.0, 0.0));
    assert_eq!(read_mass(&engine), 0.0);

    // Tick 1: moves to 4.5, still inside cell (4, 4), then deposits there
    let report = engine.step(&mut NoInteraction).unwrap();
    assert!(report.field_cycle);
    let read = engine.field().unwrap().read();
    assert_eq!(read.get(4, 4), 1.0);
    assert_eq!(read.total_mass(), 1.0);

    // Ticks 2 and 3: the old deposit decays by half, the new one lands in cell (5, 4)
    engine.step(&mut NoInteraction).unwrap();
    engine.step(&mut NoInteraction).unwrap();
    assert_eq!(engine.agents().unwrap().get(0).unwrap().position, Vec2::new(5.0, 4.0));
    let read = engine.field().unwrap().read();
    assert_eq!(read.get(4, 4), 0.5);
    assert_eq!(read.get(5, 4), 1.0);
    assert_eq!(read.total_mass(), 1.5);
}

#[test]
fn diffusing_an_empty_field_keeps_it_empty() {
    let mut engine = ready_engine(single_agent_params(0.0));
    place_single_agent(&mut engine);
    for _ in 0..4 {
        engine.step(&mut NoInteraction).unwrap();
        assert!(read_buffer(&engine).iter().all(|&v| v == 0.0));
    }
}

#[test]
fn agent_turns_toward_seeded_trail() {
    let params = SimParams { sensor_force: 1.0, sensor_range: 1.0, ..single_agent_params(1.0) };
    let mut engine = ready_engine(params);
    place_single_agent(&mut engine);
    {
        let (field, _) = engine.scenario_mut().unwrap();
        // Right-hand sensor tip lands at (4.71, 3.29).
        field.read_mut().set(4, 3, 1.0);
    }
    engine.step(&mut NoInteraction).unwrap();
    let agent = *engine.agents().unwrap().get(0).unwrap();
    assert!(agent.heading.y < 0.0, "heading {:?}", agent.heading);
    assert!(agent.position.y < 4.0);
    assert!(agent.position.x > 4.0);
}

#[test]
fn reset_supersedes_previous_run() {
    let mut fresh = ready_engine(lively_params());
    fresh.reset().unwrap();

    let mut used = ready_engine(lively_params());
    let mut input = FixedInteraction(Vec2::new(10.0, 10.0));
    for _ in 0..9 {
        used.step(&mut input).unwrap();
    }
    used.reset().unwrap();

    assert_eq!(used.tick_count(), 0);
    assert_eq!(used.state(), EngineState::Ready);
    assert_eq!(read_buffer(&used), read_buffer(&fresh));
    assert!(used.field().unwrap().debug().as_slice().iter().all(|&v| v == 0.0));
    assert_eq!(used.agents().unwrap().as_slice(), fresh.agents().unwrap().as_slice());
    assert_eq!(used.view().unwrap().interaction, None);
}

#[test]
fn brush_erases_trail_under_it() {
    let params = SimParams {
        rez: 32,
        agent_count: 8,
        field_init: FieldInit::Noise { amplitude: 1.0 },
        trail_decay_factor: 1.0,
        diffusion_range: 0,
        deposit_amount: 0.0,
        brush_size: 3.0,
        ..SimParams::default()
    };
    let mut engine = ready_engine(params);
    let mut input = FixedInteraction(Vec2::new(16.0, 16.0));
    engine.step(&mut input).unwrap();
    engine.step(&mut input).unwrap();
    let read = engine.field().unwrap().read();
    for (x, y) in [(16, 16), (15, 15), (17, 16), (16, 13)] {
        assert_eq!(read.get(x, y), 0.0, "cell ({x}, {y}) under the brush");
    }
    assert!(read.get(2, 2) > 0.0);
}

struct LastFrame {
    frames: usize,
    tick: u64,
    field: Vec<f32>,
}

impl FieldObserver for LastFrame {
    fn observe(&mut self, view: &FieldView<'_>) -> anyhow::Result<()> {
        self.frames += 1;
        self.tick = view.tick;
        self.field = view.field.as_slice().to_vec();
        Ok(())
    }
}

#[test]
fn renderer_sees_the_published_buffer() {
    let mut engine = ready_engine(lively_params());
    let mut observer = LastFrame { frames: 0, tick: 0, field: Vec::new() };
    for _ in 0..4 {
        engine.step(&mut NoInteraction).unwrap();
        engine.render(&mut observer).unwrap();
    }
    assert_eq!(observer.frames, 4);
    assert_eq!(observer.tick, 4);
    assert_eq!(observer.field, read_buffer(&engine));
}

struct PanickingInput;

impl InteractionSource for PanickingInput {
    fn poll(&mut self, _tick: u64) -> Option<Vec2> {
        panic!("input device lost");
    }
}

#[test]
fn interrupted_tick_poisons_until_reset() {
    let mut engine = ready_engine(lively_params());
    let outcome = catch_unwind(AssertUnwindSafe(|| engine.step(&mut PanickingInput)));
    assert!(outcome.is_err());
    assert_eq!(engine.state(), EngineState::Stepping);
    assert_eq!(engine.step(&mut NoInteraction), Err(EngineError::Poisoned));
    assert!(engine.view().is_err());

    engine.reset().unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
    engine.step(&mut NoInteraction).unwrap();
}

#[test]
fn configuration_errors_leave_engine_uninitialized() {
    for bad in [
        SimParams { agent_count: 0, ..SimParams::default() },
        SimParams { rez: 100, ..SimParams::default() },
        SimParams { mass: -1.0, ..SimParams::default() },
    ] {
        let mut engine = Engine::new(bad.clone());
        let err = engine.reset().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)), "{bad:?} gave {err}");
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.field().is_none());
    }
}
