use crate::agents::AgentStore;
use crate::counters::CellCounters;
use crate::deposition::deposit;
use crate::diffusion::{diffuse, Erase};
use crate::error::{EngineError, EngineState};
use crate::field::Field;
use crate::interaction::InteractionSource;
use crate::render::{FieldObserver, FieldView};
use crate::sensing::sense_and_move;
use log::{debug, info, trace};
use physarum_common::{SimParams, Vec2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The field cycle (diffusion, deposition, swap) runs on ticks where
/// `tick % FIELD_CYCLE_PERIOD == FIELD_CYCLE_PHASE`.
pub const FIELD_CYCLE_PERIOD: u64 = 2;
pub const FIELD_CYCLE_PHASE: u64 = 1;

/// Whether the 0-based tick `tick` runs the field cycle.
#[inline(always)]
pub fn runs_field_cycle(tick: u64) -> bool {
    tick % FIELD_CYCLE_PERIOD == FIELD_CYCLE_PHASE
}

/// What a single `step` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// 0-based index of the tick that just ran.
    pub tick: u64,
    /// Whether diffusion, deposition and the swap ran.
    pub field_cycle: bool,
    pub interaction: Option<Vec2>,
}

/// Everything a reset allocates. Dropped as a unit.
#[derive(Debug)]
struct SimState {
    field: Field,
    agents: AgentStore,
    /// Scratch counters shared by deposition and the debug channel.
    counters: CellCounters,
    /// Debug channel holds data from an earlier tick.
    debug_dirty: bool,
}

/// Owns the field and the agents and sequences the stages tick by tick.
#[derive(Debug)]
pub struct Engine {
    params: SimParams,
    state: EngineState,
    sim: Option<SimState>,
    /// Ticks completed since the last reset.
    tick_count: u64,
    last_interaction: Option<Vec2>,
}

impl Engine {
    /// Creates an uninitialized engine. Nothing is allocated until [`Engine::reset`].
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            state: EngineState::Uninitialized,
            sim: None,
            tick_count: 0,
            last_interaction: None,
        }
    }

    /// (Re)allocates field and agents from the current parameters.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        let params = self.params.clone();
        self.reset_with(params)
    }

    /// Replaces the parameters and (re)allocates field and agents.
    ///
    /// On error the engine keeps its previous parameters, state and data.
    pub fn reset_with(&mut self, params: SimParams) -> Result<(), EngineError> {
        if self.state == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        params.validate()?;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut field = Field::try_new(params.rez)?;
        field.reset(params.field_init, &mut rng);
        let agents = AgentStore::reset(params.agent_count, params.placement, params.rez, &mut rng)?;
        let counters = CellCounters::try_new(params.num_cells())?;

        info!(
            "Reset: {}x{} field, {} agents, seed {}.",
            params.rez, params.rez, params.agent_count, params.seed
        );
        debug!("Simulation parameters: {:#?}", params);

        // Only replace state once every allocation has succeeded.
        self.sim = Some(SimState { field, agents, counters, debug_dirty: false });
        self.params = params;
        self.tick_count = 0;
        self.last_interaction = None;
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Swaps in new parameters between ticks. `rez` and `agent_count` require a reset.
    pub fn update_params(&mut self, params: SimParams) -> Result<(), EngineError> {
        if self.state == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        if self.state == EngineState::Uninitialized {
            params.validate()?;
        } else {
            self.params.validate_update(&params)?;
        }
        self.params = params;
        Ok(())
    }

    /// Advances the simulation by one tick.
    pub fn step<I: InteractionSource + ?Sized>(
        &mut self,
        input: &mut I,
    ) -> Result<TickReport, EngineError> {
        match self.state {
            EngineState::Ready => {}
            EngineState::Stepping => return Err(EngineError::Poisoned),
            EngineState::ShutDown => return Err(EngineError::ShutDown),
            state @ EngineState::Uninitialized => return Err(EngineError::NotReady { state }),
        }
        let sim = self.sim.as_mut().ok_or(EngineError::NotReady { state: self.state })?;

        // A panic inside a stage leaves the engine in `Stepping`.
        self.state = EngineState::Stepping;

        let tick = self.tick_count;
        let params = &self.params;
        let interaction = input.poll(tick);

        // --- 1. Sensing & motion (every tick) ---
        let debug_counters = if params.debug_sensors {
            sim.counters.clear();
            Some(&sim.counters)
        } else {
            None
        };
        sense_and_move(
            sim.agents.as_mut_slice(),
            sim.field.read(),
            params,
            interaction,
            debug_counters,
        );
        if params.debug_sensors {
            sim.counters.store_into(sim.field.debug_mut());
            sim.debug_dirty = true;
        } else if sim.debug_dirty {
            sim.field.debug_mut().fill(0.0);
            sim.debug_dirty = false;
        }

        // --- 2. Field cycle (throttled): diffusion, deposition, swap ---
        let field_cycle = runs_field_cycle(tick);
        if field_cycle {
            let erase = interaction.map(|center| Erase { center, radius: params.brush_size });
            {
                let (read, write) = sim.field.split();
                diffuse(read, write, params.diffusion_range, params.trail_decay_factor, erase);
            }
            deposit(
                sim.agents.as_slice(),
                sim.field.write_mut(),
                &sim.counters,
                params.deposit_amount,
            );
            sim.field.swap();

            if log::log_enabled!(log::Level::Trace) {
                let stats = sim.field.read().stats();
                trace!(
                    "Tick {}: field cycle published (mass {:.4}, max {:.4}).",
                    tick,
                    stats.total_mass,
                    stats.max_value
                );
            }
        } else {
            trace!("Tick {}: agents only.", tick);
        }

        self.tick_count += 1;
        self.last_interaction = interaction;
        self.state = EngineState::Ready;
        Ok(TickReport { tick, field_cycle, interaction })
    }

    /// Hands the latest published field to a render collaborator.
    pub fn render<O: FieldObserver + ?Sized>(&self, observer: &mut O) -> anyhow::Result<()> {
        let view = self.view()?;
        observer.observe(&view)
    }

    /// Read-only view of the published state.
    pub fn view(&self) -> Result<FieldView<'_>, EngineError> {
        match self.state {
            EngineState::Ready => {}
            EngineState::ShutDown => return Err(EngineError::ShutDown),
            EngineState::Stepping => return Err(EngineError::Poisoned),
            state => return Err(EngineError::NotReady { state }),
        }
        let sim = self.sim.as_ref().ok_or(EngineError::NotReady { state: self.state })?;
        Ok(FieldView {
            tick: self.tick_count,
            params: &self.params,
            field: sim.field.read(),
            debug: sim.field.debug(),
            agents: &sim.agents,
            interaction: self.last_interaction,
        })
    }

    /// Releases field and agents. No further calls are accepted.
    pub fn shutdown(&mut self) {
        if self.state != EngineState::ShutDown {
            info!("Shutting down after {} ticks.", self.tick_count);
        }
        self.sim = None;
        self.state = EngineState::ShutDown;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Ticks completed since the last reset.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn field(&self) -> Option<&Field> {
        self.sim.as_ref().map(|s| &s.field)
    }

    pub fn agents(&self) -> Option<&AgentStore> {
        self.sim.as_ref().map(|s| &s.agents)
    }

    /// Mutable access for scripted setups (placing agents, seeding trail) between ticks.
    pub fn scenario_mut(&mut self) -> Option<(&mut Field, &mut AgentStore)> {
        if self.state != EngineState::Ready {
            return None;
        }
        self.sim.as_mut().map(|s| (&mut s.field, &mut s.agents))
    }
}
