use crate::error::EngineError;
use crate::field::wrap_position;
use physarum_common::{angle_to_vec, ParamError, Placement, Vec2};
use rand::distr::Uniform;
use rand::Rng;
use rand_distr::Normal;
use std::f32::consts::TAU;

/// A point agent moving over the trail field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Agent {
    /// Position in grid space, always wrapped onto `[0, rez)`.
    pub position: Vec2,
    pub velocity: Vec2,
    /// Unit direction of travel. Kept when the velocity is too small to define one.
    pub heading: Vec2,
}

impl Agent {
    /// A freshly placed agent; its velocity starts equal to the unit heading.
    pub fn new(position: Vec2, heading: Vec2) -> Self {
        let heading = heading.normalize_or(Vec2::X);
        Self { position, velocity: heading, heading }
    }
}

/// Fixed-size population of agents. Resizing requires a full reset.
#[derive(Debug, Clone, Default)]
pub struct AgentStore {
    agents: Vec<Agent>,
}

impl AgentStore {
    /// Allocates `count` agents drawn from `placement` with uniformly random headings.
    pub fn reset<R: Rng>(
        count: usize,
        placement: Placement,
        rez: usize,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let mut agents = Vec::new();
        agents
            .try_reserve_exact(count)
            .map_err(|_| EngineError::ResourceExhaustion {
                what: "agent store",
                elements: count,
            })?;

        let angle_dist =
            Uniform::new(0.0f32, TAU).map_err(|_| ParamError::InvalidPlacement(placement))?;
        let center = Vec2::new(rez as f32 * 0.5, rez as f32 * 0.5);

        // Positions first, then headings
        let positions: Vec<Vec2> = match placement {
            Placement::Uniform => {
                let coord =
                    Uniform::new(0.0f32, rez as f32).map_err(|_| ParamError::ZeroResolution)?;
                (0..count)
                    .map(|_| Vec2::new(rng.sample(&coord), rng.sample(&coord)))
                    .collect()
            }
            Placement::Disc { radius } => {
                let max_r = radius * rez as f32;
                (0..count)
                    .map(|_| {
                        // sqrt keeps the density uniform over the disc area
                        let r = max_r * rng.random::<f32>().sqrt();
                        let theta = rng.sample(&angle_dist);
                        center + angle_to_vec(theta) * r
                    })
                    .collect()
            }
            Placement::Gaussian { sigma } => {
                let spread = Normal::new(0.0f32, sigma * rez as f32)
                    .map_err(|_| ParamError::InvalidPlacement(placement))?;
                (0..count)
                    .map(|_| center + Vec2::new(rng.sample(&spread), rng.sample(&spread)))
                    .collect()
            }
        };

        for position in positions {
            let heading = angle_to_vec(rng.sample(&angle_dist));
            agents.push(Agent::new(wrap_position(position, rez), heading));
        }

        log::debug!("Placed {} agents using {:?} placement.", agents.len(), placement);
        Ok(Self { agents })
    }

    /// Builds a store from explicit agents, for scripted setups.
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Overwrites one agent's position and heading, resetting its velocity to the heading.
    /// Returns `false` if `index` is out of range.
    pub fn place(&mut self, index: usize, position: Vec2, heading: Vec2, rez: usize) -> bool {
        match self.agents.get_mut(index) {
            Some(agent) => {
                *agent = Agent::new(wrap_position(position, rez), heading);
                true
            }
            None => false,
        }
    }

    /// Positions as plain tuples, for exports.
    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.agents.iter().map(|a| (a.position.x, a.position.y)).collect()
    }
}
