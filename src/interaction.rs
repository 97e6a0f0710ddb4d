use physarum_common::{StrokeConfig, Vec2};

/// Supplies the brush position once per tick.
///
/// Implementations hand over an already-resolved grid coordinate; the engine
/// does no hit-testing or projection of its own.
pub trait InteractionSource {
    /// Brush center for tick `tick`, or `None` when nothing is pressed.
    fn poll(&mut self, tick: u64) -> Option<Vec2>;
}

/// Never disturbs the simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInteraction;

impl InteractionSource for NoInteraction {
    fn poll(&mut self, _tick: u64) -> Option<Vec2> {
        None
    }
}

/// A fixed brush position, active on every tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedInteraction(pub Vec2);

impl InteractionSource for FixedInteraction {
    fn poll(&mut self, _tick: u64) -> Option<Vec2> {
        Some(self.0)
    }
}

/// Replays brush strokes over tick ranges. The first stroke covering a tick wins.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInteraction {
    strokes: Vec<StrokeConfig>,
}

impl ScriptedInteraction {
    pub fn new(strokes: Vec<StrokeConfig>) -> Self {
        if strokes.is_empty() {
            log::debug!("Interaction script is empty; the brush stays idle.");
        }
        Self { strokes }
    }
}

impl InteractionSource for ScriptedInteraction {
    fn poll(&mut self, tick: u64) -> Option<Vec2> {
        self.strokes
            .iter()
            .find(|s| (s.start_tick..s.end_tick).contains(&tick))
            .map(|s| Vec2::new(s.x, s.y))
    }
}
