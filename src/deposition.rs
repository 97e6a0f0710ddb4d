use crate::agents::Agent;
use crate::counters::CellCounters;
use crate::field::{cell_of, Grid};
use rayon::prelude::*;

/// Scatters `amount` into `write` at every agent's cell.
///
/// Agents sharing a cell accumulate. Counting happens first (parallel, integer
/// atomics) and the float accumulation second (parallel over cells), so the
/// result is bit-identical no matter how agents are scheduled.
pub fn deposit(agents: &[Agent], write: &mut Grid, counters: &CellCounters, amount: f32) {
    let rez = write.rez();
    counters.clear();
    agents.par_iter().for_each(|agent| {
        let (x, y) = cell_of(agent.position, rez);
        counters.hit(y * rez + x);
    });
    counters.accumulate_into(write, amount);
}
