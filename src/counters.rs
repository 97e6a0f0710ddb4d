use crate::error::EngineError;
use crate::field::Grid;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Per-cell hit counters filled concurrently by agents.
///
/// Integer `fetch_add` commutes, so the final counts do not depend on which
/// thread processed which agent. Converting them into field values afterwards
/// keeps scattered writes deterministic.
#[derive(Debug, Default)]
pub struct CellCounters {
    counts: Vec<AtomicU32>,
}

impl CellCounters {
    pub fn try_new(cells: usize) -> Result<Self, EngineError> {
        let mut counts = Vec::new();
        counts
            .try_reserve_exact(cells)
            .map_err(|_| EngineError::ResourceExhaustion {
                what: "cell counters",
                elements: cells,
            })?;
        counts.extend((0..cells).map(|_| AtomicU32::new(0)));
        Ok(Self { counts })
    }

    pub fn clear(&self) {
        self.counts.par_iter().for_each(|c| c.store(0, Ordering::Relaxed));
    }

    #[inline(always)]
    pub fn hit(&self, cell: usize) {
        self.counts[cell].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, cell: usize) -> u32 {
        self.counts[cell].load(Ordering::Relaxed)
    }

    /// `grid[c] += count[c] * amount` for every cell.
    pub fn accumulate_into(&self, grid: &mut Grid, amount: f32) {
        grid.as_mut_slice()
            .par_iter_mut()
            .zip(self.counts.par_iter())
            .for_each(|(cell, count)| {
                let n = count.load(Ordering::Relaxed);
                if n > 0 {
                    *cell += n as f32 * amount;
                }
            });
    }

    /// `grid[c] = count[c]` for every cell.
    pub fn store_into(&self, grid: &mut Grid) {
        grid.as_mut_slice()
            .par_iter_mut()
            .zip(self.counts.par_iter())
            .for_each(|(cell, count)| *cell = count.load(Ordering::Relaxed) as f32);
    }
}
