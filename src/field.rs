//! Double-buffered trail field and the toroidal accessors shared by every stage.
//!
//! Cells are stored row-major (`y * rez + x`). All coordinate handling goes
//! through [`cell_of`], so sensing, deposition and the brush agree on which
//! cell a position belongs to.

use crate::error::{try_alloc, EngineError};
use physarum_common::{FieldInit, FieldStats, Vec2};
use rand::Rng;

/// Wraps an integer cell coordinate onto `[0, rez)`.
#[inline(always)]
pub fn wrap_index(i: i64, rez: usize) -> usize {
    i.rem_euclid(rez as i64) as usize
}

/// Cell containing `position` after toroidal wrap (floor, no blending).
#[inline(always)]
pub fn cell_of(position: Vec2, rez: usize) -> (usize, usize) {
    (
        wrap_index(position.x.floor() as i64, rez),
        wrap_index(position.y.floor() as i64, rez),
    )
}

/// Wraps a continuous coordinate onto `[0, rez)`.
#[inline(always)]
pub fn wrap_coord(value: f32, rez: f32) -> f32 {
    let wrapped = value.rem_euclid(rez);
    // rem_euclid can round up to exactly `rez` for tiny negative inputs
    if wrapped.is_finite() && wrapped < rez {
        wrapped
    } else {
        0.0
    }
}

#[inline(always)]
pub fn wrap_position(position: Vec2, rez: usize) -> Vec2 {
    let rez = rez as f32;
    Vec2::new(wrap_coord(position.x, rez), wrap_coord(position.y, rez))
}

/// Shortest displacement from `from` to `to` on the torus.
#[inline(always)]
pub fn toroidal_delta(from: Vec2, to: Vec2, rez: usize) -> Vec2 {
    let rez = rez as f32;
    let shortest = |d: f32| d - rez * (d / rez).round();
    Vec2::new(shortest(to.x - from.x), shortest(to.y - from.y))
}

/// A square grid of scalar trail values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rez: usize,
    cells: Vec<f32>,
}

impl Grid {
    /// Allocates a zeroed `rez x rez` grid.
    pub fn try_new(rez: usize, what: &'static str) -> Result<Self, EngineError> {
        let elements = rez
            .checked_mul(rez)
            .ok_or(EngineError::ResourceExhaustion { what, elements: usize::MAX })?;
        Ok(Self { rez, cells: try_alloc(what, elements)? })
    }

    #[inline(always)]
    pub fn rez(&self) -> usize {
        self.rez
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.rez + x
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.cells[idx] = value;
    }

    /// Nearest-cell sample at a possibly fractional, possibly out-of-range position.
    #[inline(always)]
    pub fn sample(&self, position: Vec2) -> f32 {
        let (x, y) = cell_of(position, self.rez);
        self.get(x, y)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    pub fn fill(&mut self, value: f32) {
        self.cells.fill(value);
    }

    /// Sum of all cells, accumulated serially in f64 so it is reproducible.
    pub fn total_mass(&self) -> f64 {
        self.cells.iter().map(|&v| v as f64).sum()
    }

    pub fn stats(&self) -> FieldStats {
        let total_mass = self.total_mass();
        let max_value = self.cells.iter().copied().fold(0.0f32, f32::max);
        let mean_value = if self.cells.is_empty() {
            0.0
        } else {
            (total_mass / self.cells.len() as f64) as f32
        };
        FieldStats { total_mass, max_value, mean_value }
    }
}

/// The read/write grid pair plus the single-buffered debug channel.
///
/// `read` always holds the last published state. `write` is only touched by
/// the field cycle and becomes visible through [`Field::swap`].
#[derive(Debug, Clone)]
pub struct Field {
    read: Grid,
    write: Grid,
    debug: Grid,
}

impl Field {
    pub fn try_new(rez: usize) -> Result<Self, EngineError> {
        Ok(Self {
            read: Grid::try_new(rez, "field read buffer")?,
            write: Grid::try_new(rez, "field write buffer")?,
            debug: Grid::try_new(rez, "field debug channel")?,
        })
    }

    /// Fills both buffers with the same initial distribution and clears the debug channel.
    pub fn reset<R: Rng>(&mut self, init: FieldInit, rng: &mut R) {
        match init {
            FieldInit::Zero => self.read.fill(0.0),
            FieldInit::Noise { amplitude } => {
                for cell in self.read.as_mut_slice() {
                    *cell = rng.random::<f32>() * amplitude;
                }
            }
        }
        self.write.as_mut_slice().copy_from_slice(self.read.as_slice());
        self.debug.fill(0.0);
    }

    #[inline(always)]
    pub fn rez(&self) -> usize {
        self.read.rez()
    }

    /// Samples the published (read) buffer.
    #[inline(always)]
    pub fn sample(&self, position: Vec2) -> f32 {
        self.read.sample(position)
    }

    /// Exchanges the buffer roles without copying.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn read(&self) -> &Grid {
        &self.read
    }

    pub fn debug(&self) -> &Grid {
        &self.debug
    }

    /// Mutable access to the published buffer, for seeding scripted scenarios.
    pub fn read_mut(&mut self) -> &mut Grid {
        &mut self.read
    }

    pub(crate) fn write_mut(&mut self) -> &mut Grid {
        &mut self.write
    }

    pub(crate) fn debug_mut(&mut self) -> &mut Grid {
        &mut self.debug
    }

    /// Borrows the read buffer immutably and the write buffer mutably at once.
    pub(crate) fn split(&mut self) -> (&Grid, &mut Grid) {
        (&self.read, &mut self.write)
    }

    #[cfg(test)]
    pub(crate) fn write(&self) -> &Grid {
        &self.write
    }
}
