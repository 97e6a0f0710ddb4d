//! Box-blur diffusion with multiplicative decay.
//!
//! Each write cell is the unweighted mean of the `(2r+1)^2` wrapped
//! neighbourhood in the read buffer, times the decay factor. Reads and writes
//! never alias, so rows are processed in parallel in any order.

use crate::field::{toroidal_delta, wrap_index, Grid};
use physarum_common::Vec2;
use rayon::prelude::*;

/// Brush erase applied during diffusion: cells within `radius` of `center` are cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Erase {
    pub center: Vec2,
    pub radius: f32,
}

/// Diffuses `read` into `write`. `write` is fully overwritten.
pub fn diffuse(read: &Grid, write: &mut Grid, range: usize, decay: f32, erase: Option<Erase>) {
    let rez = read.rez();
    debug_assert_eq!(rez, write.rez());
    let r = range as i64;
    let count = ((2 * range + 1) * (2 * range + 1)) as f32;
    let src = read.as_slice();
    let erase = erase.filter(|e| e.radius > 0.0);

    write
        .as_mut_slice()
        .par_chunks_mut(rez)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                if let Some(e) = erase {
                    let cell_center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    if toroidal_delta(e.center, cell_center, rez).length() <= e.radius {
                        *out = 0.0;
                        continue;
                    }
                }

                let mut sum = 0.0f32;
                for dy in -r..=r {
                    let sy = wrap_index(y as i64 + dy, rez);
                    let src_row = &src[sy * rez..(sy + 1) * rez];
                    for dx in -r..=r {
                        sum += src_row[wrap_index(x as i64 + dx, rez)];
                    }
                }
                *out = sum / count * decay;
            }
        });
}
