//! Uniform hash grid for collision broad-phase
//!
//! Rebuilt from scratch every tick. The cell edge tracks the largest body
//! radius so one 3x3 probe around a body's cell always covers every
//! possible contact partner.

use std::collections::HashMap;

use crate::simulation::arena::BodyArena;

const MIN_CELL: f64 = 50.0;

#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell: f64,
    map: HashMap<(i32, i32), Vec<u32>>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self {
            cell: MIN_CELL,
            map: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    /// Re-bucket all live bodies. Buckets keep slot order, so iteration
    /// over them is deterministic run to run.
    pub fn build(&mut self, bodies: &BodyArena) {
        self.map.clear();
        let max_radius = bodies
            .iter()
            .map(|(_, b)| b.radius)
            .fold(0.0_f64, f64::max);
        self.cell = (2.1 * max_radius).max(MIN_CELL);
        for (id, body) in bodies.iter() {
            let key = self.key_of(body.x.x, body.x.y);
            self.map.entry(key).or_default().push(id.index);
        }
    }

    fn key_of(&self, x: f64, y: f64) -> (i32, i32) {
        ((x / self.cell).floor() as i32, (y / self.cell).floor() as i32)
    }

    /// Candidate contact pairs, each unordered pair exactly once with the
    /// smaller slot index first.
    pub fn pairs(&self, bodies: &BodyArena, out: &mut Vec<(u32, u32)>) {
        out.clear();
        for (id, body) in bodies.iter() {
            let i = id.index;
            let (cx, cy) = self.key_of(body.x.x, body.x.y);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(bucket) = self.map.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    for &j in bucket {
                        if j > i {
                            out.push((i, j));
                        }
                    }
                }
            }
        }
    }
}
