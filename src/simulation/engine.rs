//! High-level runtime engine settings
//!
//! Selects how the long-range pass is evaluated when running a sandbox

#[derive(Debug, Clone)]
pub struct Engine {
    pub barnes_hut: bool, // false = direct n^2 pairs, true = quadtree
    pub theta: f64, // opening angle for the quadtree traversal
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            barnes_hut: false,
            theta: 0.5,
        }
    }
}
