//! # Barnes-Hut quadtree
//!
//! Approximates the long-range pair forces (gravity, electric, magnetic)
//! in `O(N log N)` instead of the naive all-pairs `O(N^2)`.
//!
//! The space covered by the bodies is recursively split into 4 quadrants.
//! Leaves hold one body each; the subdivision stops at a fixed depth cap,
//! after which coincident bodies simply share a leaf. Every node stores
//! monopole aggregates of its subtree:
//!
//! - gravitational mass (immovable bodies count with substituted mass 1)
//! - net electric charge
//! - net magnetic moment
//! - mass-weighted center
//!
//! A subtree whose angular size `s / d` falls under the opening threshold
//! `theta` is evaluated as a single pseudo-body at its center; otherwise the
//! traversal descends. Net-zero charge or moment in an aggregate therefore
//! cancels, which is the accepted monopole error of the method.

use crate::simulation::arena::BodyArena;
use crate::simulation::params::Parameters;
use crate::simulation::states::NVec2;

/// Subdivision stops here; deeper coincident bodies share a leaf.
pub const MAX_DEPTH: usize = 64;

/// One square region of space.
pub struct QuadNode {
    pub mass: f64, // total gravitational mass of the subtree
    pub charge: f64, // net electric charge
    pub moment: f64, // net magnetic moment
    pub com: NVec2, // mass-weighted center
    pub bbox_min: NVec2,
    pub bbox_max: NVec2,
    pub children: [Option<usize>; 4], // indices into QuadTree::nodes
    pub bodies: Vec<u32>, // occupant slot indices; > 1 only at the depth cap
}

/// Receiver-side view of one body during traversal. The force toggles are
/// the global switches already combined with the body's null-zone mask.
pub struct TargetProbe {
    pub index: u32,
    pub x: NVec2,
    pub m: f64,
    pub inv_m: f64,
    pub radius: f64,
    pub charge: f64,
    pub moment: f64,
    pub integrity: f64,
    pub grav: bool,
    pub elec: bool,
    pub mag: bool,
}

pub struct QuadTree {
    pub nodes: Vec<QuadNode>,
    pub root: usize,
}

impl QuadTree {
    /// Build the tree over all live bodies: square root box, per-body
    /// insertion, then a bottom-up aggregate pass.
    pub fn build(bodies: &BodyArena) -> Self {
        let (bbox_min, bbox_max) = compute_global_bbox(bodies);

        let mut tree = QuadTree {
            nodes: vec![QuadNode {
                mass: 0.0,
                charge: 0.0,
                moment: 0.0,
                com: NVec2::zeros(),
                bbox_min,
                bbox_max,
                children: [None; 4],
                bodies: Vec::new(),
            }],
            root: 0,
        };

        for (id, _) in bodies.iter() {
            tree.insert_body(tree.root, id.index, 0, bodies);
        }
        tree.compute_aggregates(bodies, tree.root);
        tree
    }

    /// Accumulate the approximate long-range acceleration on one body into
    /// `acc`. Sets `tidal` when any evaluated source stresses the body past
    /// its integrity threshold.
    pub fn accel_on(
        &self,
        target: &TargetProbe,
        bodies: &BodyArena,
        params: &Parameters,
        theta: f64,
        acc: &mut NVec2,
        tidal: &mut bool,
    ) {
        self.traverse_node(self.root, target, bodies, params, theta, acc, tidal);
    }

    // helpers ==============================================================

    fn insert_body(&mut self, node_idx: usize, body_idx: u32, depth: usize, bodies: &BodyArena) {
        let bbox_min = self.nodes[node_idx].bbox_min;
        let bbox_max = self.nodes[node_idx].bbox_max;
        let pos = match bodies.at(body_idx) {
            Some(b) => b.x,
            None => return,
        };

        if depth >= MAX_DEPTH {
            self.nodes[node_idx].bodies.push(body_idx);
            return;
        }

        let is_leaf = self.nodes[node_idx].children.iter().all(|c| c.is_none());

        // empty leaf: store the body here
        if is_leaf && self.nodes[node_idx].bodies.is_empty() {
            self.nodes[node_idx].bodies.push(body_idx);
            return;
        }

        // occupied leaf: push the occupant one level down first
        if is_leaf {
            let existing = std::mem::take(&mut self.nodes[node_idx].bodies);
            for e in existing {
                let epos = match bodies.at(e) {
                    Some(b) => b.x,
                    None => continue,
                };
                let quad = quadrant_for_point(&epos, &bbox_min, &bbox_max);
                let child = self.ensure_child(node_idx, quad);
                self.insert_body(child, e, depth + 1, bodies);
            }
        }

        // internal node: descend into the right quadrant
        let quad = quadrant_for_point(&pos, &bbox_min, &bbox_max);
        let child = self.ensure_child(node_idx, quad);
        self.insert_body(child, body_idx, depth + 1, bodies);
    }

    /// Child node index for a quadrant, created on first use.
    fn ensure_child(&mut self, node_idx: usize, quad: usize) -> usize {
        if let Some(idx) = self.nodes[node_idx].children[quad] {
            return idx;
        }
        let (cmin, cmax) = child_bbox(
            &self.nodes[node_idx].bbox_min,
            &self.nodes[node_idx].bbox_max,
            quad,
        );
        let new_idx = self.nodes.len();
        self.nodes.push(QuadNode {
            mass: 0.0,
            charge: 0.0,
            moment: 0.0,
            com: NVec2::zeros(),
            bbox_min: cmin,
            bbox_max: cmax,
            children: [None; 4],
            bodies: Vec::new(),
        });
        self.nodes[node_idx].children[quad] = Some(new_idx);
        new_idx
    }

    /// Bottom-up aggregate pass: gravitational mass, net charge, net moment
    /// and mass-weighted center for every subtree.
    fn compute_aggregates(&mut self, bodies: &BodyArena, node_idx: usize) {
        let mut mass = 0.0;
        let mut charge = 0.0;
        let mut moment = 0.0;
        let mut com = NVec2::zeros();

        // snapshot by value so the recursion below can take &mut self
        let occupants = self.nodes[node_idx].bodies.clone();
        let children = self.nodes[node_idx].children;

        for idx in occupants {
            if let Some(b) = bodies.at(idx) {
                let gm = b.grav_mass();
                mass += gm;
                charge += b.charge;
                moment += b.moment;
                com += b.x * gm;
            }
        }

        for child_idx in children.iter().flatten() {
            self.compute_aggregates(bodies, *child_idx);
            let cn = &self.nodes[*child_idx];
            if cn.mass > 0.0 {
                mass += cn.mass;
                charge += cn.charge;
                moment += cn.moment;
                com += cn.com * cn.mass;
            }
        }

        if mass > 0.0 {
            com /= mass;
        }

        let node = &mut self.nodes[node_idx];
        node.mass = mass;
        node.charge = charge;
        node.moment = moment;
        node.com = com;
    }

    #[allow(clippy::too_many_arguments)]
    fn traverse_node(
        &self,
        node_idx: usize,
        target: &TargetProbe,
        bodies: &BodyArena,
        params: &Parameters,
        theta: f64,
        acc: &mut NVec2,
        tidal: &mut bool,
    ) {
        let node = &self.nodes[node_idx];

        // every body carries positive gravitational mass, so zero mass
        // means an empty subtree
        if node.mass == 0.0 {
            return;
        }

        // leaf: exact pairwise interaction with each occupant
        if !node.bodies.is_empty() {
            for &idx in &node.bodies {
                if idx == target.index {
                    continue;
                }
                let Some(b) = bodies.at(idx) else {
                    continue;
                };
                let r = b.x - target.x;
                let dist2 = r.norm_squared() + params.eps2;
                let inv_r = dist2.sqrt().recip();
                let inv_r3 = inv_r * inv_r * inv_r;

                if target.grav {
                    *acc += params.G * b.grav_mass() * inv_r3 * r;
                    self.tidal_check(target, params, b.grav_mass(), inv_r3, tidal);
                }
                if target.elec {
                    *acc -= params.ke * b.charge * target.charge * target.inv_m * inv_r3 * r;
                }
                if target.mag {
                    *acc += params.km * b.moment * target.moment * target.inv_m * inv_r3 * inv_r * r;
                }
            }
            return;
        }

        // internal: approximate the whole subtree when it looks small
        let size_vec = node.bbox_max - node.bbox_min;
        let size = size_vec.x.max(size_vec.y);

        let r = node.com - target.x;
        let dist = r.norm();
        if dist == 0.0 {
            return;
        }

        if size / dist < theta {
            let dist2 = r.norm_squared() + params.eps2;
            let inv_r = dist2.sqrt().recip();
            let inv_r3 = inv_r * inv_r * inv_r;

            if target.grav {
                *acc += params.G * node.mass * inv_r3 * r;
                self.tidal_check(target, params, node.mass, inv_r3, tidal);
            }
            if target.elec {
                *acc -= params.ke * node.charge * target.charge * target.inv_m * inv_r3 * r;
            }
            if target.mag {
                *acc += params.km * node.moment * target.moment * target.inv_m * inv_r3 * inv_r * r;
            }
        } else {
            for child_idx in node.children.iter().flatten() {
                self.traverse_node(*child_idx, target, bodies, params, theta, acc, tidal);
            }
        }
    }

    /// Differential-gravity stress across the body diameter against its
    /// heat-weakened integrity.
    fn tidal_check(
        &self,
        target: &TargetProbe,
        params: &Parameters,
        source_mass: f64,
        inv_r3: f64,
        tidal: &mut bool,
    ) {
        if !params.fragmentation || target.integrity.is_infinite() {
            return;
        }
        let stress = 2.0 * params.G * source_mass * target.m * target.radius * inv_r3;
        if stress > target.integrity {
            *tidal = true;
        }
    }
}

// helpers ==================================================================

/// Square bounding box enclosing all live bodies, so node size is a single
/// number for the opening criterion.
fn compute_global_bbox(bodies: &BodyArena) -> (NVec2, NVec2) {
    let mut min = NVec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = NVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

    for (_, b) in bodies.iter() {
        min.x = min.x.min(b.x.x);
        min.y = min.y.min(b.x.y);
        max.x = max.x.max(b.x.x);
        max.y = max.y.max(b.x.y);
    }

    if !min.x.is_finite() || !max.x.is_finite() {
        return (NVec2::new(-1.0, -1.0), NVec2::new(1.0, 1.0));
    }

    let center = (min + max) * 0.5;
    let half = ((max - min) * 0.5).x.max(((max - min) * 0.5).y).max(1.0);
    let half = NVec2::new(half, half);
    (center - half, center + half)
}

/// Quadrant index for a point: bit 0 is x (right half), bit 1 is y (top
/// half), matching the `children` layout.
fn quadrant_for_point(p: &NVec2, bbox_min: &NVec2, bbox_max: &NVec2) -> usize {
    let center = (bbox_min + bbox_max) * 0.5;
    let mut idx = 0;
    if p.x >= center.x {
        idx |= 1;
    }
    if p.y >= center.y {
        idx |= 2;
    }
    idx
}

/// Bounding box of one child quadrant, same bit encoding as
/// `quadrant_for_point`.
fn child_bbox(parent_min: &NVec2, parent_max: &NVec2, quad: usize) -> (NVec2, NVec2) {
    let center = (parent_min + parent_max) * 0.5;
    let mut min = *parent_min;
    let mut max = *parent_max;

    if (quad & 1) == 0 {
        max.x = center.x;
    } else {
        min.x = center.x;
    }
    if (quad & 2) == 0 {
        max.y = center.y;
    } else {
        min.y = center.y;
    }
    (min, max)
}
