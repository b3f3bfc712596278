//! Force / acceleration contributors for the sandbox engine
//!
//! Pure acceleration sources (external, zone-driven, formula fields)
//! implement [`Acceleration`] and are summed by [`AccelSet`] into one
//! buffer per tick. The long-range pair forces (gravity, electrostatics,
//! magnetism) live in [`long_range_accels`], which picks between the
//! direct all-pairs sum and the Barnes-Hut quadtree and also feeds the
//! tidal fragmentation queue.

use crate::simulation::arena::BodyId;
use crate::simulation::engine::Engine;
use crate::simulation::formula::Env;
use crate::simulation::noise;
use crate::simulation::params::Parameters;
use crate::simulation::quadtree::{QuadTree, TargetProbe};
use crate::simulation::states::{perp, Body, NVec2, System};
use crate::simulation::zones::{NULL_ELECTRIC, NULL_GRAVITY, NULL_MAGNETIC};

/// Collection of acceleration terms.
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector per body slot.
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add an acceleration term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Acceleration + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    /// Compute total accelerations at time `t` for all bodies in `sys`
    /// - `out[slot]` will be set to the sum of contributions from all terms
    pub fn accumulate_accels(&self, t: f64, sys: &System, params: &Parameters, out: &mut [NVec2]) {
        // Zero buffer
        for a in out.iter_mut() {
            *a = NVec2::zeros();
        }
        // Iterate over all acceleration contributors
        for term in &self.terms {
            term.acceleration(t, sys, params, out);
        }
    }
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for acceleration sources operating on [`System`].
/// Implementations add their contribution into `out[slot]` for each body.
pub trait Acceleration {
    fn acceleration(&self, t: f64, sys: &System, params: &Parameters, out: &mut [NVec2]);
}

/// Per-body constant external acceleration (`a0`), e.g. uniform gravity
/// painted onto selected bodies.
pub struct ExternalAccel;

impl Acceleration for ExternalAccel {
    fn acceleration(&self, _t: f64, sys: &System, _params: &Parameters, out: &mut [NVec2]) {
        for (id, body) in sys.bodies.iter() {
            if body.is_immovable() {
                continue;
            }
            out[id.index as usize] += body.a0;
        }
    }
}

/// Accelerations painted by zones: viscosity drag, constant-force regions,
/// chaos turbulence and vortex swirl.
pub struct ZoneForces;

impl Acceleration for ZoneForces {
    fn acceleration(&self, t: f64, sys: &System, params: &Parameters, out: &mut [NVec2]) {
        let zones = &sys.zones;
        if zones.viscosity.is_empty()
            && zones.field.is_empty()
            && zones.chaos.is_empty()
            && zones.vortex.is_empty()
        {
            return;
        }
        for (id, body) in sys.bodies.iter() {
            if body.is_immovable() {
                continue;
            }
            let slot = id.index as usize;
            let p = body.x;

            for z in zones.viscosity.iter().filter(|z| z.enabled) {
                if z.shape.contains(p) {
                    out[slot] -= body.v * z.coefficient;
                }
            }
            for z in zones.field.iter().filter(|z| z.enabled) {
                if z.shape.contains(p) {
                    out[slot] += z.force;
                }
            }
            for z in zones.chaos.iter().filter(|z| z.enabled) {
                if z.shape.contains(p) {
                    let n = noise::sample(params.seed, t, z.frequency, p, z.spatial_scale);
                    out[slot] += n * z.strength;
                }
            }
            for z in zones.vortex.iter().filter(|z| z.enabled) {
                if !z.shape.contains(p) {
                    continue;
                }
                let to_center = z.shape.center() - p;
                let d = to_center.norm();
                if d < 1e-9 {
                    continue;
                }
                let radial_in = to_center / d;
                let swirl = radial_in + perp(radial_in);
                out[slot] += swirl * (z.strength / (d + 10.0));
            }
        }
    }
}

/// User formula fields, treated as an electric field: the evaluated vector
/// is scaled by body charge and inverse mass, so neutral bodies ignore it.
pub struct FieldForces;

impl Acceleration for FieldForces {
    fn acceleration(&self, t: f64, sys: &System, params: &Parameters, out: &mut [NVec2]) {
        if sys.fields.iter().all(|f| !f.enabled || !f.is_valid()) {
            return;
        }
        for (id, body) in sys.bodies.iter() {
            if body.is_immovable() || body.charge == 0.0 {
                continue;
            }
            let env = Env {
                x: body.x.x,
                y: body.x.y,
                t,
                g: params.G,
                c: params.c,
                ke: params.ke,
                km: params.km,
            };
            let mut field = NVec2::zeros();
            for f in sys.fields.iter().filter(|f| f.enabled && f.is_valid()) {
                field += f.eval_at(&env);
            }
            out[id.index as usize] += field * body.charge * body.inv_m;
        }
    }
}

/// Per-slot nullification masks from the null zones. The buffer is resized
/// to the arena slot count so it can be indexed directly.
pub fn null_masks(sys: &System, masks: &mut Vec<u8>) {
    masks.clear();
    masks.resize(sys.bodies.slot_count(), 0);
    if !sys.zones.any_null_enabled() {
        return;
    }
    for (id, body) in sys.bodies.iter() {
        masks[id.index as usize] = sys.zones.null_mask_at(body.x);
    }
}

/// Long-range pair forces: gravity, electrostatics and inverse-cube
/// magnetism, all softened by `eps2`.
///
/// Masks suppress a force on the receiving side only, so a body inside a
/// null zone stops feeling a force but keeps exerting it. Bodies whose
/// tidal stress exceeds their integrity are appended to `frag` for the
/// fragmentation pass.
pub fn long_range_accels(
    sys: &System,
    engine: &Engine,
    params: &Parameters,
    masks: &[u8],
    out: &mut [NVec2],
    frag: &mut Vec<BodyId>,
) {
    if !params.gravity && !params.electric && !params.magnetic {
        return;
    }
    if engine.barnes_hut {
        tree_pass(sys, engine.theta, params, masks, out, frag);
    } else {
        direct_pass(sys, params, masks, out, frag);
    }
}

/// Direct O(n^2) sum over unordered pairs, each visited once with i < j.
fn direct_pass(
    sys: &System,
    params: &Parameters,
    masks: &[u8],
    out: &mut [NVec2],
    frag: &mut Vec<BodyId>,
) {
    let live: Vec<(BodyId, &Body)> = sys.bodies.iter().collect();
    let n = live.len();

    for i in 0..n {
        let (id_i, bi) = live[i];
        let si = id_i.index as usize;

        for j in (i + 1)..n {
            let (id_j, bj) = live[j];
            let sj = id_j.index as usize;

            // r points from i to j: i is pulled along +r, j along -r
            let r = bj.x - bi.x;
            let r2 = r.norm_squared();
            if r2 < 1e-12 {
                continue; // coincident, direction undefined
            }
            let d2 = r2 + params.eps2;
            let inv_r = d2.sqrt().recip();
            let inv_r3 = inv_r * inv_r * inv_r;

            if params.gravity {
                let coef = params.G * inv_r3;
                if !bi.is_immovable() && masks[si] & NULL_GRAVITY == 0 {
                    out[si] += coef * bj.grav_mass() * r;
                    tidal_probe(bi, bj.grav_mass(), inv_r3, params, id_i, frag);
                }
                if !bj.is_immovable() && masks[sj] & NULL_GRAVITY == 0 {
                    out[sj] -= coef * bi.grav_mass() * r;
                    tidal_probe(bj, bi.grav_mass(), inv_r3, params, id_j, frag);
                }
            }

            if params.electric && bi.charge != 0.0 && bj.charge != 0.0 {
                // like charges repel: positive product pushes along -r on i
                let coef = params.ke * bi.charge * bj.charge * inv_r3;
                if masks[si] & NULL_ELECTRIC == 0 {
                    out[si] -= coef * bi.inv_m * r;
                }
                if masks[sj] & NULL_ELECTRIC == 0 {
                    out[sj] += coef * bj.inv_m * r;
                }
            }

            if params.magnetic && bi.moment != 0.0 && bj.moment != 0.0 {
                // inverse-cube force, positive moment product attracts
                let coef = params.km * bi.moment * bj.moment * inv_r3 * inv_r;
                if masks[si] & NULL_MAGNETIC == 0 {
                    out[si] += coef * bi.inv_m * r;
                }
                if masks[sj] & NULL_MAGNETIC == 0 {
                    out[sj] -= coef * bj.inv_m * r;
                }
            }
        }
    }
}

/// Barnes-Hut evaluation through the quadtree.
fn tree_pass(
    sys: &System,
    theta: f64,
    params: &Parameters,
    masks: &[u8],
    out: &mut [NVec2],
    frag: &mut Vec<BodyId>,
) {
    let tree = QuadTree::build(&sys.bodies);
    for (id, body) in sys.bodies.iter() {
        if body.is_immovable() {
            continue;
        }
        let slot = id.index as usize;
        let mask = masks[slot];
        let target = TargetProbe {
            index: id.index,
            x: body.x,
            m: body.m,
            inv_m: body.inv_m,
            radius: body.radius,
            charge: body.charge,
            moment: body.moment,
            integrity: body.integrity_now(),
            grav: params.gravity && mask & NULL_GRAVITY == 0,
            elec: params.electric && mask & NULL_ELECTRIC == 0,
            mag: params.magnetic && mask & NULL_MAGNETIC == 0,
        };
        let mut tidal = false;
        tree.accel_on(&target, &sys.bodies, params, theta, &mut out[slot], &mut tidal);
        if tidal {
            frag.push(id);
        }
    }
}

/// Tidal stress across the body diameter against its heat-weakened
/// integrity.
fn tidal_probe(
    body: &Body,
    source_mass: f64,
    inv_r3: f64,
    params: &Parameters,
    id: BodyId,
    frag: &mut Vec<BodyId>,
) {
    if !params.fragmentation {
        return;
    }
    let integrity = body.integrity_now();
    if integrity.is_infinite() {
        return;
    }
    let stress = 2.0 * params.G * source_mass * body.m * body.radius * inv_r3;
    if stress > integrity {
        frag.push(id);
    }
}
