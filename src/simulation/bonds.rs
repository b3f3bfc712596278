//! Elastic bonds between body pairs
//!
//! A bond applies a power-law spring force along the axis between its two
//! endpoints, with optional velocity damping, rest-length oscillation and a
//! tension break threshold. Forces are converted to accelerations in the
//! shared per-slot buffer; broken bonds are removed here and reported to
//! the caller.

use crate::simulation::arena::BodyId;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec2, System};

/// Spring link between two bodies.
#[derive(Debug, Clone)]
pub struct ElasticBond {
    pub id: u32,
    pub a: BodyId,
    pub b: BodyId,
    pub rest_len: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub nonlinearity: f64, // exponent on displacement, 1 = Hooke
    pub break_tension: f64, // force threshold, <= 0 never breaks
    pub amplitude: f64, // rest-length oscillation
    pub frequency: f64, // cycles per second
    pub rope: bool, // pull only, slack under compression
    pub enabled: bool,
}

impl ElasticBond {
    /// Rest length at time `t`, including the oscillation term.
    pub fn target_len(&self, t: f64) -> f64 {
        if self.amplitude != 0.0 && self.frequency != 0.0 {
            self.rest_len + self.amplitude * (std::f64::consts::TAU * self.frequency * t).sin()
        } else {
            self.rest_len
        }
    }
}

/// Accumulate bond accelerations into `out` (indexed by slot) and drop
/// bonds that broke this step. Returns the broken bond ids.
pub fn resolve_bonds(sys: &mut System, params: &Parameters, out: &mut [NVec2]) -> Vec<u32> {
    let dt = params.h0;
    let t = sys.t;
    let mut broken = Vec::new();

    for bond in &sys.bonds {
        if !bond.enabled {
            continue;
        }
        let (Some(ba), Some(bb)) = (sys.bodies.get(bond.a), sys.bodies.get(bond.b)) else {
            continue;
        };
        let inv_sum = ba.inv_m + bb.inv_m;
        if inv_sum == 0.0 {
            continue;
        }
        let delta = bb.x - ba.x;
        let len = delta.norm();
        if len < 1e-9 {
            continue;
        }
        let axis = delta / len;
        let d = len - bond.target_len(t);
        if bond.rope && d <= 0.0 {
            continue;
        }

        let mut spring = bond.stiffness * d.signum() * d.abs().powf(bond.nonlinearity);
        // breaking is tested on the raw force, before the stability clamp
        if bond.break_tension > 0.0 && d > 0.0 && spring > bond.break_tension {
            broken.push(bond.id);
            continue;
        }

        let v_along = (bb.v - ba.v).dot(&axis);
        // an impulse larger than this would overshoot past the rest length
        // within one step and pump energy into the pair
        let spring_cap = (v_along.abs() + d.abs() / dt) / (inv_sum * dt);
        spring = spring.clamp(-spring_cap, spring_cap);

        let damp_cap = v_along.abs() / (inv_sum * dt);
        let damp = (bond.damping * v_along).clamp(-damp_cap, damp_cap);

        let force = axis * (spring + damp);
        let (inv_a, inv_b) = (ba.inv_m, bb.inv_m);
        out[bond.a.index as usize] += force * inv_a;
        out[bond.b.index as usize] -= force * inv_b;
    }

    if !broken.is_empty() {
        sys.bonds.retain(|b| !broken.contains(&b.id));
    }
    broken
}
