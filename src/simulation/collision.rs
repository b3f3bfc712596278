//! Short-range collision response
//!
//! Candidate pairs come from the broad-phase grid; anything actually
//! overlapping gets two layers of response:
//!
//! 1. a continuous elastic repulsion force (Hertz-like contact patch,
//!    stiffness from the temperature-dependent material curves) that is
//!    accumulated into the acceleration buffer, and
//! 2. for approaching contacts, an instantaneous impulse with restitution,
//!    Coulomb friction on the contact tangent (driving spin), positional
//!    bias against sinking, collision heating and an impulse-overload
//!    check feeding the fragmentation queue.

use crate::simulation::arena::BodyId;
use crate::simulation::params::Parameters;
use crate::simulation::states::{cross2, perp, NVec2, System};

/// Penetration tolerated before the positional bias engages.
const SLOP: f64 = 0.01;
/// Fraction of the remaining penetration corrected per step.
const BIAS: f64 = 0.8;

/// Resolve all candidate pairs. Repulsion forces go to `out` (per slot),
/// impulses are applied to the bodies directly, overloaded bodies are
/// appended to `frag`.
pub fn resolve_collisions(
    sys: &mut System,
    pairs: &[(u32, u32)],
    params: &Parameters,
    out: &mut [NVec2],
    frag: &mut Vec<BodyId>,
) {
    let dt = params.h0;

    for &(si, sj) in pairs {
        let (Some(id_i), Some(id_j)) = (sys.bodies.id_at(si), sys.bodies.id_at(sj)) else {
            continue;
        };
        let Some((bi, bj)) = sys.bodies.pair_mut(si, sj) else {
            continue;
        };

        let inv_sum = bi.inv_m + bj.inv_m;
        if inv_sum == 0.0 {
            continue; // two immovable bodies cannot respond
        }

        let delta = bj.x - bi.x;
        let dist2 = delta.norm_squared();
        let r_sum = bi.radius + bj.radius;
        if dist2 >= r_sum * r_sum {
            continue;
        }
        let dist = dist2.sqrt();
        let normal = if dist > 1e-9 {
            delta / dist
        } else {
            NVec2::new(1.0, 0.0) // coincident centers, pick an axis
        };
        let overlap = r_sum - dist;

        // --- continuous elastic repulsion -------------------------------
        let stiff_i = bi.stiffness_now();
        let stiff_j = bj.stiffness_now();
        let e_eff = if stiff_i + stiff_j > 0.0 {
            2.0 * stiff_i * stiff_j / (stiff_i + stiff_j)
        } else {
            0.0
        };
        let eff_r = if r_sum > 0.0 {
            2.0 * bi.radius * bj.radius / r_sum
        } else {
            0.0
        };
        let width = 2.0 * (eff_r * overlap).max(0.0).sqrt();
        let force = e_eff * width * overlap;
        out[si as usize] -= normal * (force * bi.inv_m);
        out[sj as usize] += normal * (force * bj.inv_m);

        // --- impulse response for approaching contacts ------------------
        let r_i = normal * bi.radius; // center i to contact
        let r_j = -normal * bj.radius; // center j to contact
        let v_ci = bi.v + bi.spin * perp(r_i);
        let v_cj = bj.v + bj.spin * perp(r_j);
        let v_rel = v_cj - v_ci;
        let vn = v_rel.dot(&normal);
        if vn >= 0.0 {
            continue; // separating or resting
        }

        let e = bi.restitution_now().min(bj.restitution_now());
        let bias = BIAS * (overlap - SLOP).max(0.0) / dt;
        let jn = ((-(1.0 + e) * vn + bias) / inv_sum).max(0.0);

        bi.v -= normal * (jn * bi.inv_m);
        bj.v += normal * (jn * bj.inv_m);

        // friction acts on the post-impulse tangential contact velocity
        let v_ci = bi.v + bi.spin * perp(r_i);
        let v_cj = bj.v + bj.spin * perp(r_j);
        let v_rel = v_cj - v_ci;
        let tangential = v_rel - normal * v_rel.dot(&normal);
        let vt = tangential.norm();
        if vt > 1e-9 {
            let t_hat = tangential / vt;
            let k_t = inv_sum
                + bi.inv_inertia() * cross2(r_i, t_hat).powi(2)
                + bj.inv_inertia() * cross2(r_j, t_hat).powi(2);
            let mu = 0.5 * (bi.friction + bj.friction);
            let jt = (vt / k_t).min(mu * jn);
            let impulse = -t_hat * jt; // on body j, opposite on i
            bi.v -= impulse * bi.inv_m;
            bj.v += impulse * bj.inv_m;
            bi.spin += bi.inv_inertia() * cross2(r_i, -impulse);
            bj.spin += bj.inv_inertia() * cross2(r_j, impulse);
        }

        // --- collision heating ------------------------------------------
        if params.thermodynamics {
            let e_avg = 0.5 * (bi.restitution_now() + bj.restitution_now());
            let red_m = 1.0 / inv_sum;
            let heat = 0.5 * red_m * vn * vn * (1.0 - e_avg * e_avg).max(0.0);
            if heat > 0.0 {
                // the stiffer partner pushes more of the heat into the other
                let share_i = if stiff_i + stiff_j > 0.0 {
                    stiff_j / (stiff_i + stiff_j)
                } else {
                    0.5
                };
                if bi.specific_heat > 0.0 {
                    bi.temp += heat * share_i * bi.absorption * bi.inv_m / bi.specific_heat;
                }
                if bj.specific_heat > 0.0 {
                    bj.temp += heat * (1.0 - share_i) * bj.absorption * bj.inv_m / bj.specific_heat;
                }
            }
        }

        // --- impulse overload -> breakup --------------------------------
        if params.fragmentation {
            if jn > bi.integrity_now() {
                frag.push(id_i);
            }
            if jn > bj.integrity_now() {
                frag.push(id_j);
            }
        }
    }
}
