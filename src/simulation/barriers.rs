//! Solid line-segment barriers
//!
//! Barriers are one-sided only in the sense that a body keeps the side it
//! approached from: contact is detected both by overlap and by the motion
//! segment of the last step crossing the barrier, so fast bodies cannot
//! tunnel through. Collision response treats the barrier as infinitely
//! massive.

use crate::simulation::integrator::clamp_speed;
use crate::simulation::params::Parameters;
use crate::simulation::states::{cross2, perp, NVec2, System};

#[derive(Debug, Clone)]
pub struct SolidBarrier {
    pub id: u32,
    pub a: NVec2,
    pub b: NVec2,
    pub restitution: f64,
    pub friction: f64,
    pub enabled: bool,
}

/// Closest point to `p` on segment `ab`.
pub fn closest_on_segment(p: NVec2, a: NVec2, b: NVec2) -> NVec2 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-18 {
        return a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Proper segment-segment intersection test, orientation based.
pub fn segments_cross(p1: NVec2, p2: NVec2, q1: NVec2, q2: NVec2) -> bool {
    let d1 = cross2(q2 - q1, p1 - q1);
    let d2 = cross2(q2 - q1, p2 - q1);
    let d3 = cross2(p2 - p1, q1 - p1);
    let d4 = cross2(p2 - p1, q2 - p1);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

/// Push penetrating or tunneling bodies back to the side they came from
/// and bounce them off the barrier.
pub fn resolve_barriers(sys: &mut System, prev: &[NVec2], params: &Parameters) {
    if sys.barriers.iter().all(|b| !b.enabled) {
        return;
    }
    let barriers = sys.barriers.clone();

    for (id, body) in sys.bodies.iter_mut() {
        if body.is_immovable() {
            continue;
        }
        let from = prev[id.index as usize];
        for bar in barriers.iter().filter(|b| b.enabled) {
            let closest = closest_on_segment(body.x, bar.a, bar.b);
            let dist = (body.x - closest).norm();
            let tunneled = segments_cross(from, body.x, bar.a, bar.b);
            if !tunneled && dist >= body.radius {
                continue;
            }

            // outward normal points to the side the body started on; when
            // the start lies on the line, fall back to the current side
            let along = bar.b - bar.a;
            let side_of = |p: NVec2| cross2(along, p - bar.a);
            let mut side = side_of(from);
            if side == 0.0 {
                side = side_of(body.x);
            }
            let sign = if side < 0.0 { -1.0 } else { 1.0 };
            let n_len = along.norm();
            if n_len < 1e-9 {
                continue;
            }
            let normal = perp(along) * (sign / n_len);

            let anchor = if tunneled {
                closest_on_segment(from, bar.a, bar.b)
            } else {
                closest
            };
            body.x = anchor + normal * body.radius;

            // contact point velocity includes the spin contribution
            let contact = -normal * body.radius;
            let v_contact = body.v + body.spin * perp(contact);
            let vn = v_contact.dot(&normal);
            if vn >= 0.0 {
                continue;
            }

            let e = body.restitution_now().min(bar.restitution);
            let jn = -(1.0 + e) * vn / body.inv_m;
            body.v += normal * (jn * body.inv_m);

            let v_contact = body.v + body.spin * perp(contact);
            let tangential = v_contact - normal * v_contact.dot(&normal);
            let vt = tangential.norm();
            if vt > 1e-9 {
                let t_hat = tangential / vt;
                let k_t = body.inv_m + body.inv_inertia() * cross2(contact, t_hat).powi(2);
                let mu = 0.5 * (body.friction + bar.friction);
                let jt = (vt / k_t).min(mu * jn.abs());
                let impulse = -t_hat * jt;
                body.v += impulse * body.inv_m;
                body.spin += body.inv_inertia() * cross2(contact, impulse);
            }

            clamp_speed(&mut body.v, params.speed_limit);
        }
    }
}
