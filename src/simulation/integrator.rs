//! Fixed-step time integration
//!
//! Velocity-Verlet with the acceleration stored on the body between
//! ticks, split into two halves so the broad phase, bonds, collisions and
//! barriers can run against the drifted positions:
//!
//! - [`kick_drift`]: v_n+1/2 = v_n + (dt/2) a_n, then x_n+1 = x_n + dt v_n+1/2,
//!   advancing `sys.t`, the rotation angle and the trails;
//! - [`finalize_velocities`]: v_n+1 = v_n+1/2 + (dt/2) a_n+1 once the new
//!   accelerations are summed, storing a_n+1 for the next tick.
//!
//! Both halves clamp speed to the configured limit, the sandbox's guard
//! against runaway contacts.

use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec2, System};

/// Hard speed clamp, preserving direction.
pub fn clamp_speed(v: &mut NVec2, limit: f64) {
    let speed = v.norm();
    if speed > limit {
        *v *= limit / speed;
    }
}

/// First verlet half: half-kick from the stored acceleration, full drift,
/// time, angle and trail updates. Pre-drift positions are written to
/// `prev` (indexed by slot) for the barrier tunneling test.
pub fn kick_drift(sys: &mut System, params: &Parameters, prev: &mut Vec<NVec2>) {
    let dt = params.h0;
    let half_dt = 0.5 * dt;

    prev.clear();
    prev.resize(sys.bodies.slot_count(), NVec2::zeros());

    for (id, b) in sys.bodies.iter_mut() {
        prev[id.index as usize] = b.x;
        b.angle += b.spin * dt;
        if b.is_immovable() {
            continue;
        }

        // v_n+1/2 = v_n + (1/2 * dt) * a_n
        b.v += half_dt * b.a;
        clamp_speed(&mut b.v, params.speed_limit);

        // x_n+1 = x_n + dt * v_n+1/2
        b.x += dt * b.v;

        if params.trail_len == 0 {
            b.trail.clear();
        } else {
            b.trail.push_back(b.x);
            while b.trail.len() > params.trail_len {
                b.trail.pop_front();
            }
        }
    }

    // t_n+1 = t_n + dt
    sys.t += dt;
}

/// Second verlet half: v_n+1 = v_n+1/2 + (1/2 * dt) * a_n+1. The new
/// acceleration is stored on the body for the next tick's first half.
pub fn finalize_velocities(sys: &mut System, params: &Parameters, accel: &[NVec2]) {
    let half_dt = 0.5 * params.h0;
    for (id, b) in sys.bodies.iter_mut() {
        if b.is_immovable() {
            b.a = NVec2::zeros();
            continue;
        }
        let a = accel[id.index as usize];
        b.v += half_dt * a;
        b.a = a;
        clamp_speed(&mut b.v, params.speed_limit);
    }
}
