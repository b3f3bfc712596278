//! Body breakup
//!
//! Overstressed bodies (tidal stress or collision impulse past their
//! integrity) are queued during the force passes and split here at the end
//! of the tick. A parent shatters into 2..=5 children scaled by
//! `ln(mass)`, the children share the parent's mass, charge and moment,
//! spawn hot, short-lived and spread around the parent disk, and carry a
//! fragmentation cooldown so debris does not chain-shatter instantly.

use rand::rngs::StdRng;
use rand::Rng;

use crate::simulation::arena::BodyId;
use crate::simulation::params::Parameters;
use crate::simulation::states::{radius_for_mass, Body, NVec2, System};

/// Ticks a fresh fragment is immune to further breakup.
pub const FRAG_COOLDOWN_TICKS: u64 = 30;
/// Parents lighter than this stay intact, there is nothing to split.
const MIN_PARENT_MASS: f64 = 1.0;
/// Heat released by the breakup itself.
const SHATTER_HEAT: f64 = 150.0;

/// Split every queued body that is still alive and eligible. Returns the
/// ids of the parents that actually shattered.
pub fn process_queue(
    sys: &mut System,
    queue: &[BodyId],
    params: &Parameters,
    rng: &mut StdRng,
) -> Vec<BodyId> {
    let mut shattered = Vec::new();
    if !params.fragmentation {
        return shattered;
    }

    for &id in queue {
        let Some(parent) = sys.bodies.get(id) else {
            continue; // removed earlier this tick, or a duplicate entry
        };
        if parent.frag_cooldown > 0 || parent.is_immovable() || parent.m < MIN_PARENT_MASS {
            continue;
        }
        let parent = match sys.despawn(id) {
            Some(p) => p,
            None => continue,
        };
        spawn_fragments(sys, &parent, rng);
        shattered.push(id);
    }
    shattered
}

/// Children of one shattered parent: 2..=5 pieces, mass fully conserved,
/// spread on evenly-spaced rays with jitter.
fn spawn_fragments(sys: &mut System, parent: &Body, rng: &mut StdRng) {
    let count = (parent.m.ln().floor() as i64).clamp(2, 5) as usize;

    let mut remainder = parent.m;
    let base_angle = rng.gen_range(0.0..std::f64::consts::TAU);
    for k in 0..count {
        let mass = if k + 1 == count {
            remainder
        } else {
            let share = rng.gen_range(0.2..0.5);
            let m = remainder * share;
            remainder -= m;
            m
        };
        let fraction = mass / parent.m;

        let angle = base_angle
            + k as f64 / count as f64 * std::f64::consts::TAU
            + rng.gen_range(-0.3..0.3);
        let dir = NVec2::new(angle.cos(), angle.sin());
        let offset = parent.radius * rng.gen_range(0.3..0.8);
        let speed = rng.gen_range(20.0..80.0);

        let mut child = parent.clone();
        child.set_mass(mass);
        child.radius = radius_for_mass(mass);
        child.x = parent.x + dir * offset;
        child.v = parent.v + dir * speed;
        child.charge = parent.charge * fraction;
        child.moment = parent.moment * fraction;
        child.integrity = parent.integrity * 0.8; // debris is easier to break
        child.temp = parent.temp + SHATTER_HEAT;
        child.lifetime = Some(rng.gen_range(240..720));
        child.frag_cooldown = FRAG_COOLDOWN_TICKS;
        child.trail.clear();
        sys.bodies.insert(child);
    }
}

/// One piece of an annihilation-zone burst: inherits the parent's material
/// but flashes out quickly.
pub fn burst_fragment(parent: &Body, mass: f64, velocity: NVec2, rng: &mut StdRng) -> Body {
    let mut b = parent.clone();
    b.set_mass(mass.max(0.05));
    b.radius = radius_for_mass(b.m);
    b.v = parent.v + velocity;
    b.charge = 0.0;
    b.moment = 0.0;
    b.temp = parent.temp + SHATTER_HEAT;
    b.lifetime = Some(rng.gen_range(30..120));
    b.frag_cooldown = FRAG_COOLDOWN_TICKS;
    b.trail.clear();
    b
}
