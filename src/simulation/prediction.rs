//! Trajectory prediction by forward-running a cloned system
//!
//! `predict_trajectory` steps a copy of the world through the same pipeline
//! as [`Sandbox::advance`] and records where one tracked body goes. The
//! live sandbox is never touched. Breakups are detected but not applied:
//! the predicted path ends where the tracked body would shatter, annihilate
//! or expire. A periodic wrap marks that sample as a discontinuity so a
//! viewer can lift the pen between segments.

use crate::simulation::arena::BodyId;
use crate::simulation::barriers::resolve_barriers;
use crate::simulation::bonds::resolve_bonds;
use crate::simulation::collision::resolve_collisions;
use crate::simulation::forces::{long_range_accels, null_masks};
use crate::simulation::grid::SpatialGrid;
use crate::simulation::integrator::{finalize_velocities, kick_drift};
use crate::simulation::sandbox::{Sandbox, standard_forces};
use crate::simulation::states::NVec2;
use crate::simulation::thermal::apply_thermal;
use crate::simulation::zones::{annihilation_pass, apply_periodic};

/// One predicted sample, taken after a full step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub x: NVec2, // position after the step
    pub discontinuity: bool, // the body wrapped through a periodic zone this step
}

impl Sandbox {
    /// Predict where `id` goes over up to `steps` ticks of `step_size`
    /// seconds each. A non-positive `step_size` falls back to the live
    /// step size. Returns fewer samples when the body would not survive.
    pub fn predict_trajectory(
        &self,
        id: BodyId,
        steps: usize,
        step_size: f64,
    ) -> Vec<TrajectoryPoint> {
        let mut points = Vec::new();
        if steps == 0 || self.system.bodies.get(id).is_none() {
            return points;
        }

        let mut sys = self.system.clone();
        let mut params = self.parameters.clone();
        if step_size > 0.0 {
            params.h0 = step_size;
        }
        params.trail_len = 0; // the copy does not need trails
        let forces = standard_forces();
        let mut rng = self.rng.clone();

        let mut grid = SpatialGrid::new();
        let mut pairs = Vec::new();
        let mut accel: Vec<NVec2> = Vec::new();
        let mut prev = Vec::new();
        let mut masks = Vec::new();
        let mut frag = Vec::new();
        let mut wrapped = Vec::new();
        let mut annihilated = Vec::new();

        for _ in 0..steps {
            kick_drift(&mut sys, &params, &mut prev);
            grid.build(&sys.bodies);
            grid.pairs(&sys.bodies, &mut pairs);

            accel.resize(sys.bodies.slot_count(), NVec2::zeros());
            forces.accumulate_accels(sys.t, &sys, &params, &mut accel);
            resolve_bonds(&mut sys, &params, &mut accel);

            frag.clear();
            null_masks(&sys, &mut masks);
            long_range_accels(&sys, &self.engine, &params, &masks, &mut accel, &mut frag);
            resolve_collisions(&mut sys, &pairs, &params, &mut accel, &mut frag);
            resolve_barriers(&mut sys, &prev, &params);
            finalize_velocities(&mut sys, &params, &accel);
            apply_thermal(&mut sys, &params);

            wrapped.clear();
            apply_periodic(&mut sys, &mut wrapped);
            annihilated.clear();
            annihilation_pass(&mut sys, &mut rng, &mut annihilated);
            age_copy(&mut sys);
            sys.tick += 1;

            // detection only: a queued breakup ends the path right here
            if frag.contains(&id) {
                break;
            }
            let Some(body) = sys.bodies.get(id) else {
                break;
            };
            points.push(TrajectoryPoint {
                x: body.x,
                discontinuity: wrapped.contains(&id),
            });
        }
        points
    }
}

/// Lifetimes and cooldowns still tick on the copy, so an expiring body
/// ends its predicted path at the right step.
fn age_copy(sys: &mut crate::simulation::states::System) {
    let mut expired = Vec::new();
    for (id, body) in sys.bodies.iter_mut() {
        if body.frag_cooldown > 0 {
            body.frag_cooldown -= 1;
        }
        if let Some(life) = body.lifetime {
            if life <= 1 {
                expired.push(id);
            } else {
                body.lifetime = Some(life - 1);
            }
        }
    }
    for &id in &expired {
        sys.despawn(id);
    }
}
