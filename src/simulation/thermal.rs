//! Heat flow between bodies and their environment
//!
//! Two mechanisms, both per tick:
//!
//! - thermal zones relax a contained body toward the zone temperature with
//!   an exponential factor from the averaged heat-transfer coefficient, so
//!   overlap of zones never overshoots;
//! - Stefan-Boltzmann-style radiative exchange with the ambient
//!   temperature (`None` = vacuum, the body only radiates away), clamped
//!   so a step never crosses the equilibrium point.

use crate::simulation::params::Parameters;
use crate::simulation::states::System;
use crate::simulation::zones::relaxation;

pub fn apply_thermal(sys: &mut System, params: &Parameters) {
    if !params.thermodynamics {
        return;
    }
    let dt = params.h0;
    let zones = sys.zones.thermal.clone();

    for (_, body) in sys.bodies.iter_mut() {
        // zone relaxation, averaged over every containing zone
        let mut target_sum = 0.0;
        let mut rate_sum = 0.0;
        let mut hits = 0u32;
        for z in zones.iter().filter(|z| z.enabled) {
            if z.shape.contains(body.x) {
                target_sum += z.temperature;
                rate_sum += z.transfer;
                hits += 1;
            }
        }
        if hits > 0 {
            let target = target_sum / hits as f64;
            let rate = rate_sum / hits as f64;
            body.temp = relaxation(body.temp, target, rate, dt);
        }

        // radiative exchange with the surroundings
        if body.specific_heat <= 0.0 {
            continue;
        }
        let t4 = body.temp.powi(4);
        let ambient = params.ambient_temp;
        let amb4 = ambient.map(|t| t.powi(4)).unwrap_or(0.0);
        let area = 4.0 * std::f64::consts::PI * body.radius * body.radius;
        let power = params.sigma * area * (t4 - amb4);
        let capacity = body.grav_mass() * body.specific_heat;
        let mut temp = body.temp - power * dt / capacity;

        // never step past the equilibrium temperature
        let floor = ambient.unwrap_or(0.0);
        if body.temp > floor {
            temp = temp.max(floor);
        } else {
            temp = temp.min(floor);
        }
        body.temp = temp.max(0.0);
    }
}
