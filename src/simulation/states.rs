//! Core state types for the sandbox engine.
//!
//! Defines the 2D body record with its mechanical, electromagnetic and
//! thermal state, the temperature-dependent material curves, and `System`,
//! the container holding every simulated collection (bodies, zones, bonds,
//! barriers, field formulas) plus the current time.

use std::collections::VecDeque;

use nalgebra::Vector2;

use crate::simulation::arena::{BodyArena, BodyId};
use crate::simulation::barriers::SolidBarrier;
use crate::simulation::bonds::ElasticBond;
use crate::simulation::formula::FieldFormula;
use crate::simulation::zones::Zones;

pub type NVec2 = Vector2<f64>;

/// Counterclockwise perpendicular.
pub fn perp(v: NVec2) -> NVec2 {
    NVec2::new(-v.y, v.x)
}

/// Scalar 2D cross product.
pub fn cross2(a: NVec2, b: NVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Mass value (and below) treated as the immovable sentinel.
pub const IMMOVABLE_MASS: f64 = -1.0;

/// Temperature-dependent material property.
///
/// Blends between a cold and a hot asymptote with a logistic curve around
/// `critical_temp`:
/// `S = 1 / (1 + exp(sharpness * (T - critical_temp)))`,
/// `value = hot + (cold - hot) * S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialCurve {
    pub cold: f64, // value well below the critical temperature
    pub hot: f64, // asymptote well above it
    pub critical_temp: f64, // blend midpoint
    pub sharpness: f64, // transition steepness
}

impl MaterialCurve {
    pub fn flat(value: f64) -> Self {
        Self {
            cold: value,
            hot: value,
            critical_temp: 0.0,
            sharpness: 0.0,
        }
    }

    /// Effective value at temperature `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        self.hot + (self.cold - self.hot) * self.blend_at(t)
    }

    /// Logistic blend factor alone, 1 when cold, 0 when hot. A sharpness
    /// of zero disables the transition and the curve stays at `cold`.
    pub fn blend_at(&self, t: f64) -> f64 {
        if self.sharpness <= 0.0 {
            return 1.0;
        }
        1.0 / (1.0 + (self.sharpness * (t - self.critical_temp)).exp())
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub x: NVec2, // position
    pub v: NVec2, // velocity
    pub a: NVec2, // acceleration, rebuilt every tick
    pub a0: NVec2, // constant external acceleration
    pub m: f64, // mass; <= 0 means immovable
    pub inv_m: f64, // 1/m, 0 for immovable
    pub radius: f64,
    pub charge: f64, // electric charge
    pub moment: f64, // magnetic moment
    pub angle: f64, // rotation angle
    pub spin: f64, // angular speed
    pub friction: f64, // Coulomb friction coefficient
    pub lifetime: Option<u64>, // remaining ticks, None = infinite
    pub integrity: f64, // impulse threshold before breakup
    pub temp: f64, // temperature
    pub specific_heat: f64,
    pub absorption: f64, // fraction of collision heat absorbed
    pub restitution: MaterialCurve,
    pub stiffness: MaterialCurve,
    pub trail: VecDeque<NVec2>, // recent positions, bounded
    pub frag_cooldown: u64, // ticks until the body may fragment again
    pub color: [f32; 3], // display color
}

impl Body {
    pub fn is_immovable(&self) -> bool {
        self.inv_m == 0.0
    }

    /// Mass used by gravity: immovable bodies pull with substituted mass 1.
    pub fn grav_mass(&self) -> f64 {
        if self.is_immovable() {
            1.0
        } else {
            self.m
        }
    }

    /// Set mass and keep the inverse-mass invariant.
    pub fn set_mass(&mut self, m: f64) {
        self.m = m;
        self.inv_m = if m <= 0.0 { 0.0 } else { 1.0 / m };
    }

    /// Current restitution at the body temperature.
    pub fn restitution_now(&self) -> f64 {
        self.restitution.value_at(self.temp)
    }

    /// Current stiffness at the body temperature.
    pub fn stiffness_now(&self) -> f64 {
        self.stiffness.value_at(self.temp)
    }

    /// Integrity threshold weakened by heat, via the stiffness blend.
    pub fn integrity_now(&self) -> f64 {
        self.integrity * self.stiffness.blend_at(self.temp)
    }

    /// Inverse rotational inertia of a uniform disk.
    pub fn inv_inertia(&self) -> f64 {
        if self.radius > 0.0 {
            2.0 * self.inv_m / (self.radius * self.radius)
        } else {
            0.0
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self {
            x: NVec2::zeros(),
            v: NVec2::zeros(),
            a: NVec2::zeros(),
            a0: NVec2::zeros(),
            m: 1.0,
            inv_m: 1.0,
            radius: 1.0,
            charge: 0.0,
            moment: 0.0,
            angle: 0.0,
            spin: 0.0,
            friction: 0.3,
            lifetime: None,
            integrity: f64::INFINITY, // breakup is opt-in
            temp: 293.0,
            specific_heat: 1000.0,
            absorption: 0.5,
            restitution: MaterialCurve::flat(0.8),
            stiffness: MaterialCurve::flat(1.0e4),
            trail: VecDeque::new(),
            frag_cooldown: 0,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Radius fallback when a config omits it or gives a non-positive value.
pub fn radius_for_mass(m: f64) -> f64 {
    m.abs().cbrt().max(0.5)
}

/// Everything the simulation mutates, owned in one place.
#[derive(Debug, Clone)]
pub struct System {
    pub bodies: BodyArena,
    pub zones: Zones,
    pub bonds: Vec<ElasticBond>,
    pub barriers: Vec<SolidBarrier>,
    pub fields: Vec<FieldFormula>,
    pub t: f64, // time
    pub tick: u64, // completed fixed steps
    pub next_id: u32, // shared id counter for zones/bonds/barriers/fields
}

impl System {
    pub fn new() -> Self {
        Self {
            bodies: BodyArena::new(),
            zones: Zones::default(),
            barriers: Vec::new(),
            bonds: Vec::new(),
            fields: Vec::new(),
            t: 0.0,
            tick: 0,
            next_id: 1,
        }
    }

    pub fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Remove a body together with every bond anchored to it.
    pub fn despawn(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(id)?;
        self.bonds.retain(|b| b.a != id && b.b != id);
        Some(body)
    }

    /// Bonds referencing `id`, with their list indices, oldest first.
    /// Used to snapshot the cascade before a tracked removal.
    pub fn bonds_of(&self, id: BodyId) -> Vec<(usize, ElasticBond)> {
        self.bonds
            .iter()
            .enumerate()
            .filter(|(_, b)| b.a == id || b.b == id)
            .map(|(i, b)| (i, b.clone()))
            .collect()
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}
