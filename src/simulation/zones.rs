//! Zone families and their per-tick side effects
//!
//! Eight families share the same skeleton (id, enabled flag, shape) and add
//! family-specific parameters. Force-producing families (viscosity, field,
//! chaos, vortex) are read by the acceleration terms in `forces`; this
//! module owns the membership tests plus the passes that move or remove
//! bodies directly: periodic wrapping and annihilation.

use rand::rngs::StdRng;
use rand::Rng;

use crate::simulation::arena::BodyId;
use crate::simulation::fragmentation::burst_fragment;
use crate::simulation::states::{NVec2, System};

/// Axis-aligned rectangle (extents may be infinite) or circle.
#[derive(Debug, Clone, Copy)]
pub enum ZoneShape {
    Rect { min: NVec2, max: NVec2 },
    Circle { center: NVec2, radius: f64 },
}

impl ZoneShape {
    pub fn contains(&self, p: NVec2) -> bool {
        match *self {
            ZoneShape::Rect { min, max } => {
                p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
            }
            ZoneShape::Circle { center, radius } => (p - center).norm_squared() <= radius * radius,
        }
    }

    /// Whole disk of radius `r` around `p` inside the shape.
    pub fn contains_disk(&self, p: NVec2, r: f64) -> bool {
        match *self {
            ZoneShape::Rect { min, max } => {
                p.x - r >= min.x && p.x + r <= max.x && p.y - r >= min.y && p.y + r <= max.y
            }
            ZoneShape::Circle { center, radius } => (p - center).norm() + r <= radius,
        }
    }

    /// Geometric center; infinite extents collapse to 0 on that axis.
    pub fn center(&self) -> NVec2 {
        match *self {
            ZoneShape::Rect { min, max } => {
                let mid = |a: f64, b: f64| {
                    let m = 0.5 * (a + b);
                    if m.is_finite() {
                        m
                    } else {
                        0.0
                    }
                };
                NVec2::new(mid(min.x, max.x), mid(min.y, max.y))
            }
            ZoneShape::Circle { center, .. } => center,
        }
    }
}

/// How a periodic zone decides that a body crossed its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicTrigger {
    Center, // body center crosses the edge
    Radius, // edge offset by the body radius, so the body is fully out
}

#[derive(Debug, Clone)]
pub struct PeriodicZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub trigger: PeriodicTrigger,
}

#[derive(Debug, Clone)]
pub struct ViscosityZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub coefficient: f64, // linear drag: F = -v * coefficient
}

#[derive(Debug, Clone)]
pub struct FieldZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub force: NVec2, // applied as acceleration while inside
}

#[derive(Debug, Clone)]
pub struct ThermalZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub temperature: f64, // relaxation target
    pub transfer: f64, // heat transfer coefficient
}

#[derive(Debug, Clone)]
pub struct AnnihilationZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub burst: bool, // spawn a particle burst before removal
}

#[derive(Debug, Clone)]
pub struct ChaosZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub strength: f64, // acceleration scale of the noise field
    pub frequency: f64, // temporal lattice rate
    pub spatial_scale: f64, // lattice cell size
}

#[derive(Debug, Clone)]
pub struct VortexZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub strength: f64, // swirl scale, accel = strength / (distance + 10)
}

#[derive(Debug, Clone)]
pub struct NullZone {
    pub id: u32,
    pub enabled: bool,
    pub shape: ZoneShape,
    pub no_gravity: bool,
    pub no_electric: bool,
    pub no_magnetic: bool,
}

/// Null-mask bits, one per long-range force type.
pub const NULL_GRAVITY: u8 = 1;
pub const NULL_ELECTRIC: u8 = 2;
pub const NULL_MAGNETIC: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneFamily {
    Periodic,
    Viscosity,
    Field,
    Thermal,
    Annihilation,
    Chaos,
    Vortex,
    Null,
}

/// A zone of any family, used by the action history.
#[derive(Debug, Clone)]
pub enum AnyZone {
    Periodic(PeriodicZone),
    Viscosity(ViscosityZone),
    Field(FieldZone),
    Thermal(ThermalZone),
    Annihilation(AnnihilationZone),
    Chaos(ChaosZone),
    Vortex(VortexZone),
    Null(NullZone),
}

impl AnyZone {
    pub fn id(&self) -> u32 {
        match self {
            AnyZone::Periodic(z) => z.id,
            AnyZone::Viscosity(z) => z.id,
            AnyZone::Field(z) => z.id,
            AnyZone::Thermal(z) => z.id,
            AnyZone::Annihilation(z) => z.id,
            AnyZone::Chaos(z) => z.id,
            AnyZone::Vortex(z) => z.id,
            AnyZone::Null(z) => z.id,
        }
    }

    pub fn family(&self) -> ZoneFamily {
        match self {
            AnyZone::Periodic(_) => ZoneFamily::Periodic,
            AnyZone::Viscosity(_) => ZoneFamily::Viscosity,
            AnyZone::Field(_) => ZoneFamily::Field,
            AnyZone::Thermal(_) => ZoneFamily::Thermal,
            AnyZone::Annihilation(_) => ZoneFamily::Annihilation,
            AnyZone::Chaos(_) => ZoneFamily::Chaos,
            AnyZone::Vortex(_) => ZoneFamily::Vortex,
            AnyZone::Null(_) => ZoneFamily::Null,
        }
    }
}

/// All zone lists, one `Vec` per family.
#[derive(Debug, Clone, Default)]
pub struct Zones {
    pub periodic: Vec<PeriodicZone>,
    pub viscosity: Vec<ViscosityZone>,
    pub field: Vec<FieldZone>,
    pub thermal: Vec<ThermalZone>,
    pub annihilation: Vec<AnnihilationZone>,
    pub chaos: Vec<ChaosZone>,
    pub vortex: Vec<VortexZone>,
    pub null: Vec<NullZone>,
}

impl Zones {
    pub fn push(&mut self, zone: AnyZone) {
        match zone {
            AnyZone::Periodic(z) => self.periodic.push(z),
            AnyZone::Viscosity(z) => self.viscosity.push(z),
            AnyZone::Field(z) => self.field.push(z),
            AnyZone::Thermal(z) => self.thermal.push(z),
            AnyZone::Annihilation(z) => self.annihilation.push(z),
            AnyZone::Chaos(z) => self.chaos.push(z),
            AnyZone::Vortex(z) => self.vortex.push(z),
            AnyZone::Null(z) => self.null.push(z),
        }
    }

    /// Re-insert a zone at its original index, for undo of a removal.
    pub fn insert_at(&mut self, zone: AnyZone, index: usize) {
        fn put<T>(list: &mut Vec<T>, index: usize, z: T) {
            let at = index.min(list.len());
            list.insert(at, z);
        }
        match zone {
            AnyZone::Periodic(z) => put(&mut self.periodic, index, z),
            AnyZone::Viscosity(z) => put(&mut self.viscosity, index, z),
            AnyZone::Field(z) => put(&mut self.field, index, z),
            AnyZone::Thermal(z) => put(&mut self.thermal, index, z),
            AnyZone::Annihilation(z) => put(&mut self.annihilation, index, z),
            AnyZone::Chaos(z) => put(&mut self.chaos, index, z),
            AnyZone::Vortex(z) => put(&mut self.vortex, index, z),
            AnyZone::Null(z) => put(&mut self.null, index, z),
        }
    }

    /// Remove by family and id; returns the zone and its index, `None` for
    /// unknown ids.
    pub fn remove(&mut self, family: ZoneFamily, id: u32) -> Option<(AnyZone, usize)> {
        fn take<T>(list: &mut Vec<T>, id: u32, get_id: impl Fn(&T) -> u32) -> Option<(T, usize)> {
            let index = list.iter().position(|z| get_id(z) == id)?;
            Some((list.remove(index), index))
        }
        match family {
            ZoneFamily::Periodic => {
                take(&mut self.periodic, id, |z| z.id).map(|(z, i)| (AnyZone::Periodic(z), i))
            }
            ZoneFamily::Viscosity => {
                take(&mut self.viscosity, id, |z| z.id).map(|(z, i)| (AnyZone::Viscosity(z), i))
            }
            ZoneFamily::Field => {
                take(&mut self.field, id, |z| z.id).map(|(z, i)| (AnyZone::Field(z), i))
            }
            ZoneFamily::Thermal => {
                take(&mut self.thermal, id, |z| z.id).map(|(z, i)| (AnyZone::Thermal(z), i))
            }
            ZoneFamily::Annihilation => take(&mut self.annihilation, id, |z| z.id)
                .map(|(z, i)| (AnyZone::Annihilation(z), i)),
            ZoneFamily::Chaos => {
                take(&mut self.chaos, id, |z| z.id).map(|(z, i)| (AnyZone::Chaos(z), i))
            }
            ZoneFamily::Vortex => {
                take(&mut self.vortex, id, |z| z.id).map(|(z, i)| (AnyZone::Vortex(z), i))
            }
            ZoneFamily::Null => {
                take(&mut self.null, id, |z| z.id).map(|(z, i)| (AnyZone::Null(z), i))
            }
        }
    }

    /// Per-force nullification mask for a point.
    pub fn null_mask_at(&self, p: NVec2) -> u8 {
        let mut mask = 0;
        for z in &self.null {
            if !z.enabled || !z.shape.contains(p) {
                continue;
            }
            if z.no_gravity {
                mask |= NULL_GRAVITY;
            }
            if z.no_electric {
                mask |= NULL_ELECTRIC;
            }
            if z.no_magnetic {
                mask |= NULL_MAGNETIC;
            }
        }
        mask
    }

    pub fn any_null_enabled(&self) -> bool {
        self.null.iter().any(|z| z.enabled)
    }
}

/// Teleport bodies that crossed a periodic boundary to the mirrored
/// position. Wrapping clears the trail; wrapped ids are reported so the
/// predictor can flag the discontinuity.
pub fn apply_periodic(sys: &mut System, wrapped: &mut Vec<BodyId>) {
    if sys.zones.periodic.iter().all(|z| !z.enabled) {
        return;
    }
    let zones = sys.zones.periodic.clone();
    for (id, body) in sys.bodies.iter_mut() {
        let mut moved = false;
        for zone in zones.iter().filter(|z| z.enabled) {
            let offset = match zone.trigger {
                PeriodicTrigger::Center => 0.0,
                PeriodicTrigger::Radius => body.radius,
            };
            match zone.shape {
                ZoneShape::Rect { min, max } => {
                    let w = max.x - min.x;
                    if w.is_finite() {
                        if body.x.x < min.x - offset {
                            body.x.x += w;
                            moved = true;
                        } else if body.x.x > max.x + offset {
                            body.x.x -= w;
                            moved = true;
                        }
                    }
                    let h = max.y - min.y;
                    if h.is_finite() {
                        if body.x.y < min.y - offset {
                            body.x.y += h;
                            moved = true;
                        } else if body.x.y > max.y + offset {
                            body.x.y -= h;
                            moved = true;
                        }
                    }
                }
                ZoneShape::Circle { center, radius } => {
                    let d = (body.x - center).norm();
                    if d > radius + offset {
                        body.x = 2.0 * center - body.x;
                        moved = true;
                    }
                }
            }
        }
        if moved {
            body.trail.clear();
            wrapped.push(id);
        }
    }
}

/// Remove bodies fully inside an enabled annihilation zone, spawning a
/// short-lived burst first when the zone asks for one.
pub fn annihilation_pass(sys: &mut System, rng: &mut StdRng, removed: &mut Vec<BodyId>) {
    if sys.zones.annihilation.iter().all(|z| !z.enabled) {
        return;
    }
    let zones = sys.zones.annihilation.clone();
    for id in sys.bodies.live_ids() {
        let Some(body) = sys.bodies.get(id) else {
            continue;
        };
        let hit = zones
            .iter()
            .find(|z| z.enabled && z.shape.contains_disk(body.x, body.radius));
        let Some(zone) = hit else {
            continue;
        };
        // fragments from an earlier burst still carry a cooldown, so a
        // burst zone cannot feed itself forever
        if zone.burst && body.frag_cooldown == 0 {
            let parent = body.clone();
            let count = rng.gen_range(3..=6);
            let share = parent.m.abs().max(1.0) / count as f64;
            for _ in 0..count {
                let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                let speed = rng.gen_range(20.0..120.0);
                let dir = NVec2::new(angle.cos(), angle.sin());
                let mass = share * rng.gen_range(0.5..1.0);
                let frag = burst_fragment(&parent, mass, dir * speed, rng);
                sys.bodies.insert(frag);
            }
        }
        sys.despawn(id);
        removed.push(id);
    }
}

/// Seconds-free exponential relaxation factor, shared by the thermal pass.
pub fn relaxation(t: f64, target: f64, rate: f64, dt: f64) -> f64 {
    let f = (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0);
    t + (target - t) * f
}
