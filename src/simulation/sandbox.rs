//! Interactive sandbox runtime built around a [`System`]
//!
//! `Sandbox` is the runtime bundle constructed from a [`ScenarioConfig`]:
//! it owns the engine settings, numerical parameters, current system state,
//! the active force set, the deterministic RNG and the undo/redo history.
//! Every editing operation (spawn, remove, zones, bonds, barriers, fields,
//! bulk edits) goes through here so it can be recorded as an [`Action`]
//! and undone later.
//!
//! In Bevy terms, this is inserted as a `Resource` and then read by systems
//! responsible for stepping, visualization, diagnostics, etc. `advance`
//! runs one fixed tick of the full pipeline and reports what happened in a
//! [`TickEvents`].

use bevy::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::configuration::config::{
    BodyConfig, BondConfig, PeriodicTriggerConfig, ScenarioConfig, ZoneConfig, ZoneShapeConfig,
};
use crate::simulation::arena::BodyId;
use crate::simulation::barriers::{resolve_barriers, SolidBarrier};
use crate::simulation::bonds::{resolve_bonds, ElasticBond};
use crate::simulation::collision::resolve_collisions;
use crate::simulation::engine::Engine;
use crate::simulation::forces::{
    long_range_accels, null_masks, AccelSet, ExternalAccel, FieldForces, ZoneForces,
};
use crate::simulation::formula::FieldFormula;
use crate::simulation::fragmentation::process_queue;
use crate::simulation::grid::SpatialGrid;
use crate::simulation::history::{Action, ActionHistory};
use crate::simulation::integrator::{finalize_velocities, kick_drift};
use crate::simulation::params::Parameters;
use crate::simulation::states::{radius_for_mass, Body, NVec2, System};
use crate::simulation::thermal::apply_thermal;
use crate::simulation::zones::{
    AnnihilationZone, AnyZone, ChaosZone, FieldZone, NullZone, PeriodicTrigger, PeriodicZone,
    ThermalZone, ViscosityZone, VortexZone, ZoneFamily, ZoneShape, annihilation_pass,
    apply_periodic,
};

/// What one call to [`Sandbox::advance`] did to the world.
#[derive(Debug, Default, Clone)]
pub struct TickEvents {
    pub wrapped: Vec<BodyId>, // teleported by a periodic zone
    pub annihilated: Vec<BodyId>, // consumed by an annihilation zone
    pub expired: Vec<BodyId>, // lifetime ran out
    pub fragmented: Vec<BodyId>, // broke apart (parents, not the debris)
    pub broken_bonds: Vec<u32>, // bonds that snapped under tension
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        self.wrapped.is_empty()
            && self.annihilated.is_empty()
            && self.expired.is_empty()
            && self.fragmented.is_empty()
            && self.broken_bonds.is_empty()
    }
}

/// Force terms every sandbox runs through the [`AccelSet`]: painted
/// accelerations, zone forces and formula fields. Long-range pair forces
/// go through `long_range_accels` instead so the quadtree can serve them.
pub(crate) fn standard_forces() -> AccelSet {
    AccelSet::new()
        .with(ExternalAccel)
        .with(ZoneForces)
        .with(FieldForces)
}

/// Bevy resource representing a fully-initialized interactive sandbox.
#[derive(Resource)]
pub struct Sandbox {
    pub engine: Engine,
    pub parameters: Parameters,
    pub system: System,
    pub forces: AccelSet,
    pub paused: bool,
    history: ActionHistory,
    replaying: bool, // true while undo/redo replays an action
    pub(crate) rng: StdRng,
    grid: SpatialGrid,
    // scratch buffers reused across ticks, indexed by body slot
    accel: Vec<NVec2>,
    prev_pos: Vec<NVec2>,
    masks: Vec<u8>,
    pairs: Vec<(u32, u32)>,
    frag_queue: Vec<BodyId>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(Engine::default(), Parameters::default())
    }
}

impl Sandbox {
    pub fn new(engine: Engine, parameters: Parameters) -> Self {
        let rng = StdRng::seed_from_u64(parameters.seed);
        Self {
            engine,
            parameters,
            system: System::new(),
            forces: standard_forces(),
            paused: false,
            history: ActionHistory::new(),
            replaying: false,
            rng,
            grid: SpatialGrid::new(),
            accel: Vec::new(),
            prev_pos: Vec::new(),
            masks: Vec::new(),
            pairs: Vec::new(),
            frag_queue: Vec::new(),
        }
    }

    pub fn build_scenario(cfg: ScenarioConfig) -> Self {
        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            h0: p_cfg.h0,
            speed_limit: p_cfg.speed_limit,
            eps2: p_cfg.eps2,
            G: p_cfg.G,
            ke: p_cfg.ke,
            km: p_cfg.km,
            c: p_cfg.c,
            gravity: p_cfg.gravity,
            electric: p_cfg.electric,
            magnetic: p_cfg.magnetic,
            fragmentation: p_cfg.fragmentation,
            thermodynamics: p_cfg.thermodynamics,
            sigma: p_cfg.sigma,
            ambient_temp: p_cfg.ambient_temp,
            seed: p_cfg.seed,
            trail_len: p_cfg.trail_len,
        };

        // Engine (runtime) from EngineConfig
        let e_cfg = cfg.engine;
        let engine = Engine {
            barnes_hut: e_cfg.barnes_hut,
            theta: e_cfg.theta.unwrap_or(0.5),
        };

        let mut sandbox = Sandbox::new(engine, parameters);

        // Bodies first: bonds reference them by list index
        let ids: Vec<BodyId> = cfg
            .bodies
            .iter()
            .map(|bc| sandbox.create_body(bc))
            .collect();

        for zc in &cfg.zones {
            sandbox.add_zone_config(zc);
        }
        for bc in &cfg.bonds {
            if let (Some(&a), Some(&b)) = (ids.get(bc.a), ids.get(bc.b)) {
                sandbox.add_elastic_bond(a, b, &bc.params);
            }
        }
        for bar in &cfg.barriers {
            sandbox.add_solid_barrier(
                NVec2::new(bar.a[0], bar.a[1]),
                NVec2::new(bar.b[0], bar.b[1]),
                bar.restitution,
                bar.friction,
            );
        }
        for f in &cfg.fields {
            sandbox.add_field_formula(&f.fx, &f.fy);
        }

        // Initial construction is not undoable
        sandbox.history.clear();
        sandbox
    }

    // tick pipeline ==========================================================

    /// Run one fixed step. `force_step` steps even while paused, for
    /// single-step debugging.
    pub fn advance(&mut self, force_step: bool) -> TickEvents {
        if self.paused && !force_step {
            return TickEvents::default();
        }
        let mut events = TickEvents::default();

        // first Verlet half: kick from last tick's acceleration, then drift
        kick_drift(&mut self.system, &self.parameters, &mut self.prev_pos);

        // broad phase on the drifted positions
        self.grid.build(&self.system.bodies);
        self.grid.pairs(&self.system.bodies, &mut self.pairs);

        // pure force terms: painted accels, zones, formula fields
        let slots = self.system.bodies.slot_count();
        self.accel.resize(slots, NVec2::zeros());
        self.forces
            .accumulate_accels(self.system.t, &self.system, &self.parameters, &mut self.accel);

        // bonds pull, and may snap
        events.broken_bonds = resolve_bonds(&mut self.system, &self.parameters, &mut self.accel);

        // long-range pair forces, direct or through the quadtree
        self.frag_queue.clear();
        null_masks(&self.system, &mut self.masks);
        long_range_accels(
            &self.system,
            &self.engine,
            &self.parameters,
            &self.masks,
            &mut self.accel,
            &mut self.frag_queue,
        );

        // contacts: impulses, elastic repulsion, heating, overload
        resolve_collisions(
            &mut self.system,
            &self.pairs,
            &self.parameters,
            &mut self.accel,
            &mut self.frag_queue,
        );
        resolve_barriers(&mut self.system, &self.prev_pos, &self.parameters);

        // second Verlet half
        finalize_velocities(&mut self.system, &self.parameters, &self.accel);

        apply_thermal(&mut self.system, &self.parameters);

        // zone boundary effects and lifetimes
        apply_periodic(&mut self.system, &mut events.wrapped);
        annihilation_pass(&mut self.system, &mut self.rng, &mut events.annihilated);
        events.expired = self.age_pass();

        // queued breakups last, so debris integrates from the next tick
        let queue = std::mem::take(&mut self.frag_queue);
        events.fragmented = process_queue(&mut self.system, &queue, &self.parameters, &mut self.rng);
        self.frag_queue = queue;

        self.system.tick += 1;
        events
    }

    /// Count down lifetimes and fragmentation cooldowns; remove the expired.
    fn age_pass(&mut self) -> Vec<BodyId> {
        let mut expired = Vec::new();
        for (id, body) in self.system.bodies.iter_mut() {
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
            self.system.despawn(id);
        }
        expired
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    // bodies =================================================================

    pub fn create_body(&mut self, cfg: &BodyConfig) -> BodyId {
        let body = self.realize_body(cfg);
        let id = self.system.bodies.insert(body.clone());
        self.commit(Action::AddBody { id, body });
        id
    }

    /// No-op for stale or unknown ids.
    pub fn remove_body(&mut self, id: BodyId) {
        let bonds = self.system.bonds_of(id);
        let Some(body) = self.system.despawn(id) else {
            return;
        };
        self.commit(Action::RemoveBody { id, body, bonds });
    }

    /// Apply `edit` to one body and record it as an undoable action.
    /// Returns `false` when the id is stale.
    pub fn edit_body(&mut self, id: BodyId, edit: impl FnOnce(&mut Body)) -> bool {
        let Some(body) = self.system.bodies.get_mut(id) else {
            return false;
        };
        let before = body.clone();
        edit(body);
        // keep inv_m consistent when the closure touched the mass
        let m = body.m;
        body.set_mass(m);
        let after = body.clone();
        self.commit(Action::EditBody { id, before, after });
        true
    }

    fn realize_body(&mut self, cfg: &BodyConfig) -> Body {
        let color = match cfg.color {
            Some(c) => c,
            None => hsv_to_rgb(self.rng.gen_range(0.0..360.0), 0.65, 0.95),
        };
        let mut body = Body {
            x: NVec2::new(cfg.x[0], cfg.x[1]),
            v: NVec2::new(cfg.v[0], cfg.v[1]),
            a0: NVec2::new(cfg.a0[0], cfg.a0[1]),
            radius: match cfg.radius {
                Some(r) if r > 0.0 => r,
                _ => radius_for_mass(cfg.m),
            },
            charge: cfg.charge,
            moment: cfg.moment,
            spin: cfg.spin,
            friction: cfg.friction,
            lifetime: cfg.lifetime,
            integrity: cfg.integrity.unwrap_or(f64::INFINITY),
            temp: cfg.temp,
            specific_heat: cfg.specific_heat,
            absorption: cfg.absorption,
            restitution: cfg.restitution.to_curve(),
            stiffness: cfg.stiffness.to_curve(),
            color,
            ..Body::default()
        };
        body.set_mass(cfg.m);
        body
    }

    // zones ==================================================================

    pub fn add_periodic_zone(&mut self, shape: ZoneShape, trigger: PeriodicTrigger) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Periodic(PeriodicZone {
            id,
            enabled: true,
            shape,
            trigger,
        }));
        id
    }

    pub fn add_viscosity_zone(&mut self, shape: ZoneShape, coefficient: f64) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Viscosity(ViscosityZone {
            id,
            enabled: true,
            shape,
            coefficient,
        }));
        id
    }

    pub fn add_field_zone(&mut self, shape: ZoneShape, force: NVec2) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Field(FieldZone {
            id,
            enabled: true,
            shape,
            force,
        }));
        id
    }

    pub fn add_thermal_zone(&mut self, shape: ZoneShape, temperature: f64, transfer: f64) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Thermal(ThermalZone {
            id,
            enabled: true,
            shape,
            temperature,
            transfer,
        }));
        id
    }

    pub fn add_annihilation_zone(&mut self, shape: ZoneShape, burst: bool) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Annihilation(AnnihilationZone {
            id,
            enabled: true,
            shape,
            burst,
        }));
        id
    }

    pub fn add_chaos_zone(
        &mut self,
        shape: ZoneShape,
        strength: f64,
        frequency: f64,
        spatial_scale: f64,
    ) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Chaos(ChaosZone {
            id,
            enabled: true,
            shape,
            strength,
            frequency,
            spatial_scale,
        }));
        id
    }

    pub fn add_vortex_zone(&mut self, shape: ZoneShape, strength: f64) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Vortex(VortexZone {
            id,
            enabled: true,
            shape,
            strength,
        }));
        id
    }

    pub fn add_null_zone(
        &mut self,
        shape: ZoneShape,
        no_gravity: bool,
        no_electric: bool,
        no_magnetic: bool,
    ) -> u32 {
        let id = self.system.alloc_id();
        self.insert_zone(AnyZone::Null(NullZone {
            id,
            enabled: true,
            shape,
            no_gravity,
            no_electric,
            no_magnetic,
        }));
        id
    }

    pub fn remove_periodic_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Periodic, id);
    }

    pub fn remove_viscosity_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Viscosity, id);
    }

    pub fn remove_field_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Field, id);
    }

    pub fn remove_thermal_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Thermal, id);
    }

    pub fn remove_annihilation_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Annihilation, id);
    }

    pub fn remove_chaos_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Chaos, id);
    }

    pub fn remove_vortex_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Vortex, id);
    }

    pub fn remove_null_zone(&mut self, id: u32) {
        self.remove_zone(ZoneFamily::Null, id);
    }

    fn insert_zone(&mut self, zone: AnyZone) {
        self.system.zones.push(zone.clone());
        self.commit(Action::AddZone { zone });
    }

    fn remove_zone(&mut self, family: ZoneFamily, id: u32) {
        if let Some((zone, index)) = self.system.zones.remove(family, id) {
            self.commit(Action::RemoveZone { zone, index });
        }
    }

    fn add_zone_config(&mut self, cfg: &ZoneConfig) {
        let id = self.system.alloc_id();
        let zone = match cfg {
            ZoneConfig::Periodic {
                shape,
                trigger,
                enabled,
            } => AnyZone::Periodic(PeriodicZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                trigger: realize_trigger(*trigger),
            }),
            ZoneConfig::Viscosity {
                shape,
                coefficient,
                enabled,
            } => AnyZone::Viscosity(ViscosityZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                coefficient: *coefficient,
            }),
            ZoneConfig::Field {
                shape,
                force,
                enabled,
            } => AnyZone::Field(FieldZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                force: NVec2::new(force[0], force[1]),
            }),
            ZoneConfig::Thermal {
                shape,
                temperature,
                transfer,
                enabled,
            } => AnyZone::Thermal(ThermalZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                temperature: *temperature,
                transfer: *transfer,
            }),
            ZoneConfig::Annihilation {
                shape,
                burst,
                enabled,
            } => AnyZone::Annihilation(AnnihilationZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                burst: *burst,
            }),
            ZoneConfig::Chaos {
                shape,
                strength,
                frequency,
                spatial_scale,
                enabled,
            } => AnyZone::Chaos(ChaosZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                strength: *strength,
                frequency: *frequency,
                spatial_scale: *spatial_scale,
            }),
            ZoneConfig::Vortex {
                shape,
                strength,
                enabled,
            } => AnyZone::Vortex(VortexZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                strength: *strength,
            }),
            ZoneConfig::Null {
                shape,
                no_gravity,
                no_electric,
                no_magnetic,
                enabled,
            } => AnyZone::Null(NullZone {
                id,
                enabled: *enabled,
                shape: realize_shape(shape),
                no_gravity: *no_gravity,
                no_electric: *no_electric,
                no_magnetic: *no_magnetic,
            }),
        };
        self.insert_zone(zone);
    }

    // bonds, barriers, fields ================================================

    /// Bond two bodies. `None` when either id is stale or `a == b`.
    /// A missing `rest_len` in the config means "use the current distance".
    pub fn add_elastic_bond(&mut self, a: BodyId, b: BodyId, cfg: &BondConfig) -> Option<u32> {
        if a == b {
            return None;
        }
        let pa = self.system.bodies.get(a)?.x;
        let pb = self.system.bodies.get(b)?.x;
        let rest_len = cfg.rest_len.unwrap_or_else(|| (pb - pa).norm());
        let id = self.system.alloc_id();
        let bond = ElasticBond {
            id,
            a,
            b,
            rest_len,
            stiffness: cfg.stiffness,
            damping: cfg.damping,
            nonlinearity: cfg.nonlinearity,
            break_tension: cfg.break_tension,
            amplitude: cfg.amplitude,
            frequency: cfg.frequency,
            rope: cfg.rope,
            enabled: true,
        };
        self.system.bonds.push(bond.clone());
        self.commit(Action::AddBond { bond });
        Some(id)
    }

    pub fn remove_elastic_bond(&mut self, id: u32) {
        let Some(index) = self.system.bonds.iter().position(|b| b.id == id) else {
            return;
        };
        let bond = self.system.bonds.remove(index);
        self.commit(Action::RemoveBond { bond, index });
    }

    pub fn add_solid_barrier(&mut self, a: NVec2, b: NVec2, restitution: f64, friction: f64) -> u32 {
        let id = self.system.alloc_id();
        let barrier = SolidBarrier {
            id,
            a,
            b,
            restitution,
            friction,
            enabled: true,
        };
        self.system.barriers.push(barrier.clone());
        self.commit(Action::AddBarrier { barrier });
        id
    }

    pub fn remove_solid_barrier(&mut self, id: u32) {
        let Some(index) = self.system.barriers.iter().position(|b| b.id == id) else {
            return;
        };
        let barrier = self.system.barriers.remove(index);
        self.commit(Action::RemoveBarrier { barrier, index });
    }

    /// Install a formula force field. A field that fails to parse is kept
    /// (so the editor can show the error) but contributes no force.
    pub fn add_field_formula(&mut self, fx: &str, fy: &str) -> u32 {
        let id = self.system.alloc_id();
        let field = FieldFormula::new(id, fx, fy);
        self.system.fields.push(field.clone());
        self.commit(Action::AddField { field });
        id
    }

    pub fn remove_field_formula(&mut self, id: u32) {
        let Some(index) = self.system.fields.iter().position(|f| f.id == id) else {
            return;
        };
        let field = self.system.fields.remove(index);
        self.commit(Action::RemoveField { field, index });
    }

    // world-wide operations ==================================================

    /// Swap in an empty world. Undo restores the previous one wholesale.
    pub fn reset_world(&mut self) {
        let before = Box::new(self.system.clone());
        self.system = System::new();
        let after = Box::new(self.system.clone());
        self.commit(Action::ResetWorld { before, after });
    }

    pub fn zero_velocities(&mut self) {
        self.bulk_edit("zero velocities", |b| {
            b.v = NVec2::zeros();
        });
    }

    pub fn reverse_velocities(&mut self) {
        self.bulk_edit("reverse velocities", |b| {
            b.v = -b.v;
        });
    }

    pub fn clear_spin(&mut self) {
        self.bulk_edit("clear spin", |b| {
            b.spin = 0.0;
        });
    }

    /// Round every position to the nearest multiple of `spacing`.
    pub fn snap_to_grid(&mut self, spacing: f64) {
        if spacing <= 0.0 {
            return;
        }
        self.bulk_edit("snap to grid", |b| {
            b.x = NVec2::new(
                (b.x.x / spacing).round() * spacing,
                (b.x.y / spacing).round() * spacing,
            );
            b.trail.clear();
        });
    }

    /// Set every movable body's mass to the average movable mass.
    pub fn equalize_masses(&mut self) {
        let mut total = 0.0;
        let mut count = 0usize;
        for (_, b) in self.system.bodies.iter() {
            if !b.is_immovable() {
                total += b.m;
                count += 1;
            }
        }
        if count == 0 {
            return;
        }
        let avg = total / count as f64;
        self.bulk_edit("equalize masses", move |b| {
            if !b.is_immovable() {
                b.m = avg;
            }
        });
    }

    /// Teleport every body to a uniform random point inside the rectangle.
    pub fn scatter_positions(&mut self, min: NVec2, max: NVec2) {
        let lo = NVec2::new(min.x.min(max.x), min.y.min(max.y));
        let hi = NVec2::new(min.x.max(max.x), min.y.max(max.y));
        let rng = &mut self.rng;
        let mut edits = Vec::new();
        for (id, body) in self.system.bodies.iter_mut() {
            let before = body.clone();
            body.x = NVec2::new(rng.gen_range(lo.x..=hi.x), rng.gen_range(lo.y..=hi.y));
            body.trail.clear();
            edits.push((id, before, body.clone()));
        }
        if edits.is_empty() {
            return;
        }
        self.commit(Action::BulkEdit {
            label: "scatter positions".to_string(),
            edits,
            removed: Vec::new(),
        });
    }

    /// Remove every body outside the rectangle, as one undoable action.
    pub fn cull_outside(&mut self, min: NVec2, max: NVec2) {
        let lo = NVec2::new(min.x.min(max.x), min.y.min(max.y));
        let hi = NVec2::new(min.x.max(max.x), min.y.max(max.y));
        let doomed: Vec<BodyId> = self
            .system
            .bodies
            .iter()
            .filter(|(_, b)| b.x.x < lo.x || b.x.x > hi.x || b.x.y < lo.y || b.x.y > hi.y)
            .map(|(id, _)| id)
            .collect();
        // snapshot bonds per body as we go: a bond between two culled bodies
        // cascades with the first and must be recorded only once
        let mut removed = Vec::new();
        for id in doomed {
            let bonds = self.system.bonds_of(id);
            if let Some(body) = self.system.despawn(id) {
                removed.push((id, body, bonds));
            }
        }
        if removed.is_empty() {
            return;
        }
        self.commit(Action::BulkEdit {
            label: "cull outside".to_string(),
            edits: Vec::new(),
            removed,
        });
    }

    /// Apply `edit` to every body and record the lot as one action.
    fn bulk_edit(&mut self, label: &str, mut edit: impl FnMut(&mut Body)) {
        let mut edits = Vec::new();
        for (id, body) in self.system.bodies.iter_mut() {
            let before = body.clone();
            edit(body);
            let m = body.m;
            body.set_mass(m);
            edits.push((id, before, body.clone()));
        }
        if edits.is_empty() {
            return;
        }
        self.commit(Action::BulkEdit {
            label: label.to_string(),
            edits,
            removed: Vec::new(),
        });
    }

    // undo/redo ==============================================================

    pub fn undo(&mut self) -> bool {
        let Some(action) = self.history.undo().cloned() else {
            return false;
        };
        self.replaying = true;
        self.revert_action(&action);
        self.replaying = false;
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(action) = self.history.redo().cloned() else {
            return false;
        };
        self.replaying = true;
        self.apply_action(&action);
        self.replaying = false;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    fn commit(&mut self, action: Action) {
        if !self.replaying {
            self.history.push(action);
        }
    }

    /// Redo an action's effect. Ids inside the action stay valid because
    /// the arena restores bodies under their original generation.
    fn apply_action(&mut self, action: &Action) {
        match action {
            Action::AddBody { id, body } => {
                self.system.bodies.restore(*id, body.clone());
            }
            Action::RemoveBody { id, .. } => {
                self.system.despawn(*id);
            }
            Action::EditBody { id, after, .. } => {
                if let Some(b) = self.system.bodies.get_mut(*id) {
                    *b = after.clone();
                }
            }
            Action::AddZone { zone } => {
                self.system.zones.push(zone.clone());
            }
            Action::RemoveZone { zone, .. } => {
                self.system.zones.remove(zone.family(), zone.id());
            }
            Action::AddBond { bond } => {
                self.system.bonds.push(bond.clone());
            }
            Action::RemoveBond { bond, .. } => {
                self.system.bonds.retain(|b| b.id != bond.id);
            }
            Action::AddBarrier { barrier } => {
                self.system.barriers.push(barrier.clone());
            }
            Action::RemoveBarrier { barrier, .. } => {
                self.system.barriers.retain(|b| b.id != barrier.id);
            }
            Action::AddField { field } => {
                self.system.fields.push(field.clone());
            }
            Action::RemoveField { field, .. } => {
                self.system.fields.retain(|f| f.id != field.id);
            }
            Action::BulkEdit { edits, removed, .. } => {
                for (id, _, after) in edits {
                    if let Some(b) = self.system.bodies.get_mut(*id) {
                        *b = after.clone();
                    }
                }
                for (id, _, _) in removed {
                    self.system.despawn(*id);
                }
            }
            Action::ResetWorld { after, .. } => {
                self.system = (**after).clone();
            }
        }
    }

    fn revert_action(&mut self, action: &Action) {
        match action {
            Action::AddBody { id, .. } => {
                self.system.despawn(*id);
            }
            Action::RemoveBody { id, body, bonds } => {
                self.system.bodies.restore(*id, body.clone());
                for (index, bond) in bonds {
                    let at = (*index).min(self.system.bonds.len());
                    self.system.bonds.insert(at, bond.clone());
                }
            }
            Action::EditBody { id, before, .. } => {
                if let Some(b) = self.system.bodies.get_mut(*id) {
                    *b = before.clone();
                }
            }
            Action::AddZone { zone } => {
                self.system.zones.remove(zone.family(), zone.id());
            }
            Action::RemoveZone { zone, index } => {
                self.system.zones.insert_at(zone.clone(), *index);
            }
            Action::AddBond { bond } => {
                self.system.bonds.retain(|b| b.id != bond.id);
            }
            Action::RemoveBond { bond, index } => {
                let at = (*index).min(self.system.bonds.len());
                self.system.bonds.insert(at, bond.clone());
            }
            Action::AddBarrier { barrier } => {
                self.system.barriers.retain(|b| b.id != barrier.id);
            }
            Action::RemoveBarrier { barrier, index } => {
                let at = (*index).min(self.system.barriers.len());
                self.system.barriers.insert(at, barrier.clone());
            }
            Action::AddField { field } => {
                self.system.fields.retain(|f| f.id != field.id);
            }
            Action::RemoveField { field, index } => {
                let at = (*index).min(self.system.fields.len());
                self.system.fields.insert(at, field.clone());
            }
            Action::BulkEdit { edits, removed, .. } => {
                // restore removals newest-first so bond endpoints exist again
                // before their bonds are re-inserted
                for (id, body, bonds) in removed.iter().rev() {
                    self.system.bodies.restore(*id, body.clone());
                    for (index, bond) in bonds {
                        let at = (*index).min(self.system.bonds.len());
                        self.system.bonds.insert(at, bond.clone());
                    }
                }
                for (id, before, _) in edits {
                    if let Some(b) = self.system.bodies.get_mut(*id) {
                        *b = before.clone();
                    }
                }
            }
            Action::ResetWorld { before, .. } => {
                self.system = (**before).clone();
            }
        }
    }
}

// helpers ====================================================================

fn realize_shape(cfg: &ZoneShapeConfig) -> ZoneShape {
    match cfg {
        ZoneShapeConfig::Rect { min, max } => ZoneShape::Rect {
            min: NVec2::new(min[0], min[1]),
            max: NVec2::new(max[0], max[1]),
        },
        ZoneShapeConfig::Circle { center, radius } => ZoneShape::Circle {
            center: NVec2::new(center[0], center[1]),
            radius: *radius,
        },
    }
}

fn realize_trigger(cfg: PeriodicTriggerConfig) -> PeriodicTrigger {
    match cfg {
        PeriodicTriggerConfig::Center => PeriodicTrigger::Center,
        PeriodicTriggerConfig::Radius => PeriodicTrigger::Radius,
    }
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f32; 3] {
    let c = v * s;
    let hp = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [(r + m) as f32, (g + m) as f32, (b + m) as f32]
}
