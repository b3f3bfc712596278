use physim::configuration::config::{BodyConfig, BondConfig, MaterialConfig, ScenarioConfig};
use physim::simulation::arena::BodyId;
use physim::simulation::engine::Engine;
use physim::simulation::params::Parameters;
use physim::simulation::sandbox::Sandbox;
use physim::simulation::states::NVec2;
use physim::simulation::zones::{PeriodicTrigger, ZoneShape};

/// Parameters with every optional subsystem switched off, so a test can
/// enable exactly the effect it measures.
pub fn quiet_params() -> Parameters {
    Parameters {
        gravity: false,
        electric: false,
        magnetic: false,
        fragmentation: false,
        thermodynamics: false,
        ..Parameters::default()
    }
}

pub fn gravity_params() -> Parameters {
    Parameters {
        gravity: true,
        ..quiet_params()
    }
}

pub fn sandbox_with(params: Parameters) -> Sandbox {
    Sandbox::new(Engine::default(), params)
}

/// Plain ball config: position, velocity, mass, radius.
pub fn ball(x: f64, y: f64, vx: f64, vy: f64, m: f64, r: f64) -> BodyConfig {
    BodyConfig {
        x: [x, y],
        v: [vx, vy],
        m,
        radius: Some(r),
        friction: 0.0,
        restitution: MaterialConfig::Flat(1.0),
        ..BodyConfig::default()
    }
}

/// Total linear momentum over movable bodies.
pub fn momentum(sb: &Sandbox) -> NVec2 {
    sb.system
        .bodies
        .iter()
        .filter(|(_, b)| !b.is_immovable())
        .fold(NVec2::zeros(), |acc, (_, b)| acc + b.v * b.m)
}

fn rect(min: [f64; 2], max: [f64; 2]) -> ZoneShape {
    ZoneShape::Rect {
        min: NVec2::new(min[0], min[1]),
        max: NVec2::new(max[0], max[1]),
    }
}

fn circle(cx: f64, cy: f64, r: f64) -> ZoneShape {
    ZoneShape::Circle {
        center: NVec2::new(cx, cy),
        radius: r,
    }
}

// ==================================================================================
// Long-range force tests
// ==================================================================================

#[test]
fn mass_ratio_100_to_1_acceleration() {
    let mut sb = sandbox_with(Parameters {
        G: 0.5,
        ..gravity_params()
    });
    let heavy = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 100.0, 1.0));
    let light = sb.create_body(&ball(50.0, 0.0, 0.0, 0.0, 1.0, 1.0));

    sb.advance(false);

    let dv_heavy = sb.system.bodies.get(heavy).unwrap().v.norm();
    let dv_light = sb.system.bodies.get(light).unwrap().v.norm();
    let ratio = dv_light / dv_heavy;
    assert!(
        (ratio - 100.0).abs() < 1e-6,
        "velocity change ratio should equal the mass ratio, got {ratio}"
    );
}

#[test]
fn closed_pair_conserves_momentum() {
    let mut sb = sandbox_with(gravity_params());
    sb.create_body(&ball(-40.0, 0.0, 3.0, 1.0, 3.0, 1.0));
    sb.create_body(&ball(40.0, 5.0, -2.0, 0.5, 5.0, 1.0));

    let before = momentum(&sb);
    for _ in 0..50 {
        sb.advance(false);
    }
    let after = momentum(&sb);

    assert!(
        (after - before).norm() < 1e-9,
        "momentum drifted from {:?} to {:?}",
        before,
        after
    );
}

#[test]
fn immovable_body_anchors_without_moving() {
    let mut sb = sandbox_with(gravity_params());
    let anchor = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, -1.0, 5.0));
    let probe = sb.create_body(&ball(60.0, 0.0, 0.0, 0.0, 1.0, 1.0));

    for _ in 0..60 {
        sb.advance(false);
    }

    let a = sb.system.bodies.get(anchor).unwrap();
    assert_eq!(a.x, NVec2::new(0.0, 0.0), "pinned body must not move");
    assert_eq!(a.v, NVec2::new(0.0, 0.0));

    let p = sb.system.bodies.get(probe).unwrap();
    assert!(
        p.x.x < 60.0,
        "the pinned body still attracts with substituted mass, x = {}",
        p.x.x
    );
}

#[test]
fn like_charges_repel() {
    let mut sb = sandbox_with(Parameters {
        electric: true,
        ..quiet_params()
    });
    let a = sb.create_body(&BodyConfig {
        x: [-20.0, 0.0],
        charge: 2.0,
        ..BodyConfig::default()
    });
    let b = sb.create_body(&BodyConfig {
        x: [20.0, 0.0],
        charge: 2.0,
        ..BodyConfig::default()
    });

    sb.advance(false);

    assert!(sb.system.bodies.get(a).unwrap().v.x < 0.0);
    assert!(sb.system.bodies.get(b).unwrap().v.x > 0.0);
}

#[test]
fn aligned_magnetic_moments_attract() {
    let mut sb = sandbox_with(Parameters {
        magnetic: true,
        ..quiet_params()
    });
    let a = sb.create_body(&BodyConfig {
        x: [-15.0, 0.0],
        moment: 3.0,
        ..BodyConfig::default()
    });
    let b = sb.create_body(&BodyConfig {
        x: [15.0, 0.0],
        moment: 3.0,
        ..BodyConfig::default()
    });

    sb.advance(false);

    assert!(sb.system.bodies.get(a).unwrap().v.x > 0.0);
    assert!(sb.system.bodies.get(b).unwrap().v.x < 0.0);
}

#[test]
fn null_zone_shields_the_receiver_only() {
    let mut sb = sandbox_with(gravity_params());
    let heavy = sb.create_body(&ball(200.0, 0.0, 0.0, 0.0, 500.0, 5.0));
    let probe = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    sb.add_null_zone(circle(0.0, 0.0, 50.0), true, false, false);

    sb.advance(false);

    let p = sb.system.bodies.get(probe).unwrap();
    assert_eq!(p.v, NVec2::zeros(), "gravity is nulled inside the zone");

    let h = sb.system.bodies.get(heavy).unwrap();
    assert!(
        h.v.x < 0.0,
        "the body outside the zone still feels the probe"
    );
}

#[test]
fn quadtree_matches_direct_summation() {
    let build = |barnes_hut: bool| {
        let engine = Engine {
            barnes_hut,
            theta: 0.3,
        };
        let mut sb = Sandbox::new(engine, gravity_params());
        for i in 0..12 {
            let angle = i as f64 * std::f64::consts::TAU / 12.0;
            let r = 150.0 + 20.0 * (i % 3) as f64;
            sb.create_body(&ball(
                r * angle.cos(),
                r * angle.sin(),
                -angle.sin() * 5.0,
                angle.cos() * 5.0,
                2.0 + i as f64 * 0.5,
                1.0,
            ));
        }
        sb
    };

    let mut direct = build(false);
    let mut tree = build(true);
    for _ in 0..10 {
        direct.advance(false);
        tree.advance(false);
    }

    for ((_, a), (_, b)) in direct.system.bodies.iter().zip(tree.system.bodies.iter()) {
        assert!(
            (a.x - b.x).norm() < 0.5,
            "tree approximation strayed: {:?} vs {:?}",
            a.x,
            b.x
        );
    }
}

// ==================================================================================
// Collision and barrier tests
// ==================================================================================

#[test]
fn elastic_collision_conserves_momentum_and_separates() {
    let mut sb = sandbox_with(quiet_params());
    let a = sb.create_body(&ball(-20.0, 0.0, 30.0, 0.0, 2.0, 5.0));
    let b = sb.create_body(&ball(20.0, 0.0, -30.0, 0.0, 2.0, 5.0));

    let before = momentum(&sb);
    for _ in 0..120 {
        sb.advance(false);
    }
    let after = momentum(&sb);
    assert!((after - before).norm() < 1e-6, "contact impulses must cancel");

    let pa = sb.system.bodies.get(a).unwrap();
    let pb = sb.system.bodies.get(b).unwrap();
    assert!(pa.v.x < 0.0 && pb.v.x > 0.0, "equal masses bounce back");
    assert!(
        (pb.x.x - pa.x.x) > 10.0,
        "bodies separated after the contact"
    );
}

#[test]
fn barrier_with_unit_restitution_mirrors_normal_velocity() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(0.0, 30.0, 0.0, -50.0, 1.0, 5.0));
    sb.add_solid_barrier(NVec2::new(-100.0, 0.0), NVec2::new(100.0, 0.0), 1.0, 0.0);

    for _ in 0..40 {
        sb.advance(false);
    }

    let body = sb.system.bodies.get(id).unwrap();
    assert!(
        (body.v.y - 50.0).abs() < 1e-6,
        "normal component reflects exactly, vy = {}",
        body.v.y
    );
    assert_eq!(body.v.x, 0.0, "no tangential change without friction");
    assert!(body.x.y > 0.0, "body stays on its side of the barrier");
}

#[test]
fn inelastic_collision_heats_both_bodies() {
    let mut sb = sandbox_with(Parameters {
        thermodynamics: true,
        ambient_temp: Some(293.0),
        ..quiet_params()
    });
    let soft = BodyConfig {
        restitution: MaterialConfig::Flat(0.1),
        temp: 293.0,
        ..BodyConfig::default()
    };
    let a = sb.create_body(&BodyConfig {
        x: [-15.0, 0.0],
        v: [80.0, 0.0],
        m: 3.0,
        radius: Some(5.0),
        ..soft.clone()
    });
    let b = sb.create_body(&BodyConfig {
        x: [15.0, 0.0],
        v: [-80.0, 0.0],
        m: 3.0,
        radius: Some(5.0),
        ..soft
    });

    for _ in 0..30 {
        sb.advance(false);
    }

    assert!(
        sb.system.bodies.get(a).unwrap().temp > 293.0,
        "impact heat raised the temperature"
    );
    assert!(sb.system.bodies.get(b).unwrap().temp > 293.0);
}

#[test]
fn overloaded_impact_shatters_and_conserves_mass() {
    let mut sb = sandbox_with(Parameters {
        fragmentation: true,
        ..quiet_params()
    });
    let brittle = |x: f64, vx: f64| BodyConfig {
        x: [x, 0.0],
        v: [vx, 0.0],
        m: 30.0,
        radius: Some(6.0),
        integrity: Some(10.0),
        ..BodyConfig::default()
    };
    sb.create_body(&brittle(-20.0, 120.0));
    sb.create_body(&brittle(20.0, -120.0));

    let total_before: f64 = sb.system.bodies.iter().map(|(_, b)| b.m).sum();
    let mut shattered = Vec::new();
    for _ in 0..30 {
        let events = sb.advance(false);
        shattered.extend(events.fragmented);
        if !shattered.is_empty() {
            break;
        }
    }

    assert!(!shattered.is_empty(), "the impulse exceeds integrity");
    for id in &shattered {
        assert!(sb.system.bodies.get(*id).is_none(), "parents are removed");
    }
    assert!(
        sb.system.bodies.len() >= 3,
        "each parent leaves at least two fragments"
    );
    let total_after: f64 = sb.system.bodies.iter().map(|(_, b)| b.m).sum();
    assert!(
        (total_after - total_before).abs() < 1e-6,
        "fragment masses sum to the parents: {total_before} -> {total_after}"
    );
}

// ==================================================================================
// Zone tests
// ==================================================================================

#[test]
fn periodic_rect_wraps_on_schedule() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(0.0, 0.0, 80.0, 0.0, 1.0, 1.0));
    sb.add_periodic_zone(rect([-100.0, -100.0], [100.0, 100.0]), PeriodicTrigger::Center);

    // x exceeds +100 once 80 * h0 * k > 100, i.e. on tick 79 for h0 = 0.016
    let mut wrap_tick = None;
    for tick in 1..=120u64 {
        let events = sb.advance(false);
        if events.wrapped.contains(&id) {
            wrap_tick = Some(tick);
            break;
        }
    }

    let tick = wrap_tick.expect("the body must wrap");
    assert!(
        (78..=80).contains(&tick),
        "expected the wrap near tick 79, got {tick}"
    );
    let body = sb.system.bodies.get(id).unwrap();
    assert!(body.x.x < 0.0, "position teleported across the box");
    assert!(body.trail.is_empty(), "trail is cut at the seam");
}

#[test]
fn periodic_circle_reflects_through_center() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(49.0, 0.0, 100.0, 0.0, 1.0, 1.0));
    sb.add_periodic_zone(circle(0.0, 0.0, 50.0), PeriodicTrigger::Center);

    let events = sb.advance(false);
    assert!(events.wrapped.contains(&id));

    let body = sb.system.bodies.get(id).unwrap();
    assert!(
        (body.x.x - -50.6).abs() < 1e-9,
        "wrapped to the antipode, x = {}",
        body.x.x
    );
    assert_eq!(body.v.x, 100.0, "velocity is untouched by the wrap");
}

#[test]
fn annihilation_zone_consumes_bodies() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(0.0, 0.0, 100.0, 0.0, 1.0, 1.0));
    sb.add_annihilation_zone(circle(60.0, 0.0, 10.0), false);

    let mut gone = false;
    for _ in 0..60 {
        let events = sb.advance(false);
        if events.annihilated.contains(&id) {
            gone = true;
            break;
        }
    }
    assert!(gone, "the body flies into the zone and is consumed");
    assert!(sb.system.bodies.get(id).is_none());
}

#[test]
fn thermal_zone_pulls_temperature_toward_target() {
    let mut sb = sandbox_with(Parameters {
        thermodynamics: true,
        ..quiet_params()
    });
    let id = sb.create_body(&BodyConfig {
        temp: 293.0,
        ..BodyConfig::default()
    });
    sb.add_thermal_zone(circle(0.0, 0.0, 100.0), 1200.0, 2.0);

    let mut last = 293.0;
    for _ in 0..100 {
        sb.advance(false);
        let t = sb.system.bodies.get(id).unwrap().temp;
        assert!(t >= last - 1e-9, "relaxation is monotonic, {last} -> {t}");
        last = t;
    }
    assert!(last > 400.0, "the zone heated the body, t = {last}");
    assert!(last < 1200.0, "never overshoots the target");
}

#[test]
fn viscosity_zone_bleeds_speed() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(0.0, 0.0, 100.0, 0.0, 1.0, 1.0));
    sb.add_viscosity_zone(rect([-1000.0, -1000.0], [1000.0, 1000.0]), 2.0);

    for _ in 0..50 {
        sb.advance(false);
    }
    let speed = sb.system.bodies.get(id).unwrap().v.norm();
    assert!(speed < 50.0, "drag halves the speed well within 50 ticks");
    assert!(speed > 0.0, "drag never reverses the motion");
}

#[test]
fn field_zone_applies_constant_acceleration() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&BodyConfig::default());
    sb.add_field_zone(rect([-100.0, -100.0], [100.0, 100.0]), NVec2::new(0.0, 30.0));

    sb.advance(false);
    let vy = sb.system.bodies.get(id).unwrap().v.y;
    assert!(
        (vy - 0.5 * 0.016 * 30.0).abs() < 1e-12,
        "first tick gets the closing half-kick, vy = {vy}"
    );
}

#[test]
fn vortex_zone_curves_the_path() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(50.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    sb.add_vortex_zone(circle(0.0, 0.0, 200.0), 2000.0);

    for _ in 0..30 {
        sb.advance(false);
    }
    let v = sb.system.bodies.get(id).unwrap().v;
    assert!(
        v.y.abs() > 1e-3,
        "the swirl has a tangential component, v = {:?}",
        v
    );
    assert!(v.x < 0.0, "and a radial pull inward");
}

#[test]
fn chaos_zone_is_deterministic_per_seed() {
    let run = |seed: u64| {
        let mut sb = sandbox_with(Parameters {
            seed,
            ..quiet_params()
        });
        let id = sb.create_body(&ball(5.0, -3.0, 0.0, 0.0, 1.0, 1.0));
        sb.add_chaos_zone(rect([-500.0, -500.0], [500.0, 500.0]), 400.0, 2.0, 60.0);
        for _ in 0..40 {
            sb.advance(false);
        }
        sb.system.bodies.get(id).unwrap().x
    };

    assert_eq!(run(9), run(9), "same seed, same dance");
    assert_ne!(run(9), run(10), "different seed, different dance");
}

// ==================================================================================
// Bond tests
// ==================================================================================

#[test]
fn bond_snaps_within_one_tick_of_overtension() {
    let mut sb = sandbox_with(quiet_params());
    // huge masses barely move, so the stretch (and the tension) persists
    let a = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 1.0e9, 1.0));
    let b = sb.create_body(&ball(30.0, 0.0, 0.0, 0.0, 1.0e9, 1.0));
    let bond_id = sb
        .add_elastic_bond(
            a,
            b,
            &BondConfig {
                rest_len: Some(10.0),
                stiffness: 100.0,
                break_tension: 500.0,
                ..BondConfig::default()
            },
        )
        .unwrap();

    let events = sb.advance(false);
    assert_eq!(
        events.broken_bonds,
        vec![bond_id],
        "tension 100 * 20 exceeds the 500 threshold immediately"
    );
    assert!(sb.system.bonds.is_empty());
}

#[test]
fn bond_pulls_stretched_pair_together() {
    let mut sb = sandbox_with(quiet_params());
    let a = sb.create_body(&ball(-20.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    let b = sb.create_body(&ball(20.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    sb.add_elastic_bond(
        a,
        b,
        &BondConfig {
            rest_len: Some(20.0),
            stiffness: 50.0,
            damping: 2.0,
            ..BondConfig::default()
        },
    );

    for _ in 0..200 {
        sb.advance(false);
    }
    let dist = (sb.system.bodies.get(b).unwrap().x - sb.system.bodies.get(a).unwrap().x).norm();
    assert!(
        dist < 35.0,
        "the overstretched bond contracts, distance = {dist}"
    );
}

#[test]
fn rope_bond_goes_slack_under_compression() {
    let mut sb = sandbox_with(quiet_params());
    let a = sb.create_body(&ball(-10.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    let b = sb.create_body(&ball(10.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    sb.add_elastic_bond(
        a,
        b,
        &BondConfig {
            rest_len: Some(50.0),
            stiffness: 80.0,
            rope: true,
            ..BondConfig::default()
        },
    );

    for _ in 0..30 {
        sb.advance(false);
    }
    assert!(
        sb.system.bodies.get(a).unwrap().v.norm() < 1e-9,
        "a rope shorter than rest length exerts nothing"
    );
}

// ==================================================================================
// Formula field tests
// ==================================================================================

#[test]
fn formula_field_moves_charges_only() {
    let mut sb = sandbox_with(quiet_params());
    let charged = sb.create_body(&BodyConfig {
        x: [0.0, 0.0],
        charge: 2.0,
        ..BodyConfig::default()
    });
    let neutral = sb.create_body(&BodyConfig {
        x: [40.0, 0.0],
        ..BodyConfig::default()
    });
    sb.add_field_formula("10", "0");

    sb.advance(false);

    assert!(
        sb.system.bodies.get(charged).unwrap().v.x > 0.0,
        "the field couples through charge"
    );
    assert_eq!(
        sb.system.bodies.get(neutral).unwrap().v,
        NVec2::zeros(),
        "neutral bodies ignore formula fields"
    );
}

#[test]
fn broken_formula_is_kept_but_inert() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&BodyConfig {
        charge: 5.0,
        ..BodyConfig::default()
    });
    sb.add_field_formula("1 +", "0");

    assert_eq!(sb.system.fields.len(), 1);
    assert!(!sb.system.fields[0].is_valid());
    assert!(sb.system.fields[0].error.is_some());

    sb.advance(false);
    assert_eq!(
        sb.system.bodies.get(id).unwrap().v,
        NVec2::zeros(),
        "a field that failed to parse exerts nothing"
    );
}

// ==================================================================================
// Lifecycle tests
// ==================================================================================

#[test]
fn lifetime_expires_on_schedule() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&BodyConfig {
        lifetime: Some(3),
        ..BodyConfig::default()
    });

    assert!(sb.advance(false).expired.is_empty());
    assert!(sb.advance(false).expired.is_empty());
    let events = sb.advance(false);
    assert_eq!(events.expired, vec![id], "three ticks of life, then gone");
    assert!(sb.system.bodies.get(id).is_none());
}

#[test]
fn removal_is_idempotent() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&BodyConfig::default());

    sb.remove_body(id);
    let after_first = sb.undo_count();
    sb.remove_body(id);

    assert_eq!(sb.undo_count(), after_first, "second removal is a no-op");
    assert!(!sb.edit_body(id, |b| b.m = 5.0), "stale ids refuse edits");
}

#[test]
fn speed_stays_under_the_limit() {
    let mut sb = sandbox_with(Parameters {
        speed_limit: 100.0,
        ..quiet_params()
    });
    let id = sb.create_body(&BodyConfig::default());
    sb.add_field_zone(
        rect([-1.0e6, -1.0e6], [1.0e6, 1.0e6]),
        NVec2::new(1.0e6, 0.0),
    );

    for _ in 0..50 {
        sb.advance(false);
    }
    let speed = sb.system.bodies.get(id).unwrap().v.norm();
    assert!(speed <= 100.0 + 1e-9, "clamped, got {speed}");
}

// ==================================================================================
// Determinism
// ==================================================================================

#[test]
fn fixed_seed_runs_are_bit_identical() {
    let build = || {
        let mut sb = sandbox_with(Parameters {
            fragmentation: true,
            thermodynamics: true,
            gravity: true,
            seed: 1234,
            ..Parameters::default()
        });
        sb.create_body(&ball(-30.0, 0.0, 60.0, 0.0, 30.0, 6.0));
        sb.create_body(&BodyConfig {
            x: [30.0, 0.0],
            v: [-60.0, 0.0],
            m: 30.0,
            radius: Some(6.0),
            integrity: Some(15.0),
            ..BodyConfig::default()
        });
        sb.add_chaos_zone(rect([-400.0, -400.0], [400.0, 400.0]), 200.0, 1.0, 80.0);
        sb
    };

    let mut first = build();
    let mut second = build();
    for _ in 0..60 {
        first.advance(false);
        second.advance(false);
    }

    assert_eq!(first.system.bodies.len(), second.system.bodies.len());
    for ((ia, a), (ib, b)) in first.system.bodies.iter().zip(second.system.bodies.iter()) {
        assert_eq!(ia, ib);
        assert_eq!(a.x, b.x, "positions must match bit for bit");
        assert_eq!(a.v, b.v, "velocities must match bit for bit");
        assert_eq!(a.temp, b.temp);
    }
}

// ==================================================================================
// Scenario loading
// ==================================================================================

#[test]
fn yaml_scenario_builds_the_described_world() {
    let text = r#"
engine:
  barnes_hut: true
  theta: 0.7

parameters:
  G: 2.5
  seed: 77

bodies:
  - x: [0.0, 0.0]
    m: 10.0
    radius: 3.0
  - x: [0.0, 40.0]
    m: 1.0
    restitution: 0.9

zones:
  - kind: periodic
    shape: { type: rect, min: [-200.0, -200.0], max: [200.0, 200.0] }
    trigger: radius
  - kind: vortex
    shape: { type: circle, center: [0.0, 0.0], radius: 90.0 }
    strength: 500.0

bonds:
  - a: 0
    b: 1
    stiffness: 25.0

barriers:
  - a: [-50.0, -50.0]
    b: [50.0, -50.0]
    restitution: 0.8
    friction: 0.1

fields:
  - fx: "-x / 100"
    fy: "-y / 100"
"#;
    let cfg: ScenarioConfig = serde_yaml::from_str(text).expect("scenario parses");
    let sb = Sandbox::build_scenario(cfg);

    assert!(sb.engine.barnes_hut);
    assert_eq!(sb.engine.theta, 0.7);
    assert_eq!(sb.parameters.G, 2.5);
    assert_eq!(sb.parameters.seed, 77);

    assert_eq!(sb.system.bodies.len(), 2);
    assert_eq!(sb.system.zones.periodic.len(), 1);
    assert_eq!(sb.system.zones.vortex.len(), 1);
    assert_eq!(sb.system.bonds.len(), 1);
    assert_eq!(sb.system.barriers.len(), 1);
    assert_eq!(sb.system.fields.len(), 1);
    assert!(sb.system.fields[0].is_valid());

    // a bond with no explicit rest length adopts the current distance
    assert!((sb.system.bonds[0].rest_len - 40.0).abs() < 1e-12);
    // scenario construction leaves a clean history
    assert!(!sb.can_undo() && !sb.can_redo());
}

#[test]
fn yaml_material_forms_flat_and_curve() {
    let text = r#"
bodies:
  - m: 2.0
    restitution: 0.9
    stiffness:
      cold: 2.0e4
      hot: 500.0
      critical_temp: 900.0
      sharpness: 0.02
"#;
    let cfg: ScenarioConfig = serde_yaml::from_str(text).expect("material forms parse");
    let sb = Sandbox::build_scenario(cfg);
    let (_, body) = sb.system.bodies.iter().next().unwrap();

    assert_eq!(body.restitution.value_at(300.0), 0.9, "flat curve");
    assert!(
        (body.stiffness.value_at(0.0) - 2.0e4).abs() < 1.0,
        "cold end of the curve"
    );
    assert!(
        body.stiffness.value_at(5000.0) < 1000.0,
        "hot end falls toward the hot value"
    );
}

// ==================================================================================
// Undo/redo round-trips
// ==================================================================================

/// Compact world signature for round-trip comparisons.
fn signature(sb: &Sandbox) -> (usize, usize, usize, usize, usize) {
    let zones = &sb.system.zones;
    let zone_total = zones.periodic.len()
        + zones.viscosity.len()
        + zones.field.len()
        + zones.thermal.len()
        + zones.annihilation.len()
        + zones.chaos.len()
        + zones.vortex.len()
        + zones.null.len();
    (
        sb.system.bodies.len(),
        zone_total,
        sb.system.bonds.len(),
        sb.system.barriers.len(),
        sb.system.fields.len(),
    )
}

#[test]
fn every_operation_round_trips_through_history() {
    let mut sb = sandbox_with(quiet_params());
    let mut signatures = vec![signature(&sb)];
    let mut done = 0usize;

    let a = sb.create_body(&ball(0.0, 0.0, 5.0, 0.0, 2.0, 2.0));
    signatures.push(signature(&sb));
    let b = sb.create_body(&ball(30.0, 0.0, 0.0, 0.0, 4.0, 2.0));
    signatures.push(signature(&sb));

    sb.edit_body(a, |body| body.spin = 3.0);
    signatures.push(signature(&sb));

    let z1 = sb.add_periodic_zone(rect([-100.0, -100.0], [100.0, 100.0]), PeriodicTrigger::Center);
    signatures.push(signature(&sb));
    sb.add_viscosity_zone(circle(0.0, 0.0, 50.0), 1.0);
    signatures.push(signature(&sb));
    sb.add_field_zone(circle(0.0, 0.0, 50.0), NVec2::new(0.0, -9.8));
    signatures.push(signature(&sb));
    sb.add_thermal_zone(circle(0.0, 0.0, 50.0), 600.0, 0.5);
    signatures.push(signature(&sb));
    sb.add_annihilation_zone(circle(300.0, 0.0, 20.0), true);
    signatures.push(signature(&sb));
    sb.add_chaos_zone(circle(0.0, 0.0, 50.0), 100.0, 1.0, 50.0);
    signatures.push(signature(&sb));
    sb.add_vortex_zone(circle(0.0, 0.0, 50.0), 300.0);
    signatures.push(signature(&sb));
    sb.add_null_zone(circle(0.0, 0.0, 50.0), true, true, true);
    signatures.push(signature(&sb));

    let bond = sb.add_elastic_bond(a, b, &BondConfig::default()).unwrap();
    signatures.push(signature(&sb));
    let bar = sb.add_solid_barrier(NVec2::new(-50.0, -20.0), NVec2::new(50.0, -20.0), 0.9, 0.2);
    signatures.push(signature(&sb));
    let field = sb.add_field_formula("sin(t)", "0");
    signatures.push(signature(&sb));

    sb.remove_periodic_zone(z1);
    signatures.push(signature(&sb));
    sb.remove_elastic_bond(bond);
    signatures.push(signature(&sb));
    sb.remove_solid_barrier(bar);
    signatures.push(signature(&sb));
    sb.remove_field_formula(field);
    signatures.push(signature(&sb));

    sb.zero_velocities();
    signatures.push(signature(&sb));
    sb.remove_body(b);
    signatures.push(signature(&sb));
    sb.reset_world();
    signatures.push(signature(&sb));

    // walk all the way back, checking the world after every undo
    while sb.can_undo() {
        signatures.pop();
        assert!(sb.undo());
        done += 1;
        assert_eq!(
            signature(&sb),
            *signatures.last().unwrap(),
            "undo #{done} restored the prior world"
        );
    }
    assert_eq!(signature(&sb), (0, 0, 0, 0, 0));

    // and forward again to the final state
    while sb.can_redo() {
        assert!(sb.redo());
    }
    assert_eq!(signature(&sb), (0, 0, 0, 0, 0), "reset_world was the last op");
    assert!(!sb.can_redo());
}

#[test]
fn history_is_capped() {
    let mut sb = sandbox_with(quiet_params());
    for i in 0..60 {
        sb.create_body(&ball(i as f64 * 10.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    }
    assert_eq!(sb.undo_count(), 50, "oldest actions fall off the stack");

    while sb.undo() {}
    assert_eq!(
        sb.system.bodies.len(),
        10,
        "the ten oldest spawns are beyond reach"
    );
}

#[test]
fn new_action_clears_the_redo_branch() {
    let mut sb = sandbox_with(quiet_params());
    sb.create_body(&BodyConfig::default());
    sb.undo();
    assert!(sb.can_redo());

    sb.create_body(&BodyConfig::default());
    assert!(!sb.can_redo(), "diverging discards the old future");
}

// ==================================================================================
// Bulk operations
// ==================================================================================

#[test]
fn snap_to_grid_rounds_every_position() {
    let mut sb = sandbox_with(quiet_params());
    let a = sb.create_body(&ball(12.3, -7.6, 0.0, 0.0, 1.0, 1.0));
    let b = sb.create_body(&ball(-2.4, 2.6, 0.0, 0.0, 1.0, 1.0));

    sb.snap_to_grid(5.0);

    assert_eq!(sb.system.bodies.get(a).unwrap().x, NVec2::new(10.0, -10.0));
    assert_eq!(sb.system.bodies.get(b).unwrap().x, NVec2::new(0.0, 5.0));

    sb.undo();
    assert_eq!(sb.system.bodies.get(a).unwrap().x, NVec2::new(12.3, -7.6));
}

#[test]
fn scatter_respects_bounds_and_undoes() {
    let mut sb = sandbox_with(quiet_params());
    for _ in 0..6 {
        sb.create_body(&ball(500.0, 500.0, 0.0, 0.0, 1.0, 1.0));
    }

    sb.scatter_positions(NVec2::new(-50.0, -50.0), NVec2::new(50.0, 50.0));
    for (_, body) in sb.system.bodies.iter() {
        assert!(body.x.x.abs() <= 50.0 && body.x.y.abs() <= 50.0);
    }

    sb.undo();
    for (_, body) in sb.system.bodies.iter() {
        assert_eq!(body.x, NVec2::new(500.0, 500.0));
    }
}

#[test]
fn equalize_masses_skips_pinned_bodies() {
    let mut sb = sandbox_with(quiet_params());
    let light = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 2.0, 1.0));
    let heavy = sb.create_body(&ball(30.0, 0.0, 0.0, 0.0, 4.0, 1.0));
    let pinned = sb.create_body(&ball(60.0, 0.0, 0.0, 0.0, -1.0, 5.0));

    sb.equalize_masses();

    assert_eq!(sb.system.bodies.get(light).unwrap().m, 3.0);
    assert_eq!(sb.system.bodies.get(heavy).unwrap().m, 3.0);
    let p = sb.system.bodies.get(pinned).unwrap();
    assert!(p.is_immovable(), "pinned bodies keep their sentinel mass");
}

#[test]
fn reverse_velocities_twice_is_identity() {
    let mut sb = sandbox_with(quiet_params());
    let id = sb.create_body(&ball(0.0, 0.0, 12.5, -3.25, 1.0, 1.0));

    sb.reverse_velocities();
    assert_eq!(sb.system.bodies.get(id).unwrap().v, NVec2::new(-12.5, 3.25));
    sb.reverse_velocities();
    assert_eq!(sb.system.bodies.get(id).unwrap().v, NVec2::new(12.5, -3.25));
    assert_eq!(sb.undo_count(), 3, "each pass is its own action");
}

// ==================================================================================
// Prediction
// ==================================================================================

#[test]
fn prediction_agrees_with_the_live_run() {
    let mut sb = sandbox_with(gravity_params());
    sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 400.0, 8.0));
    let id = sb.create_body(&ball(100.0, 0.0, 0.0, 14.0, 1.0, 2.0));

    let predicted = sb.predict_trajectory(id, 40, 0.0);
    assert_eq!(predicted.len(), 40);

    for _ in 0..40 {
        sb.advance(false);
    }
    let live = sb.system.bodies.get(id).unwrap().x;
    let last = predicted.last().unwrap().x;
    assert!(
        (live - last).norm() < 1e-9,
        "same pipeline, same answer: live {:?} vs predicted {:?}",
        live,
        last
    );
}

#[test]
fn prediction_runs_twice_identically() {
    let mut sb = sandbox_with(Parameters {
        gravity: true,
        ..Parameters::default()
    });
    sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 300.0, 8.0));
    let id = sb.create_body(&ball(80.0, 0.0, 0.0, 10.0, 1.0, 2.0));
    sb.add_chaos_zone(rect([-400.0, -400.0], [400.0, 400.0]), 100.0, 1.0, 70.0);

    let first = sb.predict_trajectory(id, 50, 0.0);
    let second = sb.predict_trajectory(id, 50, 0.0);
    assert_eq!(first, second);
}

// ==================================================================================
// Misc surface checks
// ==================================================================================

#[test]
fn tick_events_report_quiet_ticks() {
    let mut sb = sandbox_with(quiet_params());
    sb.create_body(&BodyConfig::default());
    let events = sb.advance(false);
    assert!(events.is_empty(), "nothing happened on this tick");
}

#[test]
fn body_ids_are_generation_tagged() {
    let mut sb = sandbox_with(quiet_params());
    let first = sb.create_body(&BodyConfig::default());
    sb.remove_body(first);
    let second = sb.create_body(&BodyConfig::default());

    // the slot is reused, the stale handle is not
    assert_eq!(
        first.index, second.index,
        "vacated slot is recycled first"
    );
    assert!(sb.system.bodies.get(first).is_none());
    assert!(sb.system.bodies.get(second).is_some());
}

#[test]
fn ids_survive_an_undo_redo_cycle() {
    let mut sb = sandbox_with(quiet_params());
    let a = sb.create_body(&ball(0.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    let b = sb.create_body(&ball(10.0, 0.0, 0.0, 0.0, 1.0, 1.0));
    sb.add_elastic_bond(a, b, &BondConfig::default());

    sb.undo();
    sb.undo();
    sb.redo();
    sb.redo();

    let ids: Vec<BodyId> = sb.system.bodies.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![a, b], "handles stay valid across replay");
    assert_eq!(sb.system.bonds.len(), 1);
}
