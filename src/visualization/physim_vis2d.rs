use bevy::math::primitives::Circle;
use bevy::prelude::*;
use bevy::sprite::{MaterialMesh2dBundle, Mesh2dHandle};

use std::collections::HashMap;

use crate::simulation::arena::BodyId;
use crate::simulation::sandbox::Sandbox;
use crate::simulation::states::NVec2;
use crate::simulation::zones::ZoneShape;

#[derive(Component)]
struct BodyMarker(pub BodyId);

/// Map from body id to its spawned entity. Bodies come and go at runtime
/// (fragmentation, annihilation, undo), so the set is diffed every frame.
#[derive(Resource, Default)]
struct BodyVisuals {
    entities: HashMap<BodyId, Entity>,
}

const SCALE: f32 = 1.0; // world units are already screen-sized

pub fn run_2d(sandbox: Sandbox) {
    println!(
        "run_2d: starting Bevy 2D viewer with {} bodies",
        sandbox.system.bodies.len()
    );

    App::new()
        .insert_resource(sandbox)
        .init_resource::<BodyVisuals>()
        .add_plugins(DefaultPlugins)
        .add_systems(Startup, setup_camera_system)
        .add_systems(
            Update,
            (
                keyboard_system,
                physics_step_system,
                sync_bodies_system,
                draw_overlays_system,
            )
                .chain(),
        )
        .run();
}

fn setup_camera_system(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

/// Space pauses, N single-steps while paused, Z/Y undo and redo.
fn keyboard_system(keys: Res<ButtonInput<KeyCode>>, mut sandbox: ResMut<Sandbox>) {
    if keys.just_pressed(KeyCode::Space) {
        sandbox.toggle_pause();
    }
    if keys.just_pressed(KeyCode::KeyN) && sandbox.paused {
        sandbox.advance(true);
    }
    if keys.just_pressed(KeyCode::KeyZ) {
        sandbox.undo();
    }
    if keys.just_pressed(KeyCode::KeyY) {
        sandbox.redo();
    }
}

fn physics_step_system(mut sandbox: ResMut<Sandbox>) {
    sandbox.advance(false);
}

fn sync_bodies_system(
    mut commands: Commands,
    sandbox: Res<Sandbox>,
    mut visuals: ResMut<BodyVisuals>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut query: Query<&mut Transform, With<BodyMarker>>,
) {
    // circles for bodies that appeared since last frame
    for (id, body) in sandbox.system.bodies.iter() {
        if visuals.entities.contains_key(&id) {
            continue;
        }
        let color = Color::srgb(body.color[0], body.color[1], body.color[2]);
        let entity = commands
            .spawn((
                MaterialMesh2dBundle {
                    mesh: Mesh2dHandle(meshes.add(Circle::new(1.0))),
                    material: materials.add(ColorMaterial::from(color)),
                    transform: Transform::from_xyz(
                        body.x.x as f32 * SCALE,
                        body.x.y as f32 * SCALE,
                        0.0,
                    )
                    .with_scale(Vec3::splat((body.radius as f32).max(0.1) * SCALE)),
                    ..Default::default()
                },
                BodyMarker(id),
            ))
            .id();
        visuals.entities.insert(id, entity);
    }

    // move the survivors, drop what the simulation removed
    visuals.entities.retain(|&id, &mut entity| {
        match sandbox.system.bodies.get(id) {
            Some(body) => {
                if let Ok(mut transform) = query.get_mut(entity) {
                    transform.translation.x = body.x.x as f32 * SCALE;
                    transform.translation.y = body.x.y as f32 * SCALE;
                    transform.scale = Vec3::splat((body.radius as f32).max(0.1) * SCALE);
                    transform.rotation = Quat::from_rotation_z(body.angle as f32);
                }
                true
            }
            None => {
                commands.entity(entity).despawn();
                false
            }
        }
    });
}

/// Gizmo overlays: trails, bonds, barriers and zone outlines.
fn draw_overlays_system(mut gizmos: Gizmos, sandbox: Res<Sandbox>) {
    for (_, body) in sandbox.system.bodies.iter() {
        if body.trail.len() >= 2 {
            let points = body.trail.iter().map(|p| v2(*p));
            gizmos.linestrip_2d(points, Color::srgba(1.0, 1.0, 1.0, 0.25));
        }
    }

    for bond in &sandbox.system.bonds {
        let (Some(a), Some(b)) = (
            sandbox.system.bodies.get(bond.a),
            sandbox.system.bodies.get(bond.b),
        ) else {
            continue;
        };
        gizmos.line_2d(v2(a.x), v2(b.x), Color::srgba(0.9, 0.9, 0.3, 0.8));
    }

    for barrier in &sandbox.system.barriers {
        gizmos.line_2d(v2(barrier.a), v2(barrier.b), Color::srgb(0.8, 0.8, 0.8));
    }

    let zones = &sandbox.system.zones;
    for z in &zones.periodic {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.3, 0.8, 0.9, z.enabled));
    }
    for z in &zones.viscosity {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.3, 0.4, 0.9, z.enabled));
    }
    for z in &zones.field {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.3, 0.9, 0.4, z.enabled));
    }
    for z in &zones.thermal {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.9, 0.5, 0.2, z.enabled));
    }
    for z in &zones.annihilation {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.9, 0.2, 0.2, z.enabled));
    }
    for z in &zones.chaos {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.7, 0.3, 0.9, z.enabled));
    }
    for z in &zones.vortex {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.2, 0.9, 0.8, z.enabled));
    }
    for z in &zones.null {
        draw_zone_shape(&mut gizmos, &z.shape, tint(0.6, 0.6, 0.6, z.enabled));
    }
}

fn draw_zone_shape(gizmos: &mut Gizmos, shape: &ZoneShape, color: Color) {
    match shape {
        ZoneShape::Rect { min, max } => {
            // unbounded zones have no finite outline to draw
            if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
                return;
            }
            let center = Vec2::new(
                ((min.x + max.x) * 0.5) as f32 * SCALE,
                ((min.y + max.y) * 0.5) as f32 * SCALE,
            );
            let size = Vec2::new(
                (max.x - min.x) as f32 * SCALE,
                (max.y - min.y) as f32 * SCALE,
            );
            gizmos.rect_2d(center, 0.0, size, color);
        }
        ZoneShape::Circle { center, radius } => {
            gizmos.circle_2d(v2(*center), *radius as f32 * SCALE, color);
        }
    }
}

fn v2(p: NVec2) -> Vec2 {
    Vec2::new(p.x as f32 * SCALE, p.y as f32 * SCALE)
}

fn tint(r: f32, g: f32, b: f32, enabled: bool) -> Color {
    let alpha = if enabled { 0.5 } else { 0.15 };
    Color::srgba(r, g, b, alpha)
}
