//! Scene setup - camera, grid, light and background

use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};

use crate::camera::MainCamera;
use crate::types::{to_quat, to_vec3, Session, ViewerSet};

/// Light-grey page background (#eeeeee)
pub const BACKGROUND: Color = Color::srgb(0.933, 0.933, 0.933);
/// Edge length of the ground grid
pub const GRID_SIZE: f32 = 400.0;
pub const GRID_DIVISIONS: u32 = 10;

const GRID_LINE_THICKNESS: f32 = 0.4;

/// Marker component for the main directional light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Marker component for grid lines
#[derive(Component)]
pub struct GridLine;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(BACKGROUND))
            .add_systems(Startup, setup_scene)
            .add_systems(Update, track_viewport.before(ViewerSet::Apply));
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut session: ResMut<Session>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    if let Ok(window) = windows.single() {
        session.resize(window.width(), window.height());
    }
    let camera = session.config().camera.clone();
    let orbit = session.orbit();

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov.to_radians(),
            near: camera.near,
            far: camera.far,
            aspect_ratio: session.aspect(),
            ..default()
        }),
        Transform::from_translation(to_vec3(orbit.position().to_array()))
            .with_rotation(to_quat(orbit.rotation().to_array())),
        MainCamera,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(100.0, 300.0, 200.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));

    spawn_grid(&mut commands, &mut meshes, &mut materials);
    tracing::info!("Scene ready ({} source(s) configured)", session.sources().len());
}

/// Ground grid on the X-Z plane, centred on the origin, center lines darker
fn spawn_grid(commands: &mut Commands, meshes: &mut Assets<Mesh>, materials: &mut Assets<StandardMaterial>) {
    let half = GRID_SIZE / 2.0;
    let step = GRID_SIZE / GRID_DIVISIONS as f32;

    let center_material = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(0x44, 0x44, 0x44),
        unlit: true,
        ..default()
    });
    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(0x88, 0x88, 0x88),
        unlit: true,
        ..default()
    });

    // Lines along X (varying Z) and along Z (varying X)
    let line_x = meshes.add(Cuboid::new(GRID_SIZE, GRID_LINE_THICKNESS, GRID_LINE_THICKNESS));
    let line_z = meshes.add(Cuboid::new(GRID_LINE_THICKNESS, GRID_LINE_THICKNESS, GRID_SIZE));

    for i in 0..=GRID_DIVISIONS {
        let offset = -half + i as f32 * step;
        let material = if i * 2 == GRID_DIVISIONS {
            center_material.clone()
        } else {
            line_material.clone()
        };
        commands.spawn((
            Mesh3d(line_x.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(0.0, 0.0, offset),
            GridLine,
        ));
        commands.spawn((
            Mesh3d(line_z.clone()),
            MeshMaterial3d(material),
            Transform::from_xyz(offset, 0.0, 0.0),
            GridLine,
        ));
    }
}

/// Keep the camera aspect ratio in step with the canvas size
fn track_viewport(
    mut resized: MessageReader<WindowResized>,
    mut session: ResMut<Session>,
    mut projections: Query<&mut Projection, With<MainCamera>>,
) {
    let Some(event) = resized.read().last() else {
        return;
    };
    let Some(aspect) = session.resize(event.width, event.height) else {
        tracing::debug!("Ignoring zero-sized viewport");
        return;
    };

    for mut projection in &mut projections {
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.aspect_ratio = aspect;
        }
    }
}
