//! Skeleton entities for registered players
//!
//! Each player gets a root entity with one child entity per bone, mirroring
//! the skeleton hierarchy. Local bone transforms are written from the
//! player's pose every frame; bones are drawn as gizmo lines between joints.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use mocap_core::{BoneTransform, PlayerId, Pose, Skeleton};

use crate::types::{to_quat, to_vec3, Session, ViewerSet};

const JOINT_RADIUS: f32 = 1.2;

/// Player colors, cycled by player index
const PLAYER_COLORS: [Color; 6] = [
    Color::srgb(0.2, 0.4, 0.9),
    Color::srgb(0.9, 0.3, 0.3),
    Color::srgb(0.2, 0.7, 0.3),
    Color::srgb(0.8, 0.5, 0.1),
    Color::srgb(0.6, 0.3, 0.8),
    Color::srgb(0.2, 0.7, 0.7),
];

/// Root of one player's bone hierarchy
#[derive(Component)]
pub struct SkeletonRoot {
    pub player: PlayerId,
}

/// One bone of a player's skeleton
#[derive(Component)]
pub struct BoneJoint {
    pub player: PlayerId,
    pub bone: usize,
}

/// Players that already have entities
#[derive(Resource, Default)]
pub struct SpawnedSkeletons(HashSet<PlayerId>);

/// Each player's pose for the current frame, sampled once
#[derive(Resource, Default)]
pub struct FramePoses(pub HashMap<PlayerId, Pose>);

pub struct SkeletonPlugin;

impl Plugin for SkeletonPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpawnedSkeletons>()
            .init_resource::<FramePoses>()
            .add_systems(
                Update,
                (spawn_skeletons, sample_poses, apply_poses, draw_bones)
                    .chain()
                    .in_set(ViewerSet::Apply),
            );
    }
}

pub fn player_color(player: PlayerId) -> Color {
    PLAYER_COLORS[player.0 % PLAYER_COLORS.len()]
}

/// Attach a bone hierarchy to the scene for every newly registered player
fn spawn_skeletons(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut spawned: ResMut<SpawnedSkeletons>,
    session: Res<Session>,
) {
    if spawned.0.len() == session.coordinator().len() {
        return;
    }

    let joint_mesh = meshes.add(Sphere::new(JOINT_RADIUS));
    for (id, player) in session.coordinator().players() {
        if !spawned.0.insert(id) {
            continue;
        }
        let material = materials.add(StandardMaterial {
            base_color: player_color(id),
            unlit: true,
            ..default()
        });
        let root = commands
            .spawn((
                Name::new(format!("{} ({})", id, player.source())),
                Transform::default(),
                Visibility::default(),
                SkeletonRoot { player: id },
            ))
            .id();
        spawn_bones(&mut commands, root, id, player.skeleton(), &player.pose(), &joint_mesh, &material);
        tracing::info!("Attached {} with {} bones", id, player.skeleton().len());
    }
}

fn spawn_bones(
    commands: &mut Commands,
    root: Entity,
    player: PlayerId,
    skeleton: &Skeleton,
    pose: &Pose,
    mesh: &Handle<Mesh>,
    material: &Handle<StandardMaterial>,
) {
    // Parents always precede their children in a skeleton
    let mut entities: Vec<Entity> = Vec::with_capacity(skeleton.len());
    for (index, bone) in skeleton.bones.iter().enumerate() {
        let parent = bone.parent.and_then(|p| entities.get(p).copied()).unwrap_or(root);
        let local = pose.get(index).copied().unwrap_or_else(|| BoneTransform::from_offset(bone.offset));
        let entity = commands
            .spawn((
                Name::new(bone.name.clone()),
                Transform::from_translation(to_vec3(local.translation.to_array()))
                    .with_rotation(to_quat(local.rotation.to_array())),
                Visibility::default(),
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                BoneJoint { player, bone: index },
                ChildOf(parent),
            ))
            .id();
        entities.push(entity);
    }
}

fn sample_poses(session: Res<Session>, mut poses: ResMut<FramePoses>) {
    poses.0.clear();
    poses
        .0
        .extend(session.coordinator().players().map(|(id, player)| (id, player.pose())));
}

/// Write each player's current pose to its bone entities
fn apply_poses(poses: Res<FramePoses>, mut bones: Query<(&BoneJoint, &mut Transform)>) {
    for (joint, mut transform) in &mut bones {
        let Some(local) = poses.0.get(&joint.player).and_then(|pose| pose.get(joint.bone)) else {
            continue;
        };
        transform.translation = to_vec3(local.translation.to_array());
        transform.rotation = to_quat(local.rotation.to_array());
    }
}

/// Draw a line from every bone to each of its children
fn draw_bones(session: Res<Session>, poses: Res<FramePoses>, mut gizmos: Gizmos) {
    for (id, player) in session.coordinator().players() {
        let Some(pose) = poses.0.get(&id) else {
            continue;
        };
        let skeleton = player.skeleton();
        let positions = skeleton.world_positions(pose);
        let color = player_color(id);
        for (parent, child) in skeleton.segments() {
            let (Some(start), Some(end)) = (positions.get(parent), positions.get(child)) else {
                continue;
            };
            gizmos.line(to_vec3(start.to_array()), to_vec3(end.to_array()), color);
        }
    }
}
