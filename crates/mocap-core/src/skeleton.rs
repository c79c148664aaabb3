//! Skeleton hierarchy and poses

use glam::{Quat, Vec3};

/// A single bone in a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone; parents always precede their children
    pub parent: Option<usize>,
    /// Rest offset relative to the parent bone
    pub offset: Vec3,
    /// BVH "End Site" leaf (no channels, only an offset)
    pub end_site: bool,
}

/// Local transform of one bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl BoneTransform {
    pub fn from_offset(offset: Vec3) -> Self {
        Self {
            translation: offset,
            rotation: Quat::IDENTITY,
        }
    }

    /// Compose `self` (parent, world space) with a child's local transform
    pub fn mul_transform(&self, local: &BoneTransform) -> BoneTransform {
        BoneTransform {
            translation: self.translation + self.rotation * local.translation,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }
}

/// One local transform per bone, indexed like [`Skeleton::bones`]
pub type Pose = Vec<BoneTransform>;

/// Hierarchical bone graph driven by a pose clip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        Self { bones }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// The root bone (always index 0 when non-empty)
    pub fn root(&self) -> Option<&Bone> {
        self.bones.first()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Rest pose: every bone at its offset with no rotation
    pub fn rest_pose(&self) -> Pose {
        self.bones
            .iter()
            .map(|b| BoneTransform::from_offset(b.offset))
            .collect()
    }

    /// Resolve a local pose into skeleton-space transforms
    pub fn world_transforms(&self, pose: &[BoneTransform]) -> Vec<BoneTransform> {
        let mut world: Vec<BoneTransform> = Vec::with_capacity(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            let local = pose
                .get(i)
                .copied()
                .unwrap_or_else(|| BoneTransform::from_offset(bone.offset));
            let resolved = match bone.parent {
                Some(p) if p < world.len() => world[p].mul_transform(&local),
                _ => local,
            };
            world.push(resolved);
        }
        world
    }

    /// Skeleton-space joint positions for a pose
    pub fn world_positions(&self, pose: &[BoneTransform]) -> Vec<Vec3> {
        self.world_transforms(pose)
            .into_iter()
            .map(|t| t.translation)
            .collect()
    }

    /// Parent/child index pairs, one per drawable bone segment
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.parent.map(|p| (p, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> Skeleton {
        Skeleton::new(vec![
            Bone {
                name: "Hips".to_string(),
                parent: None,
                offset: Vec3::new(0.0, 100.0, 0.0),
                end_site: false,
            },
            Bone {
                name: "Spine".to_string(),
                parent: Some(0),
                offset: Vec3::new(0.0, 10.0, 0.0),
                end_site: false,
            },
            Bone {
                name: "ENDSITE".to_string(),
                parent: Some(1),
                offset: Vec3::new(0.0, 5.0, 0.0),
                end_site: true,
            },
        ])
    }

    #[test]
    fn test_rest_world_positions() {
        let skeleton = arm();
        let positions = skeleton.world_positions(&skeleton.rest_pose());
        assert_eq!(positions[0], Vec3::new(0.0, 100.0, 0.0));
        assert_eq!(positions[1], Vec3::new(0.0, 110.0, 0.0));
        assert_eq!(positions[2], Vec3::new(0.0, 115.0, 0.0));
    }

    #[test]
    fn test_parent_rotation_moves_children() {
        let skeleton = arm();
        let mut pose = skeleton.rest_pose();
        // Rotate the spine 90 degrees about Z: the end site swings to -X
        pose[1].rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);

        let positions = skeleton.world_positions(&pose);
        assert!((positions[2] - Vec3::new(-5.0, 110.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_segments_and_children() {
        let skeleton = arm();
        let segments: Vec<_> = skeleton.segments().collect();
        assert_eq!(segments, vec![(0, 1), (1, 2)]);
        assert_eq!(skeleton.children(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(skeleton.find("Spine"), Some(1));
        assert_eq!(skeleton.root().map(|b| b.name.as_str()), Some("Hips"));
    }
}
