use super::{PhysicsBody, Skeleton};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Set of content slices present in (or requested from) a [`Mesh`]
///
/// Slices are ordered by flag value; rom content indices rely on this order.
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
pub struct MeshContentFlags(u8);

impl MeshContentFlags {
    /// No content
    pub const NONE: Self = Self(0);
    /// Vertices, indices and surfaces
    pub const GEOMETRY: Self = Self(1 << 0);
    /// Bone poses
    pub const POSE: Self = Self(1 << 1);
    /// Physics bone bindings
    pub const PHYSICS: Self = Self(1 << 2);
    /// Tags and other descriptive data
    pub const METADATA: Self = Self(1 << 3);
    /// Every slice
    pub const ALL: Self = Self(0b1111);

    /// Individual slices, in rom order
    pub const SLICES: [Self; 4] =
        [Self::GEOMETRY, Self::POSE, Self::PHYSICS, Self::METADATA];

    /// Returns the raw bits
    pub fn bits(self) -> u8 {
        self.0
    }
    /// Checks whether every flag in `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
    /// Checks whether any flag in `other` is set
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
    /// Number of slices present
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }
    /// Checks whether no flags are set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for MeshContentFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for MeshContentFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for MeshContentFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Vertex and index data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    /// Vertex positions
    pub vertices: Vec<[f32; 3]>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// Surface id of each triangle
    pub surface_ids: Vec<u32>,
}

impl MeshGeometry {
    /// Checks whether the geometry is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.indices.is_empty()
            && self.surface_ids.is_empty()
    }

    fn data_size(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<[f32; 3]>()
            + self.indices.len() * std::mem::size_of::<u32>()
            + self.surface_ids.len() * std::mem::size_of::<u32>()
    }
}

/// Transform of a single bone
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BonePose {
    /// Bone name
    pub bone: String,
    /// Bone transform
    pub transform: Matrix4<f32>,
}

/// Mesh constant, split into independently streamable content slices
///
/// The skeleton and physics body are shared references: when a mesh is
/// linked they are moved into the program's constant tables and restored by
/// index when the mesh is loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Geometry slice
    pub geometry: MeshGeometry,
    /// Pose slice
    pub poses: Vec<BonePose>,
    /// Physics slice: skeleton bones driven by the physics body
    pub physics_bones: Vec<u16>,
    /// Metadata slice
    pub tags: Vec<String>,
    /// Shared skeleton
    pub skeleton: Option<Arc<Skeleton>>,
    /// Shared physics body
    pub physics_body: Option<Arc<PhysicsBody>>,
}

impl Mesh {
    /// Returns the set of content slices that are not empty
    pub fn content_flags(&self) -> MeshContentFlags {
        let mut out = MeshContentFlags::NONE;
        if !self.geometry.is_empty() {
            out |= MeshContentFlags::GEOMETRY;
        }
        if !self.poses.is_empty() {
            out |= MeshContentFlags::POSE;
        }
        if !self.physics_bones.is_empty() {
            out |= MeshContentFlags::PHYSICS;
        }
        if !self.tags.is_empty() {
            out |= MeshContentFlags::METADATA;
        }
        out
    }

    /// Copies the requested slices into a new mesh, without shared references
    pub fn extract_content(&self, flags: MeshContentFlags) -> Mesh {
        let mut out = Mesh::default();
        if flags.contains(MeshContentFlags::GEOMETRY) {
            out.geometry = self.geometry.clone();
        }
        if flags.contains(MeshContentFlags::POSE) {
            out.poses = self.poses.clone();
        }
        if flags.contains(MeshContentFlags::PHYSICS) {
            out.physics_bones = self.physics_bones.clone();
        }
        if flags.contains(MeshContentFlags::METADATA) {
            out.tags = self.tags.clone();
        }
        out
    }

    /// Copies every non-empty slice of `other` into `self`
    pub fn merge_content(&mut self, other: &Mesh) {
        let flags = other.content_flags();
        if flags.contains(MeshContentFlags::GEOMETRY) {
            self.geometry = other.geometry.clone();
        }
        if flags.contains(MeshContentFlags::POSE) {
            self.poses = other.poses.clone();
        }
        if flags.contains(MeshContentFlags::PHYSICS) {
            self.physics_bones = other.physics_bones.clone();
        }
        if flags.contains(MeshContentFlags::METADATA) {
            self.tags = other.tags.clone();
        }
    }

    /// Approximate in-memory size of the requested slices, in bytes
    pub fn content_size(&self, flags: MeshContentFlags) -> usize {
        let mut out = 0;
        if flags.contains(MeshContentFlags::GEOMETRY) {
            out += self.geometry.data_size();
        }
        if flags.contains(MeshContentFlags::POSE) {
            out += self
                .poses
                .iter()
                .map(|p| p.bone.len() + std::mem::size_of::<Matrix4<f32>>())
                .sum::<usize>();
        }
        if flags.contains(MeshContentFlags::PHYSICS) {
            out += self.physics_bones.len() * std::mem::size_of::<u16>();
        }
        if flags.contains(MeshContentFlags::METADATA) {
            out += self.tags.iter().map(|t| t.len()).sum::<usize>();
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_mesh() -> Mesh {
        Mesh {
            geometry: MeshGeometry {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                indices: vec![0, 1, 2],
                surface_ids: vec![0],
            },
            tags: vec!["Wheel".to_owned()],
            ..Default::default()
        }
    }

    #[test]
    fn content_flags() {
        let m = test_mesh();
        let f = m.content_flags();
        assert!(f.contains(MeshContentFlags::GEOMETRY));
        assert!(f.contains(MeshContentFlags::METADATA));
        assert!(!f.intersects(MeshContentFlags::POSE));
        assert_eq!(f.count(), 2);
    }

    #[test]
    fn extract_merge() {
        let m = test_mesh();
        let geom = m.extract_content(MeshContentFlags::GEOMETRY);
        let meta = m.extract_content(MeshContentFlags::METADATA);
        assert!(geom.tags.is_empty());
        assert!(meta.geometry.is_empty());

        let mut out = Mesh::default();
        out.merge_content(&geom);
        out.merge_content(&meta);
        assert_eq!(out, m);
    }
}
