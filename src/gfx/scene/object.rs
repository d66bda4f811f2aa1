use std::{fmt, sync::Arc};

use cgmath::{Matrix4, Rad, Vector3, Zero};

use crate::gfx::{geometry::MeshGeometry, resources::material::Material};

/// Stable handle for an object registered with the [`Scene`](super::Scene)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position, rotation and uniform scale of an object in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTransform {
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied X then Y then Z
    pub rotation: Vector3<f32>,
    pub scale: f32,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: 1.0,
        }
    }
}

impl ObjectTransform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Model matrix: T * R * S
    pub fn matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let r = Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z));
        let s = Matrix4::from_scale(self.scale);
        t * r * s // Order matters: T * R * S
    }
}

/// A mesh instance placed in the scene
///
/// Geometry is shared; GPU buffers live in the renderer, keyed by [`ObjectId`].
#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    pub geometry: Arc<MeshGeometry>,
    pub transform: ObjectTransform,
    pub material: Material,
    pub visible: bool,
}

impl Object {
    pub fn new(
        id: ObjectId,
        name: &str,
        geometry: Arc<MeshGeometry>,
        transform: ObjectTransform,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            geometry,
            transform,
            material: Material::default(),
            visible: true,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set translation
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform.position = translation;
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }
}
