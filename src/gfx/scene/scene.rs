use std::sync::Arc;

use log::{debug, info};

use crate::{
    error::ViewerError,
    gfx::{geometry::MeshGeometry, resources::material::Material},
};

use super::object::{Object, ObjectId, ObjectTransform};

/// Registry of everything the viewer draws and picks against.
///
/// Socketable meshes are registered during setup, after which the registry is
/// sealed. At most one movable object is ever inserted.
#[derive(Debug, Default)]
pub struct Scene {
    socketables: Vec<Object>,
    movable: Option<Object>,
    sealed: bool,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a static surface that picks may land on
    ///
    /// Fails with [`ViewerError::RegistryClosed`] once [`Scene::seal`] has run.
    pub fn add_socketable(
        &mut self,
        name: &str,
        geometry: Arc<MeshGeometry>,
        transform: ObjectTransform,
        material: Material,
    ) -> Result<ObjectId, ViewerError> {
        if self.sealed {
            return Err(ViewerError::RegistryClosed);
        }

        let id = self.allocate_id();
        let name = self.ensure_unique_name(name);
        info!(
            "Registered socketable '{}' {} ({} triangles)",
            name,
            id,
            geometry.triangle_count()
        );
        self.socketables
            .push(Object::new(id, &name, geometry, transform).with_material(material));
        Ok(id)
    }

    /// Closes the socketable set; further registrations are rejected
    pub fn seal(&mut self) {
        if !self.sealed {
            debug!("Scene sealed with {} socketable(s)", self.socketables.len());
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn socketables(&self) -> &[Object] {
        &self.socketables
    }

    /// Inserts the single movable object
    ///
    /// Fails with [`ViewerError::AlreadyPlaced`] if one already exists.
    pub fn insert_movable(
        &mut self,
        name: &str,
        geometry: Arc<MeshGeometry>,
        transform: ObjectTransform,
        material: Material,
    ) -> Result<ObjectId, ViewerError> {
        if self.movable.is_some() {
            return Err(ViewerError::AlreadyPlaced);
        }

        let id = self.allocate_id();
        let name = self.ensure_unique_name(name);
        info!("Inserted movable '{}' {}", name, id);
        self.movable = Some(Object::new(id, &name, geometry, transform).with_material(material));
        Ok(id)
    }

    pub fn movable(&self) -> Option<&Object> {
        self.movable.as_ref()
    }

    pub fn movable_mut(&mut self) -> Option<&mut Object> {
        self.movable.as_mut()
    }

    /// Iterates socketables first, then the movable object
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.socketables.iter().chain(self.movable.iter())
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects().find(|object| object.id == id)
    }

    /// Gets the total number of objects
    pub fn object_count(&self) -> usize {
        self.socketables.len() + usize::from(self.movable.is_some())
    }

    fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn ensure_unique_name(&self, desired_name: &str) -> String {
        let mut counter = 0;
        let mut test_name = desired_name.to_string();

        while self.objects().any(|obj| obj.name == test_name) {
            counter += 1;
            test_name = format!("{} ({})", desired_name, counter);
        }

        test_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_box;

    fn cube() -> Arc<MeshGeometry> {
        Arc::new(generate_box([0.5, 0.5, 0.5]))
    }

    #[test]
    fn test_sealed_registry_rejects_socketables() {
        let mut scene = Scene::new();
        scene
            .add_socketable("bone", cube(), ObjectTransform::default(), Material::bone())
            .unwrap();
        scene.seal();

        let err = scene
            .add_socketable("late", cube(), ObjectTransform::default(), Material::bone())
            .unwrap_err();
        assert!(matches!(err, ViewerError::RegistryClosed));
        assert_eq!(scene.socketables().len(), 1);
    }

    #[test]
    fn test_single_movable() {
        let mut scene = Scene::new();
        let first = scene
            .insert_movable("ball", cube(), ObjectTransform::default(), Material::implant())
            .unwrap();

        let err = scene
            .insert_movable("ball", cube(), ObjectTransform::default(), Material::implant())
            .unwrap_err();
        assert!(matches!(err, ViewerError::AlreadyPlaced));
        assert_eq!(scene.movable().map(|o| o.id), Some(first));
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_ids_are_unique_and_resolvable() {
        let mut scene = Scene::new();
        let a = scene
            .add_socketable("bone", cube(), ObjectTransform::default(), Material::bone())
            .unwrap();
        let b = scene
            .add_socketable("bone", cube(), ObjectTransform::default(), Material::bone())
            .unwrap();
        let c = scene
            .insert_movable("ball", cube(), ObjectTransform::default(), Material::implant())
            .unwrap();

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(scene.object(b).map(|o| o.name.as_str()), Some("bone (1)"));
        assert_eq!(scene.object(c).map(|o| o.name.as_str()), Some("ball"));
        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.objects().map(|o| o.id).collect::<Vec<_>>(), vec![a, b, c]);
    }
}
