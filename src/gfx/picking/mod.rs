//! # Object Picking System
//!
//! Turns a pointer position into the nearest surface point on the scene's
//! meshes.
//!
//! ## How it works
//!
//! 1. **Pointer to Ray**: unproject the pointer on the near and far clip planes
//!    through the inverse view-projection matrix. Orthographic cameras give
//!    parallel rays with varying origins, perspective cameras a fixed origin.
//! 2. **Broad phase**: test the ray against each object's local bounding box.
//! 3. **Narrow phase**: Möller–Trumbore against every triangle that survives.
//! 4. **Selection**: keep the smallest non-negative distance.
//!
//! ## Usage
//!
//! ```no_run
//! use socket_viewer::gfx::camera::{OrthographicCamera, Viewport};
//! use socket_viewer::gfx::picking::ObjectPicker;
//! # let objects: Vec<socket_viewer::gfx::scene::Object> = Vec::new();
//!
//! let camera = OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0);
//! let picker = ObjectPicker::new();
//! if let Some(hit) = picker.pick((400.0, 300.0), Viewport::new(800.0, 600.0), &camera, &objects) {
//!     println!("Hit {:?} at {:?}", hit.object, hit.point);
//! }
//! ```

use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3, Vector4, Zero};

use crate::gfx::{
    camera::{Camera, Viewport},
    scene::{Object, ObjectId},
};

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized by [`Ray::new`])
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Map the ray through an affine matrix.
    ///
    /// The direction is left unnormalized so a parameter `t` names the same
    /// point before and after the transform.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Ray {
        let origin = matrix * self.origin.extend(1.0);
        let direction = matrix * self.direction.extend(0.0);
        Ray {
            origin: origin.truncate() / origin.w,
            direction: direction.truncate(),
        }
    }

    /// Two-sided Möller–Trumbore test. Returns the ray parameter of the hit.
    pub fn intersect_triangle(&self, triangle: &[Vector3<f32>; 3]) -> Option<f32> {
        let [v0, v1, v2] = *triangle;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);

        // Scale-aware epsilon: the world scale shrinks meshes to centimetres
        let tolerance = 1e-7 * edge1.magnitude() * edge2.magnitude() * self.direction.magnitude();
        if det.abs() <= tolerance {
            return None; // Parallel or degenerate
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - v0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        (t >= 0.0).then_some(t)
    }

    /// Parameter along the line `axis_origin + s * axis_direction` closest to this ray.
    ///
    /// Returns `None` when the ray is (nearly) parallel to the axis, in which
    /// case dragging along it is ill-conditioned.
    pub fn closest_axis_parameter(
        &self,
        axis_origin: Vector3<f32>,
        axis_direction: Vector3<f32>,
    ) -> Option<f32> {
        let d = axis_direction.normalize();
        let r = self.direction.normalize();
        let w = axis_origin - self.origin;

        let b = d.dot(r);
        let denom = 1.0 - b * b;
        if denom < 1e-6 {
            return None;
        }

        let d_w = d.dot(w);
        let r_w = r.dot(w);
        Some((b * r_w - d_w) / denom)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl Aabb {
    /// Create a new AABB
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of the given half extents around `center`
    pub fn from_center(center: Vector3<f32>, half_extents: Vector3<f32>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::from(*first);
        let mut max = min;

        for vertex in vertices.iter().skip(1) {
            let v = Vector3::from(*vertex);
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        Self::new(min, max)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Test ray-AABB intersection
    ///
    /// Returns the ray parameter where the ray enters the box (zero when the
    /// origin is inside), or None if it misses. Axis-parallel rays are
    /// handled without producing NaNs.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (min, max) = (self.min[axis], self.max[axis]);

            if direction.abs() < f32::EPSILON {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let t0 = (min - origin) * inv;
            let t1 = (max - origin) * inv;
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }

        if t_near <= t_far && t_far >= 0.0 {
            Some(t_near.max(0.0))
        } else {
            None
        }
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        // Transform all 8 corners of the AABB and compute new bounds
        let corners: Vec<[f32; 3]> = (0..8)
            .map(|i| {
                let corner = Vector4::new(
                    if i & 1 == 0 { self.min.x } else { self.max.x },
                    if i & 2 == 0 { self.min.y } else { self.max.y },
                    if i & 4 == 0 { self.min.z } else { self.max.z },
                    1.0,
                );
                let transformed = matrix * corner;
                (transformed.truncate() / transformed.w).into()
            })
            .collect();

        Self::from_vertices(&corners)
    }

    /// Component-wise size of the box
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// Result of an object picking operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    /// The mesh that was hit
    pub object: ObjectId,
    /// Distance along the pick ray to the intersection point
    pub distance: f32,
    /// World space intersection point
    pub point: Vector3<f32>,
    /// World space unit normal of the hit triangle, facing the ray origin
    pub normal: Vector3<f32>,
}

/// Stateless ray caster used for placement picks and handle hit tests
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectPicker;

impl ObjectPicker {
    /// Create a new object picker
    pub fn new() -> Self {
        Self
    }

    /// Convert screen coordinates to a world-space ray.
    ///
    /// Returns `None` for an empty viewport or a singular camera matrix.
    pub fn screen_to_ray(
        &self,
        pointer: (f32, f32),
        viewport: Viewport,
        camera: &impl Camera,
    ) -> Option<Ray> {
        if viewport.is_empty() {
            return None;
        }
        let (ndc_x, ndc_y) = viewport.to_ndc(pointer.0, pointer.1);

        let view_proj = camera.projection_matrix() * camera.view_matrix();
        let inv_view_proj = view_proj.invert()?;

        // Near and far plane in OpenGL NDC
        let world_near = inv_view_proj * Vector4::new(ndc_x, ndc_y, -1.0, 1.0);
        let world_far = inv_view_proj * Vector4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near_3d = world_near.truncate() / world_near.w;
        let far_3d = world_far.truncate() / world_far.w;

        let direction = far_3d - near_3d;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(near_3d, direction))
    }

    /// Pick the nearest surface point among `candidates` under the pointer
    pub fn pick(
        &self,
        pointer: (f32, f32),
        viewport: Viewport,
        camera: &impl Camera,
        candidates: &[Object],
    ) -> Option<PickResult> {
        let ray = self.screen_to_ray(pointer, viewport, camera)?;
        self.pick_ray(&ray, candidates)
    }

    /// Cast an already built world-space ray against `candidates`
    pub fn pick_ray(&self, ray: &Ray, candidates: &[Object]) -> Option<PickResult> {
        candidates
            .iter()
            .filter_map(|object| intersect_object(ray, object))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn intersect_object(ray: &Ray, object: &Object) -> Option<PickResult> {
    let model = object.transform.matrix();
    let inverse = model.invert()?;
    let local_ray = ray.transformed(&inverse);
    let geometry = &object.geometry;

    // Broad phase
    geometry.bounds().intersect_ray(&local_ray)?;

    let (triangle, t) = (0..geometry.triangle_count())
        .filter_map(|i| {
            local_ray
                .intersect_triangle(&geometry.triangle(i))
                .map(|t| (i, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    // Normals transform by the inverse transpose
    let mut normal = (inverse.transpose() * geometry.face_normal(triangle).extend(0.0)).truncate();
    if normal.magnitude2() > 0.0 {
        normal = normal.normalize();
    }
    if normal.dot(ray.direction) > 0.0 {
        normal = -normal;
    }

    Some(PickResult {
        object: object.id,
        distance: t,
        point: ray.point_at(t),
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        camera::OrthographicCamera,
        geometry::{generate_box, generate_sphere},
        scene::ObjectTransform,
    };
    use cgmath::{perspective, Deg, Point3};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    const EPS: f32 = 1e-4;

    /// Camera at +Z looking at the origin with a 4x4 visible square
    fn front_camera() -> OrthographicCamera {
        let mut camera = OrthographicCamera::new(4.0, 1.0, 0.1, 100.0);
        camera.look_from(Vector3::new(0.0, 0.0, 10.0), Vector3::zero());
        camera
    }

    struct PerspectiveCamera;

    impl Camera for PerspectiveCamera {
        fn view_matrix(&self) -> Matrix4<f32> {
            Matrix4::look_at_rh(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0), Vector3::unit_y())
        }

        fn projection_matrix(&self) -> Matrix4<f32> {
            perspective(Deg(45.0), 1.0, 0.1, 100.0)
        }

        fn eye(&self) -> Vector3<f32> {
            Vector3::new(0.0, 0.0, 10.0)
        }
    }

    fn unit_box(id: u64, position: Vector3<f32>) -> Object {
        Object::new(
            ObjectId(id),
            "box",
            Arc::new(generate_box([0.5, 0.5, 0.5])),
            ObjectTransform::from_position(position),
        )
    }

    fn viewport() -> Viewport {
        Viewport::new(400.0, 400.0)
    }

    #[test]
    fn test_aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = Aabb::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        // Ray hitting the box
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        // Ray missing the box
        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());

        // Ray pointing away
        let ray_away = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(aabb.intersect_ray(&ray_away).is_none());

        // Origin inside
        let inside = Ray::new(Vector3::zero(), Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(aabb.intersect_ray(&inside), Some(0.0));
    }

    #[test]
    fn test_aabb_transform() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let moved = aabb.transform(&(Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0)) * Matrix4::from_scale(0.5)));

        assert_eq!(moved.min, Vector3::new(1.5, -0.5, -0.5));
        assert_eq!(moved.max, Vector3::new(2.5, 0.5, 0.5));
    }

    #[test]
    fn test_triangle_intersection_is_two_sided() {
        let triangle = [
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];

        let front = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let miss = Ray::new(Vector3::new(2.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let behind = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, -1.0));

        assert!((front.intersect_triangle(&triangle).unwrap() - 5.0).abs() < EPS);
        assert!((back.intersect_triangle(&triangle).unwrap() - 5.0).abs() < EPS);
        assert!(miss.intersect_triangle(&triangle).is_none());
        assert!(behind.intersect_triangle(&triangle).is_none());
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let camera = front_camera();
        let picker = ObjectPicker::new();

        let center = picker.screen_to_ray((200.0, 200.0), viewport(), &camera).unwrap();
        let corner = picker.screen_to_ray((0.0, 0.0), viewport(), &camera).unwrap();

        assert!((center.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < EPS);
        assert!((corner.direction - center.direction).magnitude() < EPS);
        // Top-left pixel maps to the frustum corner (-2, 2)
        assert!((corner.origin.x + 2.0).abs() < EPS);
        assert!((corner.origin.y - 2.0).abs() < EPS);
    }

    #[test]
    fn test_perspective_rays_share_origin() {
        let camera = PerspectiveCamera;
        let picker = ObjectPicker::new();

        let a = picker.screen_to_ray((10.0, 10.0), viewport(), &camera).unwrap();
        let b = picker.screen_to_ray((390.0, 250.0), viewport(), &camera).unwrap();

        // Extend both back to the eye plane; they should meet at the eye
        let back_a = a.point_at((10.0 - a.origin.z) / a.direction.z);
        let back_b = b.point_at((10.0 - b.origin.z) / b.direction.z);
        assert!((back_a - Vector3::new(0.0, 0.0, 10.0)).magnitude() < 1e-3);
        assert!((back_b - Vector3::new(0.0, 0.0, 10.0)).magnitude() < 1e-3);
        assert!((a.direction - b.direction).magnitude() > 0.1);

        let hit = picker
            .pick((210.0, 200.0), viewport(), &camera, &[unit_box(1, Vector3::zero())])
            .unwrap();
        assert_eq!(hit.object, ObjectId(1));
        assert!((hit.point.z - 0.5).abs() < EPS);
    }

    #[test]
    fn test_pick_hits_front_face() {
        let camera = front_camera();
        let picker = ObjectPicker::new();
        let objects = [unit_box(7, Vector3::zero())];

        // Off the face diagonal so exactly one triangle is hit
        let hit = picker.pick((210.0, 200.0), viewport(), &camera, &objects).unwrap();

        assert_eq!(hit.object, ObjectId(7));
        assert!((hit.point - Vector3::new(0.1, 0.0, 0.5)).magnitude() < EPS);
        assert!((hit.normal - Vector3::new(0.0, 0.0, 1.0)).magnitude() < EPS);
    }

    #[test]
    fn test_pick_outside_silhouette_misses() {
        let camera = front_camera();
        let picker = ObjectPicker::new();
        let objects = [unit_box(1, Vector3::zero())];

        // Box covers pixels 150..250; these are outside
        for pointer in [(10.0, 10.0), (140.0, 200.0), (200.0, 260.0), (399.0, 0.0)] {
            assert!(picker.pick(pointer, viewport(), &camera, &objects).is_none());
        }
        assert!(picker.pick((200.0, 200.0), viewport(), &camera, &[]).is_none());
    }

    #[test]
    fn test_nearest_object_wins() {
        let camera = front_camera();
        let picker = ObjectPicker::new();
        let objects = [
            unit_box(1, Vector3::new(0.0, 0.0, -2.0)),
            unit_box(2, Vector3::new(0.0, 0.0, 1.0)),
            unit_box(3, Vector3::new(0.2, 0.0, -4.0)),
        ];

        let hit = picker.pick((210.0, 200.0), viewport(), &camera, &objects).unwrap();
        assert_eq!(hit.object, ObjectId(2));
        assert!((hit.point.z - 1.5).abs() < EPS);
    }

    #[test]
    fn test_pick_respects_object_transform() {
        let camera = front_camera();
        let picker = ObjectPicker::new();

        let mut transform = ObjectTransform::from_position(Vector3::new(1.0, 0.0, 0.0));
        transform.rotation = Vector3::new(0.0, std::f32::consts::FRAC_PI_4, 0.0);
        transform.scale = 0.5;
        let object = Object::new(ObjectId(4), "box", Arc::new(generate_box([1.0, 1.0, 1.0])), transform);

        // Pixel 310 is world x = 1.1, just right of the front edge at x = 1
        let hit = picker.pick((310.0, 200.0), viewport(), &camera, &[object]).unwrap();

        // Rotated 45 degrees, the front edge sits at z = 0.5 * sqrt(2) and the
        // face beside it recedes one unit of z per unit of x
        let expected_z = 0.5 * std::f32::consts::SQRT_2 - 0.1;
        assert!((hit.point.z - expected_z).abs() < 1e-3);
        assert!((hit.distance - (10.0 - 0.1 - expected_z)).abs() < 1e-3);
        assert!((hit.normal.magnitude() - 1.0).abs() < EPS);
        assert!((hit.normal - Vector3::new(1.0, 0.0, 1.0).normalize()).magnitude() < 1e-3);
    }

    #[test]
    fn test_hits_lie_on_sphere_surface() {
        let camera = front_camera();
        let picker = ObjectPicker::new();
        let sphere = Object::new(
            ObjectId(9),
            "sphere",
            Arc::new(generate_sphere(1.0, 48, 24)),
            ObjectTransform::default(),
        );
        let objects = [sphere];
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let pointer = (rng.random_range(0.0..400.0), rng.random_range(0.0..400.0));
            let ray = picker.screen_to_ray(pointer, viewport(), &camera).unwrap();
            let radial = (ray.origin.x * ray.origin.x + ray.origin.y * ray.origin.y).sqrt();

            match picker.pick(pointer, viewport(), &camera, &objects) {
                Some(hit) => {
                    // Tessellated surface sits just inside the true sphere
                    let r = hit.point.magnitude();
                    assert!(r <= 1.0 + EPS && r > 0.95, "radius {} at {:?}", r, pointer);
                    assert!(hit.point.z >= -EPS);
                }
                None => assert!(radial > 0.95, "missed at radial distance {}", radial),
            }
        }
    }

    #[test]
    fn test_closest_axis_parameter() {
        // Ray straight down the -Z axis through x = 3 crosses the X axis at s = 3
        let ray = Ray::new(Vector3::new(3.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let s = ray
            .closest_axis_parameter(Vector3::zero(), Vector3::unit_x())
            .unwrap();
        assert!((s - 3.0).abs() < EPS);

        // Looking down the axis itself is ill-conditioned
        assert!(ray
            .closest_axis_parameter(Vector3::zero(), Vector3::unit_z())
            .is_none());
    }
}
