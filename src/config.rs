//! Viewer configuration
//!
//! Every tunable constant lives here with its default. [`ViewerConfig::from_env`]
//! overlays `SOCKET_VIEWER_*` environment variables on top of the defaults.

use std::{f32::consts::FRAC_PI_2, path::PathBuf, str::FromStr, time::Duration};

use cgmath::{Vector3, Zero};
use log::debug;

use crate::error::ConfigError;

pub const ENV_ASSET_ORIGIN: &str = "SOCKET_VIEWER_ASSET_ORIGIN";
pub const ENV_STATIC_MESH: &str = "SOCKET_VIEWER_STATIC_MESH";
pub const ENV_MOVABLE_MESH: &str = "SOCKET_VIEWER_MOVABLE_MESH";
pub const ENV_WORLD_SCALE: &str = "SOCKET_VIEWER_WORLD_SCALE";
pub const ENV_SNAP_INCREMENT: &str = "SOCKET_VIEWER_SNAP_INCREMENT";
pub const ENV_LOAD_TIMEOUT_SECS: &str = "SOCKET_VIEWER_LOAD_TIMEOUT_SECS";

/// Where the two meshes come from
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    /// Directory the relative asset paths resolve against
    pub origin: PathBuf,
    pub static_mesh: String,
    pub movable_mesh: String,
    /// `None` waits forever
    pub load_timeout: Option<Duration>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            origin: PathBuf::from("media"),
            static_mesh: "Scapula (2).stl".to_string(),
            movable_mesh: "Sphere_40mm.stl".to_string(),
            load_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// How the static mesh is lifted off the grid after loading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshLift {
    /// Position `(0, (r - inset) * s, (r - inset) / 2 * s)` where `r` is the
    /// mesh's bounding-sphere radius and `s` the world scale
    BoundingSphere { radius_inset: f32 },
    /// Explicit world position
    Fixed(Vector3<f32>),
}

/// Orientation and placement of the static mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticMeshPose {
    /// Euler angles in radians
    pub rotation: Vector3<f32>,
    pub lift: MeshLift,
}

impl Default for StaticMeshPose {
    fn default() -> Self {
        Self {
            // Assets are authored Z-up
            rotation: Vector3::new(-FRAC_PI_2, 0.0, 0.0),
            lift: MeshLift::BoundingSphere { radius_inset: 10.0 },
        }
    }
}

impl StaticMeshPose {
    /// World position for a mesh with the given bounding-sphere radius
    pub fn position(&self, bounding_radius: f32, world_scale: f32) -> Vector3<f32> {
        match self.lift {
            MeshLift::BoundingSphere { radius_inset } => {
                let lifted = bounding_radius - radius_inset;
                Vector3::new(0.0, lifted * world_scale, lifted / 2.0 * world_scale)
            }
            MeshLift::Fixed(position) => position,
        }
    }
}

/// Where the movable object lands relative to the picked point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementOffset {
    /// Add the same amount to every axis
    Flat(f32),
    /// Move along the hit face normal. `None` uses the movable mesh's
    /// bounding-sphere radius times the world scale.
    SurfaceNormal { radius: Option<f32> },
}

impl Default for PlacementOffset {
    fn default() -> Self {
        PlacementOffset::Flat(0.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    pub offset: PlacementOffset,
    /// Start loading the movable mesh with the session instead of on first pick
    pub preload: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            offset: PlacementOffset::default(),
            preload: false,
        }
    }
}

/// Initial camera setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Vertical extent of the orthographic frustum
    pub frustum_size: f32,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frustum_size: 3.0,
            zoom: 1.4,
            near: 0.1,
            far: 1000.0,
            position: Vector3::new(2.0, 2.0, 2.0),
            target: Vector3::zero(),
            rotate_speed: 0.01,
            zoom_speed: 0.1,
        }
    }
}

/// Ground grid and lighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayConfig {
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub grid_center_color: u32,
    pub grid_color: u32,
    pub clear_color: [f64; 3],
    /// Ambient radiance; the shader divides diffuse terms by pi
    pub ambient: [f32; 3],
    /// Direction towards the light
    pub light_direction: Vector3<f32>,
    pub light_intensity: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            grid_size: 2.5,
            grid_divisions: 50,
            grid_center_color: 0x888888,
            grid_color: 0x222222,
            clear_color: [0.0, 0.0, 0.0],
            ambient: [1.0, 1.0, 1.0],
            light_direction: Vector3::new(1.0, 1.0, 1.0),
            light_intensity: 4.0,
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    /// Uniform factor from asset units (millimetres) to display units
    pub world_scale: f32,
    /// Step the manipulator rounds positions to; zero or less disables snapping
    pub snap_increment: f32,
    pub placement: PlacementConfig,
    pub static_pose: StaticMeshPose,
    pub camera: CameraConfig,
    pub display: DisplayConfig,
    /// Pointer travel in pixels below which a press/release pair counts as a click
    pub click_slop: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: AssetConfig::default(),
            world_scale: 0.01,
            snap_increment: 0.05,
            placement: PlacementConfig::default(),
            static_pose: StaticMeshPose::default(),
            camera: CameraConfig::default(),
            display: DisplayConfig::default(),
            click_slop: 4.0,
        }
    }
}

impl ViewerConfig {
    /// Defaults overlaid with `SOCKET_VIEWER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by environment variable name
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(origin) = lookup(ENV_ASSET_ORIGIN) {
            config.assets.origin = PathBuf::from(origin);
        }
        if let Some(path) = lookup(ENV_STATIC_MESH) {
            config.assets.static_mesh = path;
        }
        if let Some(path) = lookup(ENV_MOVABLE_MESH) {
            config.assets.movable_mesh = path;
        }
        if let Some(value) = lookup(ENV_WORLD_SCALE) {
            let scale: f32 = parse(ENV_WORLD_SCALE, &value)?;
            config = config.with_world_scale(positive(ENV_WORLD_SCALE, scale)?);
        }
        if let Some(value) = lookup(ENV_SNAP_INCREMENT) {
            let increment: f32 = parse(ENV_SNAP_INCREMENT, &value)?;
            // Zero disables snapping
            config.snap_increment = if increment == 0.0 {
                0.0
            } else {
                positive(ENV_SNAP_INCREMENT, increment)?
            };
        }
        if let Some(value) = lookup(ENV_LOAD_TIMEOUT_SECS) {
            let secs: f32 = parse(ENV_LOAD_TIMEOUT_SECS, &value)?;
            // Zero disables the timeout
            config.assets.load_timeout = if secs == 0.0 {
                None
            } else {
                let secs = positive(ENV_LOAD_TIMEOUT_SECS, secs)?;
                let timeout = Duration::try_from_secs_f32(secs).map_err(|_| ConfigError::OutOfRange {
                    key: ENV_LOAD_TIMEOUT_SECS.to_string(),
                    value: secs,
                })?;
                Some(timeout)
            };
        }

        debug!("Viewer configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_asset_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.assets.origin = origin.into();
        self
    }

    pub fn with_static_mesh(mut self, path: impl Into<String>) -> Self {
        self.assets.static_mesh = path.into();
        self
    }

    pub fn with_movable_mesh(mut self, path: impl Into<String>) -> Self {
        self.assets.movable_mesh = path.into();
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.assets.load_timeout = timeout;
        self
    }

    pub fn with_world_scale(mut self, scale: f32) -> Self {
        self.world_scale = scale;
        self
    }

    pub fn with_snap_increment(mut self, increment: f32) -> Self {
        self.snap_increment = increment;
        self
    }

    pub fn with_placement_offset(mut self, offset: PlacementOffset) -> Self {
        self.placement.offset = offset;
        self
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.placement.preload = preload;
        self
    }

    pub fn with_static_pose(mut self, pose: StaticMeshPose) -> Self {
        self.static_pose = pose;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_click_slop(mut self, pixels: f32) -> Self {
        self.click_slop = pixels;
        self
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn positive(key: &str, value: f32) -> Result<f32, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.world_scale, 0.01);
        assert_eq!(config.snap_increment, 0.05);
        assert_eq!(config.placement.offset, PlacementOffset::Flat(0.1));
        assert_eq!(config.camera.frustum_size, 3.0);
        assert_eq!(config.camera.position, Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(config.assets.load_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ViewerConfig::from_lookup(lookup(&[
            (ENV_ASSET_ORIGIN, "/srv/meshes"),
            (ENV_WORLD_SCALE, "0.001"),
            (ENV_SNAP_INCREMENT, " 0.1 "),
            (ENV_LOAD_TIMEOUT_SECS, "0"),
        ]))
        .unwrap();

        assert_eq!(config.assets.origin, PathBuf::from("/srv/meshes"));
        assert_eq!(config.world_scale, 0.001);
        assert_eq!(config.snap_increment, 0.1);
        assert_eq!(config.assets.load_timeout, None);
        assert_eq!(config.assets.static_mesh, "Scapula (2).stl");
    }

    #[test]
    fn test_invalid_overrides() {
        let err = ViewerConfig::from_lookup(lookup(&[(ENV_SNAP_INCREMENT, "fine")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_SNAP_INCREMENT.to_string(),
                value: "fine".to_string()
            }
        );

        let err = ViewerConfig::from_lookup(lookup(&[(ENV_WORLD_SCALE, "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_snap_increment_must_be_positive_or_zero() {
        for bad in ["NaN", "-0.05", "inf"] {
            let err = ViewerConfig::from_lookup(lookup(&[(ENV_SNAP_INCREMENT, bad)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::OutOfRange { ref key, .. } if key == ENV_SNAP_INCREMENT),
                "{} accepted",
                bad
            );
        }

        let config = ViewerConfig::from_lookup(lookup(&[(ENV_SNAP_INCREMENT, "0")])).unwrap();
        assert_eq!(config.snap_increment, 0.0);
    }

    #[test]
    fn test_oversized_timeout_is_rejected() {
        let err = ViewerConfig::from_lookup(lookup(&[(ENV_LOAD_TIMEOUT_SECS, "1e20")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref key, .. } if key == ENV_LOAD_TIMEOUT_SECS));

        let config = ViewerConfig::from_lookup(lookup(&[(ENV_LOAD_TIMEOUT_SECS, "2.5")])).unwrap();
        assert_eq!(config.assets.load_timeout, Some(Duration::from_secs_f32(2.5)));
    }

    #[test]
    fn test_bounding_sphere_lift() {
        let pose = StaticMeshPose::default();
        let position = pose.position(110.0, 0.01);
        assert!((position - Vector3::new(0.0, 1.0, 0.5)).magnitude2() < 1e-10);
    }
}
