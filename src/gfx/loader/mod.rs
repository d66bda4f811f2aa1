//! # Mesh Loader
//!
//! Fetches mesh assets and decodes them off the calling thread. Each load
//! runs on its own worker thread and resolves through a
//! [`LoadFuture`]; the caller polls it from whatever loop it already runs.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use socket_viewer::gfx::loader::{DirectorySource, MeshLoader};
//!
//! let loader = MeshLoader::new(Arc::new(DirectorySource::new("media")));
//! let mesh = pollster::block_on(loader.load("Sphere_40mm.stl"))?;
//! println!("{} triangles", mesh.triangle_count());
//! # Ok::<(), socket_viewer::error::AssetError>(())
//! ```

pub mod stl;

use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use futures::{
    channel::oneshot,
    future::{self, BoxFuture, Either},
    FutureExt,
};
use log::{debug, info, warn};

use crate::{error::AssetError, gfx::geometry::MeshGeometry};

/// Future resolving to a decoded, shareable mesh
pub type LoadFuture = BoxFuture<'static, Result<Arc<MeshGeometry>, AssetError>>;

/// Where asset bytes come from
///
/// Implementations are called on loader worker threads.
pub trait AssetSource: Send + Sync + 'static {
    /// Return the raw bytes stored at `path`
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Reads assets from a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySource {
    origin: PathBuf,
}

impl DirectorySource {
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &PathBuf {
        &self.origin
    }
}

impl AssetSource for DirectorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full_path = self.origin.join(path);
        std::fs::read(&full_path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound {
                path: full_path.display().to_string(),
            },
            _ => AssetError::Fetch {
                path: full_path.display().to_string(),
                source: err,
            },
        })
    }
}

/// Serves assets from memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(path.to_string(), bytes.into());
    }

    pub fn with_asset(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound {
                path: path.to_string(),
            })
    }
}

/// Spawns background fetch-and-decode jobs
#[derive(Clone)]
pub struct MeshLoader {
    source: Arc<dyn AssetSource>,
    timeout: Option<Duration>,
}

impl MeshLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            timeout: None,
        }
    }

    /// Fail loads that take longer than `timeout`; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start loading `path` and return a future for the result.
    ///
    /// Work begins immediately; the future only collects the outcome.
    pub fn load(&self, path: &str) -> LoadFuture {
        info!("Loading mesh {}", path);

        let (tx, rx) = oneshot::channel();
        let source = Arc::clone(&self.source);
        let job_path = path.to_string();

        let spawned = thread::Builder::new()
            .name(format!("mesh-loader:{}", path))
            .spawn(move || {
                let result = source
                    .fetch(&job_path)
                    .and_then(|bytes| stl::parse_stl(&job_path, &bytes))
                    .map(Arc::new);
                if let Ok(mesh) = &result {
                    debug!(
                        "Decoded {}: {} vertices, {} triangles",
                        job_path,
                        mesh.vertex_count(),
                        mesh.triangle_count()
                    );
                }
                // The receiver may be gone if the load timed out
                let _ = tx.send(result);
            });

        if let Err(err) = spawned {
            warn!("Could not start loader thread for {}: {}", path, err);
            return future::ready(Err(AssetError::Fetch {
                path: path.to_string(),
                source: err,
            }))
            .boxed();
        }

        let cancelled_path = path.to_string();
        let received = rx
            .map(move |outcome| {
                outcome.unwrap_or(Err(AssetError::Cancelled {
                    path: cancelled_path,
                }))
            })
            .boxed();

        match self.timeout {
            None => received,
            Some(after) => {
                let path = path.to_string();
                future::select(received, deadline(after))
                    .map(move |either| match either {
                        Either::Left((result, _)) => result,
                        Either::Right(((), _)) => {
                            warn!("Loading {} timed out after {:?}", path, after);
                            Err(AssetError::TimedOut { path, after })
                        }
                    })
                    .boxed()
            }
        }
    }
}

/// Resolves after `after` has elapsed.
///
/// The timer thread exits early once the returned future is dropped.
fn deadline(after: Duration) -> BoxFuture<'static, ()> {
    let (fire_tx, fire_rx) = oneshot::channel::<()>();
    let (guard_tx, guard_rx) = mpsc::channel::<()>();

    let spawned = thread::Builder::new()
        .name("mesh-loader-timer".to_string())
        .spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = guard_rx.recv_timeout(after) {
                let _ = fire_tx.send(());
            }
        });

    if let Err(err) = spawned {
        warn!("Could not start load timer, waiting without a timeout: {}", err);
        return future::pending().boxed();
    }

    async move {
        let _guard = guard_tx;
        if fire_rx.await.is_err() {
            future::pending::<()>().await;
        }
    }
    .boxed()
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use crate::gfx::geometry::MeshGeometry;

    /// Encode a mesh as binary STL
    pub fn binary_stl(mesh: &MeshGeometry) -> Vec<u8> {
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());

        for i in 0..mesh.triangle_count() {
            let normal = mesh.face_normal(i);
            for c in [normal.x, normal.y, normal.z] {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
            for corner in mesh.triangle(i) {
                for c in [corner.x, corner.y, corner.z] {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
        bytes
    }

    /// Encode a mesh as ASCII STL
    pub fn ascii_stl(mesh: &MeshGeometry) -> String {
        let mut text = String::from("solid fixture\n");
        for i in 0..mesh.triangle_count() {
            let n = mesh.face_normal(i);
            text.push_str(&format!("  facet normal {} {} {}\n", n.x, n.y, n.z));
            text.push_str("    outer loop\n");
            for v in mesh.triangle(i) {
                text.push_str(&format!("      vertex {} {} {}\n", v.x, v.y, v.z));
            }
            text.push_str("    endloop\n");
            text.push_str("  endfacet\n");
        }
        text.push_str("endsolid fixture\n");
        text
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::{ascii_stl, binary_stl};
    use super::*;
    use crate::gfx::geometry::{generate_box, generate_sphere};

    struct SlowSource {
        delay: Duration,
        inner: MemorySource,
    }

    impl AssetSource for SlowSource {
        fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
            thread::sleep(self.delay);
            self.inner.fetch(path)
        }
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_asset("sphere.stl", binary_stl(&generate_sphere(20.0, 16, 8)))
            .with_asset("box.stl", ascii_stl(&generate_box([1.0, 2.0, 3.0])))
            .with_asset("broken.stl", b"solid broken\nfacet normal 0 0 oops\n".to_vec())
    }

    #[test]
    fn test_load_binary_and_ascii() {
        let loader = MeshLoader::new(Arc::new(source()));

        let sphere = pollster::block_on(loader.load("sphere.stl")).unwrap();
        assert!(sphere.triangle_count() > 0);
        assert!((sphere.bounding_sphere().radius - 20.0).abs() < 1e-3);

        let cube = pollster::block_on(loader.load("box.stl")).unwrap();
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_missing_asset_is_not_found() {
        let loader = MeshLoader::new(Arc::new(source()));
        let err = pollster::block_on(loader.load("absent.stl")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound { ref path } if path == "absent.stl"));
    }

    #[test]
    fn test_malformed_asset() {
        let loader = MeshLoader::new(Arc::new(source()));
        let err = pollster::block_on(loader.load("broken.stl")).unwrap_err();
        assert!(matches!(err, AssetError::Malformed { .. }));
    }

    #[test]
    fn test_directory_source_reports_missing_files() {
        let source = DirectorySource::new(std::env::temp_dir().join("socket-viewer-no-such-dir"));
        let err = source.fetch("mesh.stl").unwrap_err();
        assert!(matches!(err, AssetError::NotFound { .. }));
    }

    #[test]
    fn test_directory_source_reads_files() {
        let dir = std::env::temp_dir().join(format!("socket-viewer-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cube.stl"), binary_stl(&generate_box([1.0, 1.0, 1.0]))).unwrap();

        let loader = MeshLoader::new(Arc::new(DirectorySource::new(&dir)));
        let cube = pollster::block_on(loader.load("cube.stl")).unwrap();
        assert_eq!(cube.triangle_count(), 12);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_slow_load_times_out() {
        let slow = SlowSource {
            delay: Duration::from_millis(500),
            inner: source(),
        };
        let loader = MeshLoader::new(Arc::new(slow)).with_timeout(Some(Duration::from_millis(20)));

        let err = pollster::block_on(loader.load("sphere.stl")).unwrap_err();
        assert!(matches!(err, AssetError::TimedOut { after, .. } if after == Duration::from_millis(20)));
    }

    #[test]
    fn test_fast_load_beats_timeout() {
        let loader = MeshLoader::new(Arc::new(source())).with_timeout(Some(Duration::from_secs(30)));
        assert!(pollster::block_on(loader.load("box.stl")).is_ok());
    }

    #[test]
    fn test_pending_until_worker_finishes() {
        let slow = SlowSource {
            delay: Duration::from_millis(200),
            inner: source(),
        };
        let loader = MeshLoader::new(Arc::new(slow));
        let mut load = loader.load("box.stl");

        let mut cx = std::task::Context::from_waker(futures::task::noop_waker_ref());
        assert!(load.poll_unpin(&mut cx).is_pending());
        assert!(pollster::block_on(load).is_ok());
    }
}
