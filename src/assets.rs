//! Fire-and-forget model loading.
//!
//! Requests return immediately. Results are queued on a channel and picked up
//! by the per-frame driver, so a model simply appears once its load completes.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

use crate::mesh::Mesh;
use crate::obj::load_obj_from_str;
use crate::scene::SceneObject;

/// Completed asset request.
#[derive(Debug)]
pub enum AssetEvent {
    Loaded { object: SceneObject, mesh: Mesh },
    Failed { object: SceneObject, error: anyhow::Error },
}

#[derive(Debug, Clone)]
enum AssetSource {
    /// Files relative to a directory, read on worker threads.
    Directory(PathBuf),
    /// Documents registered up front, keyed by mesh path.
    Memory(HashMap<String, String>),
}

#[derive(Debug)]
pub struct AssetLoader {
    source: AssetSource,
    sender: Sender<AssetEvent>,
    receiver: Receiver<AssetEvent>,
    pending: usize,
}

impl AssetLoader {
    pub fn from_directory(root: impl Into<PathBuf>) -> Self {
        Self::with_source(AssetSource::Directory(root.into()))
    }

    pub fn in_memory() -> Self {
        Self::with_source(AssetSource::Memory(HashMap::new()))
    }

    fn with_source(source: AssetSource) -> Self {
        let (sender, receiver) = channel();
        Self {
            source,
            sender,
            receiver,
            pending: 0,
        }
    }

    /// Registers an OBJ document for in-memory loaders.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> Result<()> {
        match &mut self.source {
            AssetSource::Memory(documents) => {
                documents.insert(name.into(), text.into());
                Ok(())
            }
            AssetSource::Directory(root) => Err(anyhow!(
                "loader reads from {}; cannot register in-memory assets",
                root.display()
            )),
        }
    }

    /// Number of requests whose results have not been drained yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Starts loading the mesh of a model object.
    pub fn request(&mut self, object: SceneObject) {
        let Some(mesh_name) = object.mesh.clone() else {
            warn!("object {} has no mesh to load", object.name);
            return;
        };
        self.pending += 1;
        debug!("loading mesh {mesh_name} for {}", object.name);
        match &self.source {
            AssetSource::Memory(documents) => {
                let result = documents
                    .get(&mesh_name)
                    .ok_or_else(|| anyhow!("asset {mesh_name} was never registered"))
                    .and_then(|text| load_obj_from_str(text));
                let _ = self.sender.send(event_for(object, result));
            }
            AssetSource::Directory(root) => {
                let path = root.join(&mesh_name);
                let sender = self.sender.clone();
                let job = move || {
                    let result = fs::read_to_string(&path)
                        .with_context(|| format!("unable to read {}", path.display()))
                        .and_then(|text| {
                            load_obj_from_str(&text)
                                .with_context(|| format!("invalid OBJ in {}", path.display()))
                        });
                    let _ = sender.send(event_for(object, result));
                };
                if !spawn_worker(format!("asset-{mesh_name}"), job) {
                    self.pending -= 1;
                }
            }
        }
    }

    /// Returns every result that arrived since the last call.
    pub fn drain(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.pending = self.pending.saturating_sub(1);
                    events.push(event);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_worker(name: String, job: impl FnOnce() + Send + 'static) -> bool {
    match thread::Builder::new().name(name).spawn(job) {
        Ok(_) => true,
        Err(err) => {
            log::error!("failed to start asset worker: {err}");
            false
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_worker(_name: String, job: impl FnOnce() + Send + 'static) -> bool {
    job();
    true
}

fn event_for(object: SceneObject, result: Result<Mesh>) -> AssetEvent {
    match result {
        Ok(mesh) => AssetEvent::Loaded { object, mesh },
        Err(error) => AssetEvent::Failed { object, error },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::scene::ObjectType;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn model(mesh: &str) -> SceneObject {
        SceneObject {
            name: "Model".into(),
            object_type: ObjectType::Model,
            mesh: Some(mesh.into()),
            ..SceneObject::default()
        }
    }

    fn drain_all(loader: &mut AssetLoader) -> Vec<AssetEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while loader.pending() > 0 && Instant::now() < deadline {
            events.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn in_memory_assets_resolve_on_next_drain() {
        let mut loader = AssetLoader::in_memory();
        loader.insert("tri.obj", TRIANGLE).unwrap();
        loader.request(model("tri.obj"));
        loader.request(model("missing.obj"));
        assert_eq!(loader.pending(), 2);

        let events = loader.drain();
        assert_eq!(loader.pending(), 0);
        assert!(matches!(&events[0], AssetEvent::Loaded { mesh, .. } if mesh.vertex_count() == 3));
        assert!(matches!(&events[1], AssetEvent::Failed { .. }));
    }

    #[test]
    fn directory_loads_complete_in_the_background() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("tri.obj")).unwrap();
        file.write_all(TRIANGLE.as_bytes()).unwrap();

        let mut loader = AssetLoader::from_directory(dir.path());
        assert!(loader.insert("x.obj", TRIANGLE).is_err());
        loader.request(model("tri.obj"));
        loader.request(model("absent.obj"));

        let events = drain_all(&mut loader);
        assert_eq!(events.len(), 2);
        let loaded = events
            .iter()
            .filter(|event| matches!(event, AssetEvent::Loaded { .. }))
            .count();
        assert_eq!(loaded, 1);
    }

    #[test]
    fn objects_without_mesh_are_ignored() {
        let mut loader = AssetLoader::in_memory();
        let mut object = model("unused");
        object.mesh = None;
        loader.request(object);
        assert_eq!(loader.pending(), 0);
        assert!(loader.drain().is_empty());
    }
}
