use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::model::ModelData;

#[async_trait]
pub trait AssetLoader<A> {
    async fn load(&self, path: &Path) -> Result<A>;
}

pub type SharedModelLoader = Arc<dyn AssetLoader<ModelData> + Send + Sync>;

/// A finished load, carrying whatever the requester attached to it.
#[derive(Debug)]
pub struct LoadedModel<T> {
    pub tag: T,
    pub path: PathBuf,
    pub result: Result<ModelData>,
}

/// Model loads running on the tokio runtime. Results are picked up by
/// polling from the frame loop, so nothing here blocks a frame.
pub struct ModelRequests<T> {
    runtime: Handle,
    loader: SharedModelLoader,
    tx: mpsc::UnboundedSender<LoadedModel<T>>,
    rx: mpsc::UnboundedReceiver<LoadedModel<T>>,
    pending: usize,
}

impl<T: Send + 'static> ModelRequests<T> {
    pub fn new(runtime: Handle, loader: SharedModelLoader) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            loader,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn request(&mut self, path: impl Into<PathBuf>, tag: T) {
        let path = path.into();
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        debug!("Requesting model {:?}", path);

        self.pending += 1;
        self.runtime.spawn(async move {
            let result = loader.load(&path).await;
            if tx.send(LoadedModel { tag, path, result }).is_err() {
                warn!("Model load finished after its requester went away");
            }
        });
    }

    /// Loads requested but not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Every load that has completed since the last poll.
    pub fn poll(&mut self) -> Vec<LoadedModel<T>> {
        let mut finished = Vec::new();
        while let Ok(loaded) = self.rx.try_recv() {
            finished.push(loaded);
        }
        self.pending = self.pending.saturating_sub(finished.len());
        finished
    }

    /// Wait for the next completed load.
    pub async fn next(&mut self) -> Option<LoadedModel<T>> {
        if self.pending == 0 {
            return None;
        }
        let loaded = self.rx.recv().await?;
        self.pending -= 1;
        Some(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLoader;

    #[async_trait]
    impl AssetLoader<ModelData> for FixedLoader {
        async fn load(&self, path: &Path) -> Result<ModelData> {
            if path.ends_with("missing.dae") {
                anyhow::bail!("no such model");
            }
            Ok(ModelData {
                positions: vec![[0.0; 3]; 3],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                indices: vec![0, 1, 2],
            })
        }
    }

    #[tokio::test]
    async fn test_results_carry_their_tag() {
        let mut requests = ModelRequests::new(Handle::current(), Arc::new(FixedLoader));
        assert!(requests.poll().is_empty());

        requests.request("good.dae", 1u32);
        assert_eq!(requests.pending(), 1);
        let loaded = requests.next().await.unwrap();
        assert_eq!(loaded.tag, 1);
        assert_eq!(loaded.result.unwrap().triangle_count(), 1);

        requests.request("missing.dae", 2u32);
        let loaded = requests.next().await.unwrap();
        assert_eq!(loaded.tag, 2);
        assert!(loaded.result.is_err());
        assert_eq!(requests.pending(), 0);
        assert!(requests.next().await.is_none());
    }
}
