pub mod manager;
pub mod model;
pub mod texture;

use std::path::PathBuf;

pub use manager::{AssetLoader, LoadedModel, ModelRequests};
pub use model::{ColladaModelLoader, ModelData};
pub use texture::{Texture, TextureSource};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("{path:?} contains no triangles")]
    EmptyModel { path: PathBuf },
    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}
