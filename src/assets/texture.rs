use std::fmt;
use std::path::PathBuf;

use image::{DynamicImage, GenericImageView};
use tracing::{error, info};
use wgpu::{Device, Queue, TextureFormat};

use super::AssetError;

/// Where a texture image comes from: a local file or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    Path(PathBuf),
    Url(String),
}

impl TextureSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            TextureSource::Url(source.to_string())
        } else {
            TextureSource::Path(PathBuf::from(source))
        }
    }

    pub async fn fetch_image(&self) -> Result<DynamicImage, AssetError> {
        let bytes = match self {
            TextureSource::Path(path) => tokio::fs::read(path).await.map_err(|source| AssetError::Io {
                path: path.clone(),
                source,
            })?,
            TextureSource::Url(url) => {
                let fetch = |source| AssetError::Fetch {
                    url: url.clone(),
                    source,
                };
                let response = reqwest::get(url.as_str())
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch)?;
                response.bytes().await.map_err(fetch)?.to_vec()
            }
        };
        let img = image::load_from_memory(&bytes)?;
        info!("Loaded texture {} ({}x{})", self, img.width(), img.height());
        Ok(img)
    }

    /// Like [`fetch_image`](Self::fetch_image) but logs and yields `None` on
    /// failure, so the caller keeps its fallback.
    pub async fn fetch_or_log(&self) -> Option<DynamicImage> {
        match self.fetch_image().await {
            Ok(img) => Some(img),
            Err(e) => {
                error!("Failed to load texture {}: {}", self, e);
                None
            }
        }
    }
}

impl fmt::Display for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSource::Path(path) => write!(f, "{}", path.display()),
            TextureSource::Url(url) => write!(f, "{}", url),
        }
    }
}

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

    /// 1x1 texture of a single colour, used until a real image arrives.
    pub fn solid(device: &Device, queue: &Queue, rgba: [u8; 4], label: &str) -> Self {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba)));
        Self::from_image(device, queue, &img, Some(label))
    }

    pub fn from_image(device: &Device, queue: &Queue, img: &DynamicImage, label: Option<&str>) -> Self {
        let rgba = img.to_rgba8();
        let dimensions = img.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Cube faces sample with a repeat factor, so wrap instead of clamping
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self { texture, view, sampler }
    }

    pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self { texture, view, sampler }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parsing() {
        assert_eq!(
            TextureSource::parse("https://example.com/cube.jpg"),
            TextureSource::Url("https://example.com/cube.jpg".to_string())
        );
        assert_eq!(
            TextureSource::parse("assets/textures/cube.jpg"),
            TextureSource::Path(PathBuf::from("assets/textures/cube.jpg"))
        );
    }

    #[tokio::test]
    async fn test_local_image_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let img = TextureSource::Path(path).fetch_image().await.unwrap();
        assert_eq!(img.dimensions(), (4, 2));
    }

    #[tokio::test]
    async fn test_missing_image_falls_back() {
        let source = TextureSource::parse("nowhere/cube.jpg");
        assert!(matches!(source.fetch_image().await, Err(AssetError::Io { .. })));
        assert!(source.fetch_or_log().await.is_none());
    }
}
