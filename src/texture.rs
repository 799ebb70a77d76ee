use std::sync::Arc;

use crate::gpu::GpuContext;

/// Identity of one loaded image.
///
/// Every load produces a fresh id, even when the same source is fetched again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u64);

/// A decoded RGBA8 image waiting to be attached to a material.
///
/// Cloning is cheap: the pixel data is shared.
#[derive(Clone)]
pub struct TextureImage {
    pub id: TextureId,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pixels: Arc<[u8]>,
}

impl std::fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureImage")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl TextureImage {
    /// Wrap raw RGBA8 pixels. `pixels.len()` must equal `width * height * 4`.
    pub fn from_rgba(
        id: TextureId,
        label: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            id,
            label: label.into(),
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Decode an encoded image (JPEG, PNG) from memory.
    pub fn decode(
        id: TextureId,
        label: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(id, label, width, height, img.into_raw()))
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Longitude wraps around the sphere, latitude stops at the poles.
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Upload a decoded image.
    pub fn from_image(gpu: &GpuContext, image: &TextureImage) -> Self {
        Self::from_rgba(gpu, image.pixels(), image.width, image.height, &image.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_png_bytes() {
        let mut encoded = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        img.write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .unwrap();

        let texture = TextureImage::decode(TextureId(7), "tiny", &encoded).unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.pixels().len(), 2 * 3 * 4);
        assert_eq!(&texture.pixels()[..4], &[10, 20, 30, 255]);
        assert_eq!(texture.id, TextureId(7));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(TextureImage::decode(TextureId(1), "junk", b"not an image").is_err());
    }

    #[test]
    fn clones_share_pixels() {
        let a = TextureImage::from_rgba(TextureId(3), "a", 1, 1, vec![1, 2, 3, 4]);
        let b = a.clone();
        assert!(std::ptr::eq(a.pixels().as_ptr(), b.pixels().as_ptr()));
    }
}
