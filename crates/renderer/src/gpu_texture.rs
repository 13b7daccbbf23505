//! Sampled 2D texture built from [`TextureData`].

use asset::TextureData;
use wgpu::{
    AddressMode, Device, Extent3d, FilterMode, Limits, Queue, Sampler, SamplerDescriptor, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
};

use crate::RenderError;

pub const TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Reject textures wider or taller than the device's 2D limit.
pub fn check_dimensions(data: &TextureData, limits: &Limits) -> Result<(), RenderError> {
    let max = limits.max_texture_dimension_2d;
    if data.width > max || data.height > max {
        return Err(RenderError::TextureTooLarge {
            width: data.width,
            height: data.height,
            max,
        });
    }
    Ok(())
}

pub struct GpuTexture {
    texture: Texture,
    view: TextureView,
    sampler: Sampler,
}

impl GpuTexture {
    /// Upload `data` as a single-level texture with a repeating, linearly
    /// filtered sampler. RGB sources are widened to RGBA first.
    pub fn upload(device: &Device, queue: &Queue, data: &TextureData) -> Result<Self, RenderError> {
        check_dimensions(data, &device.limits())?;
        let rgba = data.to_rgba8()?;
        let size = Extent3d {
            width: rgba.width,
            height: rgba.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("Albedo"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * rgba.width),
                rows_per_image: Some(rgba.height),
            },
            size,
        );

        let view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Albedo sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        });
        log::debug!("Uploaded texture {}x{}", rgba.width, rgba.height);

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}
