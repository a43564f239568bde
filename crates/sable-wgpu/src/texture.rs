//! Texture slot registry backing the image API.
//!
//! Slots are recycled the same way the core hands out ids, each texture
//! carries the sampler its flags asked for, and deletion parks the GPU
//! objects in a [`RetireRing`] instead of dropping them while a prior
//! frame may still reference them.

use sable::{Error, ImageFlags, TextureId, TextureInfo, TextureKind};

pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub info: TextureInfo,
}

pub(crate) struct TextureStore {
    slots: Vec<Option<GpuTexture>>,
    max_size: u32,
}

impl TextureStore {
    pub fn new(max_size: u32) -> Self {
        Self {
            slots: Vec::new(),
            max_size,
        }
    }

    pub fn create(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: TextureKind,
        width: u32,
        height: u32,
        flags: ImageFlags,
        data: Option<&[u8]>,
    ) -> Result<TextureId, Error> {
        if width > self.max_size || height > self.max_size {
            return Err(Error::TextureSize {
                width,
                height,
                max: self.max_size,
            });
        }
        let expected = (width * height * kind.bytes_per_pixel()) as usize;
        if let Some(d) = data {
            if d.len() != expected {
                return Err(Error::ImageData {
                    expected,
                    got: d.len(),
                });
            }
        }

        let format = match kind {
            TextureKind::Rgba => wgpu::TextureFormat::Rgba8Unorm,
            TextureKind::Alpha => wgpu::TextureFormat::R8Unorm,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sable image"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if let Some(d) = data {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                d,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * kind.bytes_per_pixel()),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, flags);
        let entry = GpuTexture {
            texture,
            view,
            sampler,
            info: TextureInfo {
                kind,
                flags,
                width,
                height,
            },
        };

        let index = match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(entry);
                i
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        Ok(TextureId::from_index(index))
    }

    /// Rewrites the full-width band starting at row `y`.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        id: TextureId,
        y: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        let tex = self
            .slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownTexture(id))?;
        if y + height > tex.info.height {
            return Err(Error::TextureSize {
                width: tex.info.width,
                height: y + height,
                max: tex.info.height,
            });
        }
        let stride = tex.info.width * tex.info.kind.bytes_per_pixel();
        let expected = (stride * height) as usize;
        if data.len() != expected {
            return Err(Error::ImageData {
                expected,
                got: data.len(),
            });
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(stride),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width: tex.info.width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Removes a texture from the registry, handing its GPU objects to the
    /// caller for deferred destruction.
    pub fn take(&mut self, id: TextureId) -> Option<GpuTexture> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    pub fn info(&self, id: TextureId) -> Option<TextureInfo> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|t| t.info)
    }

    /// Live textures with the ids the core knows them by.
    pub fn iter_live(&self) -> impl Iterator<Item = (TextureId, &GpuTexture)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|t| (TextureId::from_index(i), t)))
    }
}

/// Deferred destruction for resources a queued submission may still read.
///
/// Deletions collect in a staging list and move into a slot on the next
/// [`cycle`](RetireRing::cycle); whatever that slot held from its previous
/// turn is dropped then. With one slot per frame in flight, a resource
/// outlives every submission recorded before its deletion.
pub(crate) struct RetireRing<T> {
    incoming: Vec<T>,
    slots: Vec<Vec<T>>,
    cursor: usize,
}

impl<T> RetireRing<T> {
    pub fn new(slots: usize) -> Self {
        Self {
            incoming: Vec::new(),
            slots: (0..slots).map(|_| Vec::new()).collect(),
            cursor: 0,
        }
    }

    /// Parks a resource until its slot cycles around again.
    pub fn park(&mut self, value: T) {
        self.incoming.push(value);
    }

    /// Called once per flush. Stages the resources parked since the last
    /// call and drops the batch from the current slot's previous turn.
    pub fn cycle(&mut self) {
        self.slots[self.cursor] = std::mem::take(&mut self.incoming);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }
}

/// One sampler per texture, shaped by its image flags. The mipmap flag is
/// only a filtering hint; no mip chain is generated.
fn create_sampler(device: &wgpu::Device, flags: ImageFlags) -> wgpu::Sampler {
    let address = |repeat: bool| {
        if repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        }
    };
    let filter = if flags.contains(ImageFlags::NEAREST) {
        wgpu::FilterMode::Nearest
    } else {
        wgpu::FilterMode::Linear
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sable sampler"),
        address_mode_u: address(flags.contains(ImageFlags::REPEAT_X)),
        address_mode_v: address(flags.contains(ImageFlags::REPEAT_Y)),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: filter,
        ..Default::default()
    })
}
