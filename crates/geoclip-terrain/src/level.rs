//! Clipmap levels
//!
//! A level owns a `D x D` buffer of texels sampled from the height field at
//! its own power-of-two scale. Its placement is kept in three coordinate
//! spaces:
//! - grid position: the level's centre cell, in level units;
//! - anchor: the level's bottom-left cell, in level units. Height field
//!   cell `(anchor + (x, y)) * scale` lands in texel `(x, y)`;
//! - world position: the anchor in height field units, handed to the
//!   renderer.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use geoclip_core::{LodConfig, Result};
use glam::{IVec2, Vec2};

use crate::device::{BufferUsage, DeviceBackend, DeviceBufferHandle};
use crate::heightfield::HeightField;
use crate::placement::TrimOrientation;

/// One sample of a level's buffer, laid out for direct upload
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Texel {
    /// Height at this level's resolution
    pub height: f32,
    /// Height predicted from the next-coarser level, for blending
    pub coarse_height: f32,
    pub colour: [f32; 3],
}

pub struct ClipmapLevel {
    level: usize,
    scale: i32,
    /// Texels per side (`D`)
    size: usize,
    heightfield: Arc<HeightField>,
    /// Index of the next-coarser level in the terrain's level list
    parent: Option<usize>,
    texels: Vec<Texel>,
    grid_position: IVec2,
    anchor: IVec2,
    trim: TrimOrientation,
    /// Set when the anchor moved and the texels no longer match it
    stale: bool,
    /// Bumped every time the texels are regenerated
    revision: u64,
    uploaded_revision: Option<u64>,
    device_buffer: DeviceBufferHandle,
}

impl ClipmapLevel {
    /// Create level `level` of a pyramid built from `config`. The texel
    /// buffer is allocated but holds defaults until the first update.
    pub fn new(
        level: usize,
        config: &LodConfig,
        heightfield: Arc<HeightField>,
        parent: Option<&ClipmapLevel>,
    ) -> Self {
        let levels = config.l() as usize;
        debug_assert!(level < levels);
        debug_assert!(parent.map_or(true, |p| p.level + 1 == level));

        let size = config.d();
        Self {
            level,
            scale: 1 << (levels - 1 - level),
            size,
            heightfield,
            parent: parent.map(|p| p.level),
            texels: vec![Texel::default(); size * size],
            grid_position: IVec2::ZERO,
            anchor: IVec2::ZERO,
            trim: TrimOrientation::All,
            stale: true,
            revision: 0,
            uploaded_revision: None,
            device_buffer: DeviceBufferHandle::UNALLOCATED,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Height field cells per level cell
    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Texels per side
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn heightfield(&self) -> &HeightField {
        &self.heightfield
    }

    pub fn grid_position(&self) -> IVec2 {
        self.grid_position
    }

    /// Bottom-left cell in level units (the height field sample anchor)
    pub fn anchor(&self) -> IVec2 {
        self.anchor
    }

    /// Bottom-left corner in height field units
    pub fn position(&self) -> Vec2 {
        (self.anchor * self.scale).as_vec2()
    }

    pub fn trim(&self) -> TrimOrientation {
        self.trim
    }

    /// Whether the texels lag behind the current anchor
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether the texels changed since they were last uploaded
    pub fn is_dirty(&self) -> bool {
        self.uploaded_revision != Some(self.revision)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Row-major texels, `size * size` entries
    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn texel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn texel(&self, x: i32, y: i32) -> Option<&Texel> {
        let size = self.size as i32;
        if x < 0 || y < 0 || x >= size || y >= size {
            return None;
        }
        self.texels.get((y * size + x) as usize)
    }

    pub fn device_buffer(&self) -> DeviceBufferHandle {
        self.device_buffer
    }

    /// Move the level. Returns `true` when the anchor changed, in which case
    /// the texels must be regenerated before they are read.
    pub fn set_position(
        &mut self,
        grid_position: IVec2,
        anchor: IVec2,
        trim: TrimOrientation,
    ) -> bool {
        self.grid_position = grid_position;
        self.trim = trim;
        let moved = anchor != self.anchor;
        self.anchor = anchor;
        self.stale |= moved;
        moved
    }

    /// Resample every texel from the height field. `parent` must be the
    /// next-coarser level, already updated for this frame.
    ///
    /// `(anchor + size) * scale` must fit in `i32`; `Terrain` keeps it there
    /// by clamping the viewer to `VIEWER_LIMIT`.
    pub fn update_sample_buffer(&mut self, parent: Option<&ClipmapLevel>) {
        debug_assert_eq!(parent.map(|p| p.level), self.parent);

        let size = self.size as i32;
        for y in 0..size {
            for x in 0..size {
                let local = IVec2::new(x, y);
                let cell = (self.anchor + local) * self.scale;
                let height = self.heightfield.value(cell.x, cell.y);
                let colour = self.heightfield.colour(cell.x, cell.y);
                let coarse_height = parent
                    .and_then(|p| p.coarse_estimate(self.anchor, local))
                    .unwrap_or(height);

                self.texels[(y * size + x) as usize] = Texel {
                    height,
                    coarse_height,
                    colour,
                };
            }
        }

        self.stale = false;
        self.revision += 1;
    }

    /// Height a child texel would have if it were interpolated from this
    /// level: 1, 2 or 4 of our texels depending on the child cell's parity.
    /// `child_anchor` is always even, so the parity is that of `local`.
    fn coarse_estimate(&self, child_anchor: IVec2, local: IVec2) -> Option<f32> {
        let base = IVec2::new(child_anchor.x.div_euclid(2), child_anchor.y.div_euclid(2))
            - self.anchor
            + IVec2::new(local.x >> 1, local.y >> 1);
        let xs: &[i32] = if local.x & 1 == 0 { &[0] } else { &[0, 1] };
        let ys: &[i32] = if local.y & 1 == 0 { &[0] } else { &[0, 1] };

        let mut sum = 0.0;
        for &dy in ys {
            for &dx in xs {
                sum += self.texel(base.x + dx, base.y + dy)?.height;
            }
        }
        Some(sum / (xs.len() * ys.len()) as f32)
    }

    /// Allocate the device buffer the first time; later calls return the
    /// same handle.
    pub fn ensure_allocated<B: DeviceBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<DeviceBufferHandle> {
        if !self.device_buffer.is_allocated() {
            let label = format!("clipmap level {}", self.level);
            self.device_buffer =
                backend.allocate(&label, BufferUsage::Texels, self.texel_bytes().len())?;
            self.uploaded_revision = None;
        }
        Ok(self.device_buffer)
    }

    /// Make this level's texels current on the device and bind them.
    /// Contents are re-uploaded whenever they changed since the last bind.
    pub fn bind_device_buffer<B: DeviceBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<DeviceBufferHandle> {
        debug_assert!(!self.stale, "binding level {} with stale texels", self.level);

        let handle = self.ensure_allocated(backend)?;
        if self.is_dirty() {
            backend.upload(handle, bytemuck::cast_slice(&self.texels))?;
            self.uploaded_revision = Some(self.revision);
        }
        backend.bind(handle)?;
        Ok(handle)
    }

    pub fn unbind_device_buffer<B: DeviceBackend>(&self, backend: &mut B) {
        if self.device_buffer.is_allocated() {
            backend.unbind(self.device_buffer);
        }
    }

    /// Free the device buffer; the next bind allocates a fresh one
    pub fn release_device_buffer<B: DeviceBackend>(&mut self, backend: &mut B) {
        if self.device_buffer.is_allocated() {
            backend.release(self.device_buffer);
            self.device_buffer = DeviceBufferHandle::UNALLOCATED;
            self.uploaded_revision = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    /// 32x32 field whose height is `x + 32y`
    fn linear_field() -> Arc<HeightField> {
        let heights = (0..32 * 32).map(|i| i as f32).collect();
        Arc::new(HeightField::from_heights(32, 32, heights).unwrap())
    }

    fn config() -> LodConfig {
        LodConfig::new(4, 4, 2)
    }

    #[test]
    fn construction() {
        let config = config();
        let hf = linear_field();
        let coarsest = ClipmapLevel::new(0, &config, hf.clone(), None);
        let next = ClipmapLevel::new(1, &config, hf, Some(&coarsest));

        assert_eq!(coarsest.scale(), 8);
        assert_eq!(next.scale(), 4);
        assert_eq!(coarsest.parent(), None);
        assert_eq!(next.parent(), Some(0));
        assert_eq!(next.texels().len(), 16 * 16);
        assert_eq!(next.position(), Vec2::ZERO);
        assert!(next.is_stale());
    }

    #[test]
    fn samples_are_scaled_from_the_anchor() {
        let config = config();
        let mut level = ClipmapLevel::new(2, &config, linear_field(), None);
        assert_eq!(level.scale(), 2);

        assert!(level.set_position(IVec2::new(7, 7), IVec2::new(1, 2), TrimOrientation::TopRight));
        level.update_sample_buffer(None);
        assert!(!level.is_stale());
        assert_eq!(level.position(), Vec2::new(2.0, 4.0));

        for y in 0..16 {
            for x in 0..16 {
                let (cx, cy) = ((1 + x) * 2, (2 + y) * 2);
                let expected = if cx < 32 && cy < 32 { (cx + 32 * cy) as f32 } else { 0.0 };
                let texel = level.texel(x, y).unwrap();
                assert_eq!(texel.height, expected);
                // No parent: the coarse channel mirrors the fine one
                assert_eq!(texel.coarse_height, texel.height);
            }
        }
    }

    #[test]
    fn coarse_channel_interpolates_parent() {
        let config = config();
        let hf = linear_field();
        let mut parent = ClipmapLevel::new(2, &config, hf.clone(), None);
        parent.set_position(IVec2::new(7, 7), IVec2::ZERO, TrimOrientation::TopRight);
        parent.update_sample_buffer(None);

        let mut child = ClipmapLevel::new(3, &config, hf, Some(&parent));
        child.set_position(IVec2::new(15, 15), IVec2::new(8, 8), TrimOrientation::All);
        child.update_sample_buffer(Some(&parent));

        for y in 0..16 {
            for x in 0..16 {
                let texel = child.texel(x, y).unwrap();
                assert_eq!(texel.height, ((8 + x) + 32 * (8 + y)) as f32);
                // Linear heights: averaging neighbours reproduces the fine value
                assert_eq!(texel.coarse_height, texel.height, "at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn out_of_field_levels_are_flat() {
        let config = config();
        let mut level = ClipmapLevel::new(0, &config, linear_field(), None);
        level.set_position(IVec2::ZERO, IVec2::new(-100, -100), TrimOrientation::All);
        level.update_sample_buffer(None);
        assert!(level.texels().iter().all(|t| *t == Texel::default()));
    }

    #[test]
    fn set_position_reports_movement() {
        let config = config();
        let mut level = ClipmapLevel::new(3, &config, linear_field(), None);
        level.update_sample_buffer(None);
        assert!(!level.set_position(IVec2::new(1, 1), IVec2::ZERO, TrimOrientation::BottomLeft));
        assert!(!level.is_stale());
        assert_eq!(level.trim(), TrimOrientation::BottomLeft);
        assert!(level.set_position(IVec2::new(3, 1), IVec2::new(2, 0), TrimOrientation::BottomLeft));
        assert!(level.is_stale());
    }

    #[test]
    fn device_buffer_allocates_once_and_uploads_on_change() {
        let config = config();
        let mut device = HeadlessDevice::new();
        let mut level = ClipmapLevel::new(3, &config, linear_field(), None);
        level.update_sample_buffer(None);

        let first = level.bind_device_buffer(&mut device).unwrap();
        let second = level.bind_device_buffer(&mut device).unwrap();
        assert_eq!(first, second);
        assert_eq!(device.allocation_count(), 1);
        assert_eq!(device.upload_count(), 1);
        assert_eq!(device.bound(), Some(first));
        assert_eq!(device.buffer_data(first), Some(level.texel_bytes()));

        level.set_position(IVec2::new(5, 5), IVec2::new(2, 2), TrimOrientation::All);
        level.update_sample_buffer(None);
        assert!(level.is_dirty());
        level.bind_device_buffer(&mut device).unwrap();
        assert_eq!(device.allocation_count(), 1);
        assert_eq!(device.upload_count(), 2);
        assert_eq!(device.buffer_data(first), Some(level.texel_bytes()));

        level.unbind_device_buffer(&mut device);
        assert_eq!(device.bound(), None);

        level.release_device_buffer(&mut device);
        assert!(!level.device_buffer().is_allocated());
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn allocation_failure_propagates() {
        let config = config();
        let mut device = HeadlessDevice::with_buffer_limit(0);
        let mut level = ClipmapLevel::new(3, &config, linear_field(), None);
        level.update_sample_buffer(None);
        assert!(level.bind_device_buffer(&mut device).is_err());
        assert!(!level.device_buffer().is_allocated());
    }
}
