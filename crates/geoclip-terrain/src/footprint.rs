//! Footprint mesh generation
//!
//! A footprint is a flat grid patch tessellated as a single triangle strip.
//! Rows are joined with degenerate triangles instead of strip restarts. The
//! same six footprints are drawn by every clipmap level at every placement,
//! so each one is generated and uploaded once.

use geoclip_core::Result;

use crate::device::{BufferUsage, DeviceBackend, DeviceBufferHandle};

/// The six footprint shapes of a clipmap level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FootprintKind {
    /// `M x M` block, twelve per ring
    Block,
    /// `M x 3` strip closing the gap between blocks on the left and right
    FixupHorizontal,
    /// `3 x M` strip closing the gap between blocks on the bottom and top
    FixupVertical,
    /// `(2M+1) x 2` strip between a level and its finer neighbour
    InteriorTrimHorizontal,
    /// `2 x (2M+1)` strip between a level and its finer neighbour
    InteriorTrimVertical,
    /// Zero-area ring along the outer edge hiding T-junctions
    OuterDegenerateRing,
}

impl FootprintKind {
    pub const ALL: [FootprintKind; 6] = [
        FootprintKind::Block,
        FootprintKind::FixupHorizontal,
        FootprintKind::FixupVertical,
        FootprintKind::InteriorTrimHorizontal,
        FootprintKind::InteriorTrimVertical,
        FootprintKind::OuterDegenerateRing,
    ];

    /// Position in `ALL`, used to index the footprint catalogue
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FootprintKind::Block => "block",
            FootprintKind::FixupHorizontal => "fixup-horizontal",
            FootprintKind::FixupVertical => "fixup-vertical",
            FootprintKind::InteriorTrimHorizontal => "interior-trim-horizontal",
            FootprintKind::InteriorTrimVertical => "interior-trim-vertical",
            FootprintKind::OuterDegenerateRing => "outer-degenerate-ring",
        }
    }
}

/// A reusable tessellated patch in grid-local coordinates
pub struct Footprint {
    kind: FootprintKind,
    /// Vertices along x
    width: usize,
    /// Vertices along y (equal to `width` for the ring)
    depth: usize,
    /// Grid-local vertex positions, `(x, y)`
    vertices: Vec<[f32; 2]>,
    /// Triangle strip indices including degenerates
    indices: Vec<u32>,
    vertex_buffer: DeviceBufferHandle,
    index_buffer: DeviceBufferHandle,
    /// Both buffers hold the current vertex and index data
    uploaded: bool,
}

impl Footprint {
    /// Generate a rectangular `width x depth` patch.
    ///
    /// Both dimensions must be at least 2.
    pub fn rectangle(kind: FootprintKind, width: usize, depth: usize) -> Self {
        debug_assert!(width >= 2 && depth >= 2, "footprint must be at least 2x2");
        debug_assert_ne!(kind, FootprintKind::OuterDegenerateRing);

        let mut vertices = Vec::with_capacity(width * depth);
        for y in 0..depth {
            for x in 0..width {
                vertices.push([x as f32, y as f32]);
            }
        }

        let row_pairs = depth - 1;
        let mut indices = Vec::with_capacity(2 * width * row_pairs + 2 * row_pairs.saturating_sub(1));

        for y in 0..row_pairs {
            let row = (y * width) as u32;
            let next_row = ((y + 1) * width) as u32;

            // Degenerate begin: repeat the first vertex of this row
            if y > 0 {
                indices.push(row);
            }

            for x in 0..width as u32 {
                indices.push(row + x);
                indices.push(next_row + x);
            }

            // Degenerate end: repeat the last vertex of the next row
            if y + 1 < row_pairs {
                indices.push(next_row + width as u32 - 1);
            }
        }

        Self::from_parts(kind, width, depth, vertices, indices)
    }

    /// Generate the degenerate ring tracing the border of a `width x width`
    /// square.
    pub fn ring(width: usize) -> Self {
        debug_assert!(width >= 2, "ring must be at least 2 wide");

        let last = (width - 1) as f32;
        let mut vertices = Vec::with_capacity(4 * (width - 1));

        // Bottom, left to right
        for x in 0..width {
            vertices.push([x as f32, 0.0]);
        }
        // Right, bottom to top
        for y in 1..width {
            vertices.push([last, y as f32]);
        }
        // Top, right to left
        for x in (0..width - 1).rev() {
            vertices.push([x as f32, last]);
        }
        // Left, top to bottom, both corners already emitted
        for y in (1..width - 1).rev() {
            vertices.push([0.0, y as f32]);
        }

        let side = width - 1;
        let mut indices = Vec::with_capacity(vertices.len() + 4);
        for i in 0..vertices.len() {
            indices.push(i as u32);
            if i != 0 && i % side == 0 {
                indices.push(i as u32);
            }
        }
        // Close the loop
        indices.push(0);

        Self::from_parts(
            FootprintKind::OuterDegenerateRing,
            width,
            width,
            vertices,
            indices,
        )
    }

    fn from_parts(
        kind: FootprintKind,
        width: usize,
        depth: usize,
        vertices: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            kind,
            width,
            depth,
            vertices,
            indices,
            vertex_buffer: DeviceBufferHandle::UNALLOCATED,
            index_buffer: DeviceBufferHandle::UNALLOCATED,
            uploaded: false,
        }
    }

    pub fn kind(&self) -> FootprintKind {
        self.kind
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_buffer(&self) -> DeviceBufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> DeviceBufferHandle {
        self.index_buffer
    }

    /// Expand the strip into a triangle list, dropping triangles that repeat
    /// an index. Odd strip triangles are flipped so winding stays consistent.
    pub fn strip_triangles(&self) -> Vec<[u32; 3]> {
        self.indices
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1] && w[1] != w[2] && w[0] != w[2])
            .map(|(i, w)| {
                if i % 2 == 0 {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .collect()
    }

    /// Upload vertex and index data until one call succeeds. Buffers are
    /// allocated at most once and kept across failed uploads, so `release`
    /// always frees them.
    pub fn ensure_uploaded<B: DeviceBackend>(&mut self, backend: &mut B) -> Result<()> {
        if self.uploaded {
            return Ok(());
        }

        if !self.vertex_buffer.is_allocated() {
            let label = format!("{} vertices", self.kind.name());
            self.vertex_buffer =
                backend.allocate(&label, BufferUsage::Vertex, self.vertex_bytes().len())?;
        }
        if !self.index_buffer.is_allocated() {
            let label = format!("{} indices", self.kind.name());
            self.index_buffer =
                backend.allocate(&label, BufferUsage::Index, self.index_bytes().len())?;
        }

        backend.upload(self.vertex_buffer, self.vertex_bytes())?;
        backend.upload(self.index_buffer, self.index_bytes())?;
        self.uploaded = true;
        Ok(())
    }

    /// Free the device buffers; a later `ensure_uploaded` recreates them
    pub fn release<B: DeviceBackend>(&mut self, backend: &mut B) {
        for handle in [&mut self.vertex_buffer, &mut self.index_buffer] {
            if handle.is_allocated() {
                backend.release(*handle);
                *handle = DeviceBufferHandle::UNALLOCATED;
            }
        }
        self.uploaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use geoclip_core::GeoclipError;
    use std::collections::HashSet;

    fn signed_area(f: &Footprint, tri: [u32; 3]) -> f32 {
        let [a, b, c] = tri.map(|i| f.vertices()[i as usize]);
        0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]))
    }

    #[test]
    fn rectangle_2x3() {
        let f = Footprint::rectangle(FootprintKind::Block, 2, 3);
        assert_eq!(f.width(), 2);
        assert_eq!(f.depth(), 3);
        assert_eq!(
            f.vertices(),
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 2.0], [1.0, 2.0]]
        );
        assert_eq!(f.vertex_count(), 6);
        assert_eq!(f.indices(), &[0, 2, 1, 3, 3, 2, 2, 4, 3, 5]);
        assert_eq!(f.index_count(), 10);
    }

    #[test]
    fn rectangle_counts() {
        for width in 2..9 {
            for depth in 2..9 {
                let f = Footprint::rectangle(FootprintKind::Block, width, depth);
                assert_eq!(f.vertex_count(), width * depth);
                assert_eq!(f.index_count(), 2 * width * (depth - 1) + 2 * (depth - 2));
                assert!(f.indices().iter().all(|&i| (i as usize) < f.vertex_count()));
            }
        }
    }

    #[test]
    fn rectangle_strip_covers_without_overlap() {
        let f = Footprint::rectangle(FootprintKind::InteriorTrimHorizontal, 9, 4);
        let tris = f.strip_triangles();
        assert_eq!(tris.len(), 2 * 8 * 3);

        let areas: Vec<f32> = tris.iter().map(|&t| signed_area(&f, t)).collect();
        // Consistent winding, every triangle half a cell
        assert!(areas.iter().all(|a| (a + 0.5).abs() < 1e-6));

        let unique: HashSet<[u32; 3]> = tris
            .iter()
            .map(|t| {
                let mut s = *t;
                s.sort_unstable();
                s
            })
            .collect();
        assert_eq!(unique.len(), tris.len());
    }

    #[test]
    fn ring_4() {
        let f = Footprint::ring(4);
        assert_eq!(f.kind(), FootprintKind::OuterDegenerateRing);
        assert_eq!(f.width(), 4);
        assert_eq!(f.depth(), 4);
        assert_eq!(
            f.vertices(),
            &[
                [0.0, 0.0],
                [1.0, 0.0],
                [2.0, 0.0],
                [3.0, 0.0],
                [3.0, 1.0],
                [3.0, 2.0],
                [3.0, 3.0],
                [2.0, 3.0],
                [1.0, 3.0],
                [0.0, 3.0],
                [0.0, 2.0],
                [0.0, 1.0],
            ]
        );
        assert_eq!(
            f.indices(),
            &[0, 1, 2, 3, 3, 4, 5, 6, 6, 7, 8, 9, 9, 10, 11, 0]
        );
        assert_eq!(f.indices().first(), f.indices().last());
    }

    #[test]
    fn ring_counts_and_zero_area() {
        for width in 2..20 {
            let f = Footprint::ring(width);
            assert_eq!(f.vertex_count(), 4 * (width - 1));
            assert_eq!(f.index_count(), 4 * (width - 1) + 3 + 1);
            for tri in f.strip_triangles() {
                assert_eq!(signed_area(&f, tri), 0.0);
            }
        }
    }

    /// Allocates through a `HeadlessDevice` but rejects every upload
    struct RejectingUploads(HeadlessDevice);

    impl DeviceBackend for RejectingUploads {
        fn allocate(
            &mut self,
            label: &str,
            usage: BufferUsage,
            byte_len: usize,
        ) -> Result<DeviceBufferHandle> {
            self.0.allocate(label, usage, byte_len)
        }

        fn upload(&mut self, _handle: DeviceBufferHandle, _bytes: &[u8]) -> Result<()> {
            Err(GeoclipError::DeviceError("upload rejected".into()))
        }

        fn bind(&mut self, handle: DeviceBufferHandle) -> Result<()> {
            self.0.bind(handle)
        }

        fn unbind(&mut self, handle: DeviceBufferHandle) {
            self.0.unbind(handle)
        }

        fn release(&mut self, handle: DeviceBufferHandle) {
            self.0.release(handle)
        }
    }

    #[test]
    fn failed_uploads_keep_buffers_releasable() {
        let mut device = RejectingUploads(HeadlessDevice::new());
        let mut f = Footprint::rectangle(FootprintKind::Block, 4, 4);

        for _ in 0..3 {
            assert!(f.ensure_uploaded(&mut device).is_err());
        }
        assert_eq!(device.0.allocation_count(), 2);
        assert!(f.vertex_buffer().is_allocated());
        assert!(f.index_buffer().is_allocated());

        f.release(&mut device);
        assert_eq!(device.0.live_buffers(), 0);
    }

    #[test]
    fn upload_retries_after_a_failure() {
        let mut device = RejectingUploads(HeadlessDevice::new());
        let mut f = Footprint::rectangle(FootprintKind::FixupHorizontal, 4, 3);
        assert!(f.ensure_uploaded(&mut device).is_err());

        // Same buffers, now on a device that accepts the data
        let inner = &mut device.0;
        f.ensure_uploaded(inner).unwrap();
        assert_eq!(inner.allocation_count(), 2);
        assert_eq!(inner.buffer_data(f.vertex_buffer()), Some(f.vertex_bytes()));
        assert_eq!(inner.buffer_data(f.index_buffer()), Some(f.index_bytes()));
    }

    #[test]
    fn upload_happens_once() {
        let mut device = HeadlessDevice::new();
        let mut f = Footprint::rectangle(FootprintKind::FixupVertical, 3, 4);
        f.ensure_uploaded(&mut device).unwrap();
        f.ensure_uploaded(&mut device).unwrap();

        assert_eq!(device.allocation_count(), 2);
        assert_eq!(device.buffer_data(f.vertex_buffer()), Some(f.vertex_bytes()));
        assert_eq!(device.buffer_data(f.index_buffer()), Some(f.index_bytes()));
        assert_eq!(f.vertex_bytes().len(), 12 * 2 * 4);

        f.release(&mut device);
        assert!(!f.vertex_buffer().is_allocated());
        assert_eq!(device.live_buffers(), 0);
    }
}
