//! Device buffer seam between the terrain core and a renderer
//!
//! The core never talks to a graphics API. Levels and footprints hand their
//! bytes to a `DeviceBackend`, which the rendering side implements on top of
//! whatever device it owns. `HeadlessDevice` keeps everything in memory for
//! tools and tests.

use std::collections::HashMap;
use std::num::NonZeroU64;

use geoclip_core::{GeoclipError, Result};

/// What a device buffer will be used for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Per-level sample data read by the vertex stage
    Texels,
}

/// Opaque handle to a device buffer.
///
/// A default handle is unallocated; owners keep one per buffer and allocate
/// it on first use, so validity doubles as the "allocated" flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeviceBufferHandle(Option<NonZeroU64>);

impl DeviceBufferHandle {
    pub const UNALLOCATED: Self = Self(None);

    /// Wrap a backend id. Zero is reserved for "unallocated".
    pub fn from_raw(raw: u64) -> Self {
        Self(NonZeroU64::new(raw))
    }

    pub fn raw(&self) -> Option<u64> {
        self.0.map(NonZeroU64::get)
    }

    pub fn is_allocated(&self) -> bool {
        self.0.is_some()
    }
}

/// Implemented by the rendering collaborator
pub trait DeviceBackend {
    /// Create a buffer able to hold `byte_len` bytes
    fn allocate(&mut self, label: &str, usage: BufferUsage, byte_len: usize)
        -> Result<DeviceBufferHandle>;

    /// Replace the buffer contents
    fn upload(&mut self, handle: DeviceBufferHandle, bytes: &[u8]) -> Result<()>;

    /// Make the buffer current for the next draw
    fn bind(&mut self, handle: DeviceBufferHandle) -> Result<()>;

    fn unbind(&mut self, handle: DeviceBufferHandle);

    /// Free the buffer; the handle must not be used afterwards
    fn release(&mut self, handle: DeviceBufferHandle);
}

struct HeadlessBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
}

/// A `DeviceBackend` that stores buffers in memory
#[derive(Default)]
pub struct HeadlessDevice {
    next_id: u64,
    buffers: HashMap<u64, HeadlessBuffer>,
    bound: Option<DeviceBufferHandle>,
    max_buffers: Option<usize>,
    allocations: usize,
    uploads: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses to hold more than `max_buffers` live buffers
    pub fn with_buffer_limit(max_buffers: usize) -> Self {
        Self {
            max_buffers: Some(max_buffers),
            ..Self::default()
        }
    }

    /// Bytes last uploaded to `handle`
    pub fn buffer_data(&self, handle: DeviceBufferHandle) -> Option<&[u8]> {
        let id = handle.raw()?;
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    pub fn buffer_label(&self, handle: DeviceBufferHandle) -> Option<&str> {
        let id = handle.raw()?;
        self.buffers.get(&id).map(|b| b.label.as_str())
    }

    pub fn buffer_usage(&self, handle: DeviceBufferHandle) -> Option<BufferUsage> {
        let id = handle.raw()?;
        self.buffers.get(&id).map(|b| b.usage)
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Total allocations over the device's lifetime
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    /// Total uploads over the device's lifetime
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn bound(&self) -> Option<DeviceBufferHandle> {
        self.bound
    }

    fn buffer_mut(&mut self, handle: DeviceBufferHandle) -> Result<&mut HeadlessBuffer> {
        handle
            .raw()
            .and_then(|id| self.buffers.get_mut(&id))
            .ok_or_else(|| GeoclipError::DeviceError(format!("unknown buffer {:?}", handle)))
    }
}

impl DeviceBackend for HeadlessDevice {
    fn allocate(
        &mut self,
        label: &str,
        usage: BufferUsage,
        byte_len: usize,
    ) -> Result<DeviceBufferHandle> {
        if let Some(max) = self.max_buffers {
            if self.buffers.len() >= max {
                return Err(GeoclipError::DeviceError(format!(
                    "buffer limit of {} reached while allocating '{}'",
                    max, label
                )));
            }
        }

        self.next_id += 1;
        self.allocations += 1;
        self.buffers.insert(
            self.next_id,
            HeadlessBuffer {
                label: label.to_string(),
                usage,
                data: vec![0; byte_len],
            },
        );
        Ok(DeviceBufferHandle::from_raw(self.next_id))
    }

    fn upload(&mut self, handle: DeviceBufferHandle, bytes: &[u8]) -> Result<()> {
        let buffer = self.buffer_mut(handle)?;
        buffer.data.clear();
        buffer.data.extend_from_slice(bytes);
        self.uploads += 1;
        Ok(())
    }

    fn bind(&mut self, handle: DeviceBufferHandle) -> Result<()> {
        self.buffer_mut(handle)?;
        self.bound = Some(handle);
        Ok(())
    }

    fn unbind(&mut self, handle: DeviceBufferHandle) {
        if self.bound == Some(handle) {
            self.bound = None;
        }
    }

    fn release(&mut self, handle: DeviceBufferHandle) {
        if let Some(id) = handle.raw() {
            self.buffers.remove(&id);
        }
        self.unbind(handle);
    }
}
