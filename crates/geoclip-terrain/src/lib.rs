//! Geoclip Terrain - geometry clipmap terrain core
//!
//! Builds the shared footprint meshes, the per-level sample buffers and the
//! placement table, and keeps them positioned around a moving viewer. Does
//! not talk to a graphics API: buffers go through the `DeviceBackend` trait
//! and draw calls come out as a `LevelDraw` list for the renderer to consume.

pub mod device;
pub mod footprint;
pub mod heightfield;
pub mod level;
pub mod placement;
pub mod terrain;

pub use device::{BufferUsage, DeviceBackend, DeviceBufferHandle, HeadlessDevice};
pub use footprint::{Footprint, FootprintKind};
pub use heightfield::{HeightField, HeightPolicy, HeightSample};
pub use level::{ClipmapLevel, Texel};
pub use placement::{FootprintPlacement, PlacementRole, Side, TrimOrientation};
pub use terrain::{DrawStats, LevelDraw, PlacedFootprint, Terrain, VIEWER_LIMIT};
