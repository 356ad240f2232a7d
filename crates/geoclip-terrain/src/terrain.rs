//! Terrain orchestration
//!
//! The terrain owns the footprint catalogue, the placement table and the
//! level pyramid (index 0 is the coarsest level, `L - 1` the finest). Every
//! viewer move recomputes where each level sits and which trim it shows,
//! then resamples the levels that moved, coarsest first so each level can
//! blend against an up-to-date parent.

use std::sync::Arc;

use geoclip_core::{LodConfig, Result};
use glam::{IVec2, Vec2};

use crate::device::{DeviceBackend, DeviceBufferHandle};
use crate::footprint::{Footprint, FootprintKind};
use crate::heightfield::HeightField;
use crate::level::{ClipmapLevel, Texel};
use crate::placement::{
    generate_footprints, generate_placements, select_placements, FootprintPlacement,
    TrimOrientation,
};

/// Largest viewer coordinate magnitude, in height field cells. Viewer
/// positions are clamped to `[-VIEWER_LIMIT, VIEWER_LIMIT]` on each axis so
/// level anchors scaled back to height field cells stay inside `i32`.
pub const VIEWER_LIMIT: i32 = 1 << 24;

fn clamp_viewer(viewer: IVec2) -> IVec2 {
    viewer.clamp(IVec2::splat(-VIEWER_LIMIT), IVec2::splat(VIEWER_LIMIT))
}

/// A footprint instance resolved for drawing
#[derive(Clone, Copy)]
pub struct PlacedFootprint<'a> {
    /// Offset from the level's bottom-left vertex, in level cells
    pub offset: IVec2,
    pub footprint: &'a Footprint,
}

/// Everything a renderer needs to draw one level
pub struct LevelDraw<'a> {
    pub level: usize,
    pub scale: i32,
    /// Bottom-left corner in height field units
    pub position: Vec2,
    pub orientation: TrimOrientation,
    pub texels: &'a [Texel],
    pub device_buffer: DeviceBufferHandle,
    pub placements: Vec<PlacedFootprint<'a>>,
}

/// Per-frame geometry totals for the active levels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub levels: usize,
    pub placements: usize,
    pub vertices: usize,
    pub indices: usize,
}

pub struct Terrain {
    config: LodConfig,
    heightfield: Arc<HeightField>,
    /// One footprint per kind, ordered like `FootprintKind::ALL`
    footprints: Vec<Footprint>,
    placements: Vec<FootprintPlacement>,
    /// Placement indices per orientation, indexed by `TrimOrientation::index`
    selections: Vec<Vec<usize>>,
    levels: Vec<ClipmapLevel>,
    viewer: IVec2,
    previous_viewer: IVec2,
    active_finest: usize,
    active_coarsest: usize,
}

impl Terrain {
    /// Build a terrain with the viewer over the centre of the height field
    pub fn new(heightfield: impl Into<Arc<HeightField>>, config: &LodConfig) -> Self {
        let heightfield = heightfield.into();
        let centre = IVec2::new(
            (heightfield.width() / 2) as i32,
            (heightfield.depth() / 2) as i32,
        );
        Self::with_viewer(heightfield, config, centre)
    }

    /// Build a terrain with the viewer at `viewer` (height field cells,
    /// clamped to `VIEWER_LIMIT`)
    pub fn with_viewer(
        heightfield: impl Into<Arc<HeightField>>,
        config: &LodConfig,
        viewer: IVec2,
    ) -> Self {
        let heightfield = heightfield.into();
        let viewer = clamp_viewer(viewer);
        if heightfield.width() < config.n() || heightfield.depth() < config.n() {
            log::warn!(
                "height field {}x{} is smaller than one {}-cell level; edges will be flat",
                heightfield.width(),
                heightfield.depth(),
                config.n()
            );
        }

        let mut terrain = Self {
            config: config.clone(),
            heightfield,
            footprints: Vec::new(),
            placements: Vec::new(),
            selections: Vec::new(),
            levels: Vec::new(),
            viewer,
            previous_viewer: viewer,
            active_finest: 0,
            active_coarsest: 0,
        };

        terrain.footprints = generate_footprints(&terrain.config);
        terrain.placements = generate_placements(&terrain.config);
        terrain.selections = TrimOrientation::ALL
            .iter()
            .map(|&o| select_placements(&terrain.placements, o))
            .collect();
        terrain.generate_levels();

        log::debug!(
            "built terrain: K={} L={} R={}, {} footprints, {} placements",
            terrain.config.k(),
            terrain.config.l(),
            terrain.config.r(),
            terrain.footprints.len(),
            terrain.placements.len()
        );

        terrain.update_positions();
        terrain.set_active_levels(0.0);
        terrain
    }

    /// Build a fresh terrain from a new configuration, keeping the height
    /// field and viewer. Parameter changes always go through here.
    pub fn rebuild(&self, config: &LodConfig) -> Terrain {
        Terrain::with_viewer(self.heightfield.clone(), config, self.viewer)
    }

    fn generate_levels(&mut self) {
        let count = self.config.l() as usize;
        self.levels = Vec::with_capacity(count);
        for l in 0..count {
            let level = ClipmapLevel::new(
                l,
                &self.config,
                self.heightfield.clone(),
                self.levels.last(),
            );
            self.levels.push(level);
        }
    }

    /// Move the viewer by a delta in height field cells. The result is
    /// clamped to `VIEWER_LIMIT`.
    pub fn move_viewer(&mut self, dx: i32, dz: i32) {
        self.set_viewer(self.viewer.saturating_add(IVec2::new(dx, dz)));
    }

    /// Put the viewer at an absolute height field cell, clamped to
    /// `VIEWER_LIMIT`, and bring every level up to date
    pub fn set_viewer(&mut self, viewer: IVec2) {
        self.previous_viewer = self.viewer;
        self.viewer = clamp_viewer(viewer);
        self.update_positions();
    }

    /// Recompute every level's position and trim, then resample the levels
    /// whose anchor moved (and everything finer than a resampled level).
    pub fn update_positions(&mut self) {
        let count = self.levels.len();
        let finest = count - 1;
        let corner = IVec2::splat(self.config.h() + 1);
        let viewer = self.viewer;

        let mut parent_resampled = false;
        let mut resampled = 0;

        for l in 0..count {
            let (coarser, rest) = self.levels.split_at_mut(l);
            let level = &mut rest[0];

            // The centre halves from each level to the next-coarser one
            let shift = (finest - l) as u32;
            let grid = IVec2::new(viewer.x >> shift, viewer.y >> shift);
            let anchor = IVec2::new(grid.x & !1, grid.y & !1) + corner;

            let trim = if l == finest {
                TrimOrientation::All
            } else {
                let scale = level.scale();
                TrimOrientation::from_sides(viewer.x & scale != 0, viewer.y & scale != 0)
            };

            level.set_position(grid, anchor, trim);
            log::trace!(
                "level {}: grid {:?} anchor {:?} trim {}",
                l,
                grid,
                anchor,
                trim.name()
            );

            parent_resampled = if level.is_stale() || parent_resampled {
                level.update_sample_buffer(coarser.last());
                resampled += 1;
                true
            } else {
                false
            };
        }

        log::debug!(
            "viewer {:?}: resampled {} of {} levels",
            viewer,
            resampled,
            count
        );
    }

    /// Pick the levels to draw for a viewer `height` above the terrain.
    /// Returns `(finest, coarsest)` active level indices.
    pub fn set_active_levels(&mut self, height: f32) -> (usize, usize) {
        let height = if height.is_nan() { 0.0 } else { height.max(0.0) };
        let cells = (self.config.n() - 1) as f32;
        let ratio = self.config.height_ratio();

        let finest = (0..self.levels.len())
            .rev()
            .find(|&l| cells * self.levels[l].scale() as f32 * ratio >= height)
            .unwrap_or(0);
        let coarsest = finest.saturating_sub(self.config.r() as usize - 1);

        if (finest, coarsest) != (self.active_finest, self.active_coarsest) {
            log::debug!("active levels now {}..={}", coarsest, finest);
        }
        self.active_finest = finest;
        self.active_coarsest = coarsest;
        (finest, coarsest)
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn heightfield(&self) -> &HeightField {
        &self.heightfield
    }

    /// Whether every level's texels match its current position. Always
    /// true between public calls; moves resample before returning.
    pub fn is_current(&self) -> bool {
        self.levels.iter().all(|l| !l.is_stale())
    }

    pub fn viewer(&self) -> IVec2 {
        self.viewer
    }

    pub fn previous_viewer(&self) -> IVec2 {
        self.previous_viewer
    }

    /// Height field value under the viewer
    pub fn ground_height(&self) -> f32 {
        self.heightfield.value(self.viewer.x, self.viewer.y)
    }

    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    pub fn footprint(&self, kind: FootprintKind) -> &Footprint {
        &self.footprints[kind.index()]
    }

    pub fn placements(&self) -> &[FootprintPlacement] {
        &self.placements
    }

    /// Indices into `placements()` drawn by a level with `orientation`
    pub fn select_placements(&self, orientation: TrimOrientation) -> &[usize] {
        &self.selections[orientation.index()]
    }

    pub fn levels(&self) -> &[ClipmapLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&ClipmapLevel> {
        self.levels.get(index)
    }

    pub fn active_finest(&self) -> usize {
        self.active_finest
    }

    pub fn active_coarsest(&self) -> usize {
        self.active_coarsest
    }

    /// Orientation a level is drawn with: the finest active level fills its
    /// centre, every other level shows its trim.
    pub fn orientation_for_level(&self, index: usize) -> TrimOrientation {
        if index == self.active_finest {
            TrimOrientation::All
        } else {
            self.levels[index].trim()
        }
    }

    /// Indices into `placements()` drawn for level `index`
    pub fn placements_for_level(&self, index: usize) -> &[usize] {
        self.select_placements(self.orientation_for_level(index))
    }

    fn level_draw(&self, index: usize) -> LevelDraw<'_> {
        let level = &self.levels[index];
        let orientation = self.orientation_for_level(index);
        let placements = self
            .placements_for_level(index)
            .iter()
            .map(|&i| {
                let placement = &self.placements[i];
                PlacedFootprint {
                    offset: placement.offset(),
                    footprint: placement.resolve(&self.footprints),
                }
            })
            .collect();

        LevelDraw {
            level: index,
            scale: level.scale(),
            position: level.position(),
            orientation,
            texels: level.texels(),
            device_buffer: level.device_buffer(),
            placements,
        }
    }

    /// Active levels from finest to coarsest
    pub fn draw_list(&self) -> Vec<LevelDraw<'_>> {
        debug_assert!(self.is_current());
        (self.active_coarsest..=self.active_finest)
            .rev()
            .map(|l| self.level_draw(l))
            .collect()
    }

    /// Geometry submitted per frame with the current active range
    pub fn draw_stats(&self) -> DrawStats {
        let mut stats = DrawStats::default();
        for draw in self.draw_list() {
            stats.levels += 1;
            stats.placements += draw.placements.len();
            for placed in &draw.placements {
                stats.vertices += placed.footprint.vertex_count();
                stats.indices += placed.footprint.index_count();
            }
        }
        stats
    }

    fn upload_footprints<B: DeviceBackend>(&mut self, backend: &mut B) -> Result<()> {
        for footprint in &mut self.footprints {
            footprint.ensure_uploaded(backend)?;
        }
        Ok(())
    }

    /// Bring the device up to date: footprints are uploaded once, and every
    /// active level whose texels changed is re-uploaded.
    pub fn upload<B: DeviceBackend>(&mut self, backend: &mut B) -> Result<()> {
        debug_assert!(self.is_current());
        self.upload_footprints(backend)?;
        for l in (self.active_coarsest..=self.active_finest).rev() {
            self.levels[l].bind_device_buffer(backend)?;
            self.levels[l].unbind_device_buffer(backend);
        }
        Ok(())
    }

    /// Draw the active levels, finest first. Footprints are uploaded on the
    /// first call; each level's buffer is bound around its `draw_level` call.
    /// Returns the number of placements drawn.
    pub fn draw<B, F>(&mut self, backend: &mut B, mut draw_level: F) -> Result<usize>
    where
        B: DeviceBackend,
        F: FnMut(&mut B, &LevelDraw<'_>) -> Result<()>,
    {
        debug_assert!(self.is_current());
        self.upload_footprints(backend)?;

        let mut drawn = 0;
        for l in (self.active_coarsest..=self.active_finest).rev() {
            self.levels[l].bind_device_buffer(backend)?;
            let draw = self.level_draw(l);
            let result = draw_level(backend, &draw);
            drawn += draw.placements.len();
            self.levels[l].unbind_device_buffer(backend);
            result?;
        }
        Ok(drawn)
    }

    /// Free every device buffer owned by the terrain
    pub fn release_device_buffers<B: DeviceBackend>(&mut self, backend: &mut B) {
        for footprint in &mut self.footprints {
            footprint.release(backend);
        }
        for level in &mut self.levels {
            level.release_device_buffer(backend);
        }
    }
}
