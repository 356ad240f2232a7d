//! Footprint placement catalogue
//!
//! Every level is tiled from the same 25 placements. Offsets are measured in
//! level-local vertices from the level's bottom-left corner, which sits `H`
//! vertices from the level centre on each axis. A level of `4M - 1` vertices
//! splits along each axis as `block | block | fixup | block | block`, so the
//! block columns start at `0, M-1, 2M, 3M-1` and the fixup at `2M-2`.

use geoclip_core::LodConfig;
use glam::IVec2;

use crate::footprint::{Footprint, FootprintKind};

/// One side of the square hole a level leaves for its finer neighbour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Bottom,
    Top,
    Left,
    Right,
}

/// Which interior trim strips a level draws.
///
/// The corner names the two sides that get a trim strip. The finer level
/// sits in the opposite corner of the hole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrimOrientation {
    /// Every placement, including the centre blocks; used by the finest
    /// level drawn
    All,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TrimOrientation {
    pub const ALL: [TrimOrientation; 5] = [
        TrimOrientation::All,
        TrimOrientation::TopLeft,
        TrimOrientation::TopRight,
        TrimOrientation::BottomLeft,
        TrimOrientation::BottomRight,
    ];

    /// Pick the corner from the two per-axis parity bits
    pub fn from_sides(left: bool, bottom: bool) -> Self {
        match (left, bottom) {
            (true, true) => TrimOrientation::BottomLeft,
            (false, true) => TrimOrientation::BottomRight,
            (true, false) => TrimOrientation::TopLeft,
            (false, false) => TrimOrientation::TopRight,
        }
    }

    /// Whether the trim strip on `side` is drawn
    pub fn has_side(self, side: Side) -> bool {
        match self {
            TrimOrientation::All => true,
            TrimOrientation::TopLeft => matches!(side, Side::Top | Side::Left),
            TrimOrientation::TopRight => matches!(side, Side::Top | Side::Right),
            TrimOrientation::BottomLeft => matches!(side, Side::Bottom | Side::Left),
            TrimOrientation::BottomRight => matches!(side, Side::Bottom | Side::Right),
        }
    }

    /// Position in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TrimOrientation::All => "all",
            TrimOrientation::TopLeft => "top-left",
            TrimOrientation::TopRight => "top-right",
            TrimOrientation::BottomLeft => "bottom-left",
            TrimOrientation::BottomRight => "bottom-right",
        }
    }
}

/// What part of a level a placement covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementRole {
    /// One of the twelve blocks forming the ring
    RingBlock,
    /// One of the four blocks filling the hole when no finer level is drawn
    CentreBlock,
    Fixup,
    Trim(Side),
    OuterRing,
}

/// An instance of a footprint at a level-local offset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FootprintPlacement {
    offset: IVec2,
    footprint: FootprintKind,
    role: PlacementRole,
}

impl FootprintPlacement {
    pub fn new(offset: IVec2, footprint: FootprintKind, role: PlacementRole) -> Self {
        Self {
            offset,
            footprint,
            role,
        }
    }

    /// Offset of the footprint's origin from the level's bottom-left vertex
    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    pub fn footprint(&self) -> FootprintKind {
        self.footprint
    }

    pub fn role(&self) -> PlacementRole {
        self.role
    }

    /// Look the referenced footprint up in a catalogue ordered like
    /// `FootprintKind::ALL`
    pub fn resolve<'a>(&self, footprints: &'a [Footprint]) -> &'a Footprint {
        &footprints[self.footprint.index()]
    }

    /// Whether a level drawn with `orientation` includes this placement
    pub fn is_selected(&self, orientation: TrimOrientation) -> bool {
        match self.role {
            PlacementRole::RingBlock | PlacementRole::Fixup | PlacementRole::OuterRing => true,
            PlacementRole::CentreBlock => orientation == TrimOrientation::All,
            PlacementRole::Trim(side) => orientation.has_side(side),
        }
    }
}

/// Build the six shared footprints, ordered like `FootprintKind::ALL`
pub fn generate_footprints(config: &LodConfig) -> Vec<Footprint> {
    let m = config.m();
    let footprints = vec![
        Footprint::rectangle(FootprintKind::Block, m, m),
        Footprint::rectangle(FootprintKind::FixupHorizontal, m, 3),
        Footprint::rectangle(FootprintKind::FixupVertical, 3, m),
        Footprint::rectangle(FootprintKind::InteriorTrimHorizontal, 2 * m + 1, 2),
        Footprint::rectangle(FootprintKind::InteriorTrimVertical, 2, 2 * m + 1),
        Footprint::ring(4 * m - 1),
    ];
    debug_assert!(footprints
        .iter()
        .zip(FootprintKind::ALL)
        .all(|(f, kind)| f.kind() == kind));
    footprints
}

/// Build the full 25-entry placement catalogue
pub fn generate_placements(config: &LodConfig) -> Vec<FootprintPlacement> {
    let m = config.m() as i32;
    // Bottom-left vertex relative to the centre is (H, H); the centre is
    // therefore -H = 2M - 1 vertices in from the corner
    let centre = -config.h();
    debug_assert_eq!(centre, 2 * m - 1);

    let columns = [0, m - 1, 2 * m, 3 * m - 1];
    let fixup = centre - 1;
    let inner = m - 1;
    let far_trim = 3 * m - 2;

    let mut placements = Vec::with_capacity(25);

    for (j, &z) in columns.iter().enumerate() {
        for (i, &x) in columns.iter().enumerate() {
            let interior = (1..=2).contains(&i) && (1..=2).contains(&j);
            if !interior {
                placements.push(FootprintPlacement::new(
                    IVec2::new(x, z),
                    FootprintKind::Block,
                    PlacementRole::RingBlock,
                ));
            }
        }
    }

    placements.extend([
        FootprintPlacement::new(
            IVec2::new(fixup, 0),
            FootprintKind::FixupVertical,
            PlacementRole::Fixup,
        ),
        FootprintPlacement::new(
            IVec2::new(fixup, 3 * m - 1),
            FootprintKind::FixupVertical,
            PlacementRole::Fixup,
        ),
        FootprintPlacement::new(
            IVec2::new(0, fixup),
            FootprintKind::FixupHorizontal,
            PlacementRole::Fixup,
        ),
        FootprintPlacement::new(
            IVec2::new(3 * m - 1, fixup),
            FootprintKind::FixupHorizontal,
            PlacementRole::Fixup,
        ),
    ]);

    placements.extend([
        FootprintPlacement::new(
            IVec2::new(inner, inner),
            FootprintKind::InteriorTrimHorizontal,
            PlacementRole::Trim(Side::Bottom),
        ),
        FootprintPlacement::new(
            IVec2::new(inner, far_trim),
            FootprintKind::InteriorTrimHorizontal,
            PlacementRole::Trim(Side::Top),
        ),
        FootprintPlacement::new(
            IVec2::new(inner, inner),
            FootprintKind::InteriorTrimVertical,
            PlacementRole::Trim(Side::Left),
        ),
        FootprintPlacement::new(
            IVec2::new(far_trim, inner),
            FootprintKind::InteriorTrimVertical,
            PlacementRole::Trim(Side::Right),
        ),
    ]);

    // Inside the four trims the hole is 2M-2 cells wide: four blocks
    for z in [m, centre] {
        for x in [m, centre] {
            placements.push(FootprintPlacement::new(
                IVec2::new(x, z),
                FootprintKind::Block,
                PlacementRole::CentreBlock,
            ));
        }
    }

    placements.push(FootprintPlacement::new(
        IVec2::ZERO,
        FootprintKind::OuterDegenerateRing,
        PlacementRole::OuterRing,
    ));

    placements
}

/// Indices into `placements` drawn by a level with `orientation`
pub fn select_placements(
    placements: &[FootprintPlacement],
    orientation: TrimOrientation,
) -> Vec<usize> {
    placements
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_selected(orientation))
        .map(|(i, _)| i)
        .collect()
}
