//! Voxel and section coordinates, and their packed `u64` keys.
//!
//! Every node the propagators see is a packed `u64`. The layouts are fixed
//! and sign-extending:
//!
//! ```text
//! BlockPos    63          38 37          12 11      0
//!             [ x : 26 bits ][ z : 26 bits ][ y : 12 ]
//!
//! SectionPos  63      42 41      20 19        0
//!             [ x : 22 ][ z : 22 ][  y : 20   ]
//! ```
//!
//! A section is a cube of [`SECTION_SIZE`]³ voxels. The section containing a
//! voxel is obtained by an arithmetic shift of each axis by [`SECTION_BITS`].

use smallvec::SmallVec;
use std::fmt;

use crate::direction::Direction;

/// log2 of the section edge length.
pub const SECTION_BITS: u32 = 4;
/// Voxels along each edge of a section.
pub const SECTION_SIZE: i32 = 1 << SECTION_BITS;
/// Mask extracting the section-local part of a voxel coordinate.
pub const SECTION_MASK: i32 = SECTION_SIZE - 1;

const BLOCK_X_BITS: u32 = 26;
const BLOCK_Z_BITS: u32 = 26;
const BLOCK_Y_BITS: u32 = 12;
const BLOCK_Z_OFFSET: u32 = BLOCK_Y_BITS;
const BLOCK_X_OFFSET: u32 = BLOCK_Y_BITS + BLOCK_Z_BITS;

const SECTION_X_BITS: u32 = 22;
const SECTION_Z_BITS: u32 = 22;
const SECTION_Y_BITS: u32 = 20;
const SECTION_Z_OFFSET: u32 = SECTION_Y_BITS;
const SECTION_X_OFFSET: u32 = SECTION_Y_BITS + SECTION_Z_BITS;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Sign-extend the `bits`-wide field starting at `offset`.
const fn field(packed: u64, offset: u32, bits: u32) -> i32 {
    (((packed as i64) << (64 - offset - bits)) >> (64 - bits)) as i32
}

// ── BlockPos ────────────────────────────────────────────────────

/// Integer coordinate of a single voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// East/west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North/south axis.
    pub z: i32,
}

impl BlockPos {
    /// Smallest representable x/z coordinate.
    pub const MIN_HORIZONTAL: i32 = -(1 << (BLOCK_X_BITS - 1));
    /// Largest representable x/z coordinate.
    pub const MAX_HORIZONTAL: i32 = (1 << (BLOCK_X_BITS - 1)) - 1;
    /// Smallest representable y coordinate.
    pub const MIN_Y: i32 = -(1 << (BLOCK_Y_BITS - 1));
    /// Largest representable y coordinate.
    pub const MAX_Y: i32 = (1 << (BLOCK_Y_BITS - 1)) - 1;

    /// Construct a position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Pack into the 64-bit node key. Out-of-range coordinates wrap.
    pub const fn pack(self) -> u64 {
        ((self.x as i64 as u64) & mask(BLOCK_X_BITS)) << BLOCK_X_OFFSET
            | ((self.z as i64 as u64) & mask(BLOCK_Z_BITS)) << BLOCK_Z_OFFSET
            | ((self.y as i64 as u64) & mask(BLOCK_Y_BITS))
    }

    /// Inverse of [`pack`](Self::pack).
    pub const fn unpack(packed: u64) -> Self {
        Self {
            x: field(packed, BLOCK_X_OFFSET, BLOCK_X_BITS),
            y: field(packed, 0, BLOCK_Y_BITS),
            z: field(packed, BLOCK_Z_OFFSET, BLOCK_Z_BITS),
        }
    }

    /// The section containing this voxel.
    pub const fn section(self) -> SectionPos {
        SectionPos {
            x: self.x >> SECTION_BITS,
            y: self.y >> SECTION_BITS,
            z: self.z >> SECTION_BITS,
        }
    }

    /// Coordinates of this voxel inside its section, each in `0..16`.
    pub const fn local(self) -> (usize, usize, usize) {
        (
            (self.x & SECTION_MASK) as usize,
            (self.y & SECTION_MASK) as usize,
            (self.z & SECTION_MASK) as usize,
        )
    }

    /// The adjacent voxel in `dir`.
    pub const fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.step();
        self.relative(dx, dy, dz)
    }

    /// Translate by an arbitrary delta.
    pub const fn relative(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

/// Packed key of the section containing the packed voxel `node`.
pub const fn block_to_section(node: u64) -> u64 {
    BlockPos::unpack(node).section().pack()
}

// ── SectionPos ──────────────────────────────────────────────────

/// Integer coordinate of a 16×16×16 section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionPos {
    /// East/west axis, in sections.
    pub x: i32,
    /// Vertical axis, in sections.
    pub y: i32,
    /// North/south axis, in sections.
    pub z: i32,
}

impl SectionPos {
    /// Construct a section coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Pack into the 64-bit section key.
    pub const fn pack(self) -> u64 {
        ((self.x as i64 as u64) & mask(SECTION_X_BITS)) << SECTION_X_OFFSET
            | ((self.z as i64 as u64) & mask(SECTION_Z_BITS)) << SECTION_Z_OFFSET
            | ((self.y as i64 as u64) & mask(SECTION_Y_BITS))
    }

    /// Inverse of [`pack`](Self::pack).
    pub const fn unpack(packed: u64) -> Self {
        Self {
            x: field(packed, SECTION_X_OFFSET, SECTION_X_BITS),
            y: field(packed, 0, SECTION_Y_BITS),
            z: field(packed, SECTION_Z_OFFSET, SECTION_Z_BITS),
        }
    }

    /// The section at `y = 0` in the same column. Used as the column key.
    pub const fn column(self) -> Self {
        Self {
            x: self.x,
            y: 0,
            z: self.z,
        }
    }

    /// Minimum-corner voxel of this section.
    pub const fn origin(self) -> BlockPos {
        BlockPos {
            x: self.x << SECTION_BITS,
            y: self.y << SECTION_BITS,
            z: self.z << SECTION_BITS,
        }
    }

    /// The voxel at section-local `(x, y, z)`.
    pub const fn block(self, x: i32, y: i32, z: i32) -> BlockPos {
        self.origin().relative(x, y, z)
    }

    /// The adjacent section in `dir`.
    pub const fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.step();
        self.relative(dx, dy, dz)
    }

    /// Translate by an arbitrary delta, in sections.
    pub const fn relative(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Every section touched by the 3×3×3 voxel neighbourhood of `pos`.
    ///
    /// One section for interior voxels, up to eight at a corner.
    pub fn around_and_at(pos: BlockPos) -> SmallVec<[SectionPos; 8]> {
        let mut out: SmallVec<[SectionPos; 8]> = SmallVec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let section = pos.relative(dx, dy, dz).section();
                    if !out.contains(&section) {
                        out.push(section);
                    }
                }
            }
        }
        out
    }

    /// Iterate the 27 sections of the cube centred on this one, self included.
    pub fn cube(self) -> impl Iterator<Item = SectionPos> {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| self.relative(dx, dy, dz)))
        })
    }
}

impl fmt::Display for SectionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for SectionPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}
