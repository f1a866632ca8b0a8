//! Nibble-packed light storage for one section.
//!
//! A [`DataLayer`] holds one 4-bit value per voxel of a 16×16×16 section,
//! two voxels per byte. The byte buffer is allocated on the first non-zero
//! write; until then every read returns 0. The layout is the persisted
//! format:
//!
//! ```text
//! index = y << 8 | z << 4 | x        (0..4096)
//! byte  = index >> 1
//! even index → low nibble, odd index → high nibble
//! ```

use std::fmt;

use crate::error::LayerSizeError;
use crate::pos::BlockPos;

/// Voxels per section.
pub const LAYER_VOLUME: usize = 4096;
/// Bytes in a fully allocated layer.
pub const LAYER_BYTES: usize = LAYER_VOLUME / 2;

/// 4-bit-per-voxel storage for one section. Cheap to clone while empty.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DataLayer {
    data: Option<Box<[u8; LAYER_BYTES]>>,
}

impl DataLayer {
    /// An all-zero layer with no backing allocation.
    pub const fn new() -> Self {
        Self { data: None }
    }

    /// A layer with every voxel set to `value` (low 4 bits).
    pub fn filled(value: u8) -> Self {
        let nibble = value & 0xF;
        if nibble == 0 {
            return Self::new();
        }
        Self {
            data: Some(Box::new([nibble | nibble << 4; LAYER_BYTES])),
        }
    }

    /// Rebuild a layer from its persisted bytes.
    ///
    /// Anything other than exactly [`LAYER_BYTES`] bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LayerSizeError> {
        let array: [u8; LAYER_BYTES] = bytes.try_into().map_err(|_| LayerSizeError {
            expected: LAYER_BYTES,
            actual: bytes.len(),
        })?;
        Ok(Self {
            data: Some(Box::new(array)),
        })
    }

    /// Persisted form: always [`LAYER_BYTES`] bytes, zeros when unallocated.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.data {
            Some(data) => data.to_vec(),
            None => vec![0; LAYER_BYTES],
        }
    }

    /// Whether the backing buffer has never been allocated.
    pub fn is_unallocated(&self) -> bool {
        self.data.is_none()
    }

    /// Value at section-local `(x, y, z)`, each in `0..16`.
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.get_index(Self::index(x, y, z))
    }

    /// Value for a voxel position, using only its section-local bits.
    pub fn get_at(&self, pos: BlockPos) -> u8 {
        let (x, y, z) = pos.local();
        self.get(x, y, z)
    }

    /// Store `value` (low 4 bits) at section-local `(x, y, z)`.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u8) {
        self.set_index(Self::index(x, y, z), value);
    }

    /// Store `value` for a voxel position, using only its section-local bits.
    pub fn set_at(&mut self, pos: BlockPos, value: u8) {
        let (x, y, z) = pos.local();
        self.set(x, y, z, value);
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < 16 && y < 16 && z < 16, "local coordinate out of range");
        y << 8 | z << 4 | x
    }

    fn get_index(&self, index: usize) -> u8 {
        match &self.data {
            Some(data) => (data[index >> 1] >> ((index & 1) * 4)) & 0xF,
            None => 0,
        }
    }

    fn set_index(&mut self, index: usize, value: u8) {
        let value = value & 0xF;
        if self.data.is_none() {
            if value == 0 {
                return;
            }
            self.data = Some(Box::new([0; LAYER_BYTES]));
        }
        let Some(data) = self.data.as_mut() else {
            return;
        };
        let shift = (index & 1) * 4;
        let byte = &mut data[index >> 1];
        *byte = (*byte & !(0xF << shift)) | (value << shift);
    }
}

impl fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            None => f.write_str("DataLayer(empty)"),
            Some(data) => {
                let lit = data.iter().filter(|b| **b != 0).count();
                write!(f, "DataLayer({lit} non-zero bytes)")
            }
        }
    }
}
