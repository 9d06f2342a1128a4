use crate::error::SimError;
use crate::lru::CacheLine;

/// Shape of a set-associative cache.
///
/// - `set_index_bits` (`s`): the cache has `2^s` sets
/// - `associativity` (`E`): number of lines in a set
/// - `block_offset_bits` (`b`): every line holds `2^b` bytes
///
/// Addresses are 64 bits wide and are split as
/// `| tag | s set bits | b offset bits |`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheGeometry {
    set_index_bits: u32,
    associativity: usize,
    block_offset_bits: u32,
}

impl CacheGeometry {
    pub fn new(
        set_index_bits: u32,
        associativity: usize,
        block_offset_bits: u32,
    ) -> Result<Self, SimError> {
        if associativity == 0 {
            return Err(SimError::InvalidGeometry {
                reason: "associativity must be at least 1".to_string(),
            });
        }

        // at least one tag bit has to remain
        let index_bits = set_index_bits.checked_add(block_offset_bits);
        if index_bits.is_none_or(|bits| bits >= u64::BITS) {
            return Err(SimError::InvalidGeometry {
                reason: format!(
                    "{set_index_bits} set bits + {block_offset_bits} offset bits do not fit in a {} bit address",
                    u64::BITS
                ),
            });
        }

        if set_index_bits >= usize::BITS {
            return Err(SimError::InvalidGeometry {
                reason: format!("2^{set_index_bits} sets cannot be addressed on this platform"),
            });
        }

        // the line arena is a single allocation, capped at isize::MAX bytes
        let arena_bytes = (1usize << set_index_bits)
            .checked_mul(associativity)
            .and_then(|lines| lines.checked_mul(size_of::<CacheLine>()));
        if arena_bytes.is_none_or(|bytes| bytes > isize::MAX as usize) {
            return Err(SimError::InvalidGeometry {
                reason: format!(
                    "2^{set_index_bits} sets with {associativity} lines each exceed the addressable line count"
                ),
            });
        }

        Ok(Self {
            set_index_bits,
            associativity,
            block_offset_bits,
        })
    }

    pub fn set_index_bits(&self) -> u32 {
        self.set_index_bits
    }

    pub fn block_offset_bits(&self) -> u32 {
        self.block_offset_bits
    }

    pub fn tag_bits(&self) -> u32 {
        u64::BITS - (self.set_index_bits + self.block_offset_bits)
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn num_sets(&self) -> usize {
        1 << self.set_index_bits
    }

    pub fn block_size(&self) -> u64 {
        1 << self.block_offset_bits
    }

    pub fn total_lines(&self) -> usize {
        self.num_sets() * self.associativity
    }
}

impl std::fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} sets, {} ways, {}B lines | {} tag bits | {} set bits | {} offset bits |",
            self.num_sets(),
            self.associativity,
            self.block_size(),
            self.tag_bits(),
            self.set_index_bits,
            self.block_offset_bits
        ))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub set_index: usize,
    pub tag: u64,
    /// Not used by the simulation, block contents are not modeled.
    pub block_offset: u64,
}

/// Splits `address` into its tag, set index and block offset fields.
pub fn decode(address: u64, geometry: &CacheGeometry) -> DecodedAddress {
    let offset_width = geometry.block_offset_bits;
    let set_index_width = geometry.set_index_bits;

    let offset_mask = !(!0u64 << offset_width);
    let set_index_mask = !(!0u64 << set_index_width);

    DecodedAddress {
        // the mask keeps at most `set_index_bits` bits, which fit in usize
        set_index: ((address >> offset_width) & set_index_mask) as usize,
        tag: address >> (set_index_width + offset_width),
        block_offset: address & offset_mask,
    }
}
