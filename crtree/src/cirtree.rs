pub mod range;

#[cfg(feature = "write")]
pub(crate) mod build;
#[cfg(feature = "read")]
pub(crate) mod read;
#[cfg(feature = "write")]
pub(crate) mod write;

use std::cmp::Ordering;

pub use range::{BoundingRange, ChromRange, InvalidRange};

pub(crate) const CIR_TREE_MAGIC: u32 = 0x2468_ACE0;

/// Size of the index file header, in bytes
pub const CIR_TREE_HEADER_SIZE: u64 = 48;

pub(crate) const NODEHEADER_SIZE: u64 = 1 + 1 + 2;
pub(crate) const NON_LEAFNODE_SIZE: u64 = 4 + 4 + 4 + 4 + 8;
pub(crate) const LEAFNODE_SIZE: u64 = 4 + 4 + 4 + 4 + 8 + 8;

/// The on-disk size of a (zero-padded) index node for a given block size
pub fn index_node_size(block_size: u32) -> u64 {
    NODEHEADER_SIZE + NON_LEAFNODE_SIZE * u64::from(block_size)
}

/// The on-disk size of a (zero-padded) leaf node for a given block size
pub fn leaf_node_size(block_size: u32) -> u64 {
    NODEHEADER_SIZE + LEAFNODE_SIZE * u64::from(block_size)
}

/// A candidate byte range in the data file that the index covers.
///
/// Blocks returned from a search are a superset of the records that overlap
/// the query: the caller must read the bytes back and filter on the real
/// record coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block {
    pub offset: u64,
    pub size: u64,
}

impl Block {
    /// Offset just past this block, saturating on overflow.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// A single record to be indexed: its range and where it lives in the data file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub range: ChromRange,
    pub offset: u64,
    pub size: u64,
}

impl Item {
    pub fn new(range: ChromRange, offset: u64, size: u64) -> Self {
        Item {
            range,
            offset,
            size,
        }
    }

    /// Offset just past this item's data
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// The order items must be in when building an index: by chromosome, then
/// start, with longer items first when starts are equal.
pub fn compare_items(a: &Item, b: &Item) -> Ordering {
    a.range
        .chrom
        .cmp(&b.range.chrom)
        .then(a.range.start.cmp(&b.range.start))
        .then(b.range.end.cmp(&a.range.end))
}

/// Sorts items into the order expected by the index builder.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(compare_items);
}

#[cfg(feature = "write")]
pub use build::*;
#[cfg(feature = "read")]
pub use read::*;
#[cfg(feature = "write")]
pub use write::*;
