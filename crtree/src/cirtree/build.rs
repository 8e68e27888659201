use std::cmp::Ordering;
use std::ops::Range;

use itertools::Itertools;
use thiserror::Error;

use crate::cirtree::range::{compare_position, BoundingRange};
use crate::cirtree::write::CirTreeWriteOptions;
use crate::cirtree::Item;

/// Possible errors encountered when building an index
#[derive(Error, Debug)]
pub enum CirTreeBuildError {
    #[error("{}", .0)]
    InvalidParameter(String),
    #[error("Input is not sorted: item {} starts before the item preceding it.", .index)]
    UnsortedInput { index: u64 },
}

/// A leaf entry: the bounds of one or more consecutive items and the span of
/// the data file holding them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct LeafSlot {
    pub(crate) bounds: BoundingRange,
    pub(crate) offset: u64,
    pub(crate) end_offset: u64,
}

impl LeafSlot {
    fn new(item: &Item) -> Self {
        LeafSlot {
            bounds: item.range.bounds(),
            offset: item.offset,
            end_offset: item.offset.saturating_add(item.size),
        }
    }

    fn extend(self, item: &Item) -> Self {
        LeafSlot {
            bounds: self.bounds.union(item.range.bounds()),
            offset: self.offset,
            end_offset: self.end_offset.max(item.offset.saturating_add(item.size)),
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.end_offset - self.offset
    }
}

/// A node of the in-memory tree. `children` indexes into the level below (or
/// into the slots, for the leaf level).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RTreeNode {
    pub(crate) bounds: BoundingRange,
    pub(crate) children: Range<usize>,
}

/// An index built in memory, ready to be written.
#[derive(Debug)]
pub struct RTree {
    pub(crate) slots: Vec<LeafSlot>,
    /// Root level first, leaf level last
    pub(crate) levels: Vec<Vec<RTreeNode>>,
    pub(crate) item_count: u64,
    pub(crate) block_size: u32,
    pub(crate) items_per_slot: u32,
}

impl RTree {
    /// The number of node levels, including the root and the leaf level.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn items_per_slot(&self) -> u32 {
        self.items_per_slot
    }

    /// The bounds of the whole tree. Empty trees have zeroed bounds.
    pub fn bounds(&self) -> BoundingRange {
        self.levels
            .first()
            .and_then(|root| root.first())
            .map(|root| root.bounds)
            .unwrap_or_default()
    }

    /// The number of nodes at each level, root first.
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels.iter().map(|level| level.len()).collect()
    }
}

fn bounds_of(bounds: impl Iterator<Item = BoundingRange>) -> BoundingRange {
    bounds.reduce(BoundingRange::union).unwrap_or_default()
}

fn group_level(children: &[BoundingRange], block_size: usize) -> Vec<RTreeNode> {
    (0..children.len())
        .step_by(block_size)
        .map(|start| {
            let end = (start + block_size).min(children.len());
            RTreeNode {
                bounds: bounds_of(children[start..end].iter().copied()),
                children: start..end,
            }
        })
        .collect()
}

/// Builds an r-tree from items sorted by chromosome and start (see
/// [`compare_items`][crate::compare_items]).
///
/// Consecutive runs of `items_per_slot` items are bundled into a single leaf
/// slot, then slots are grouped `block_size` to a leaf node, and nodes grouped
/// `block_size` to a parent until a single root remains. Unsorted input is
/// rejected rather than re-sorted.
pub fn build_rtree<I>(items: I, options: CirTreeWriteOptions) -> Result<RTree, CirTreeBuildError>
where
    I: IntoIterator<Item = Item>,
{
    options.validate()?;

    let block_size = options.block_size as usize;
    let items_per_slot = options.items_per_slot as usize;

    let mut total_items: u64 = 0;
    let mut unsorted_at = None;
    let mut prev: Option<Item> = None;
    let slots: Vec<LeafSlot> = {
        let chunks = items
            .into_iter()
            .inspect(|item| {
                let before_prev = prev.map_or(false, |p| {
                    let (a, b) = (item.range, p.range);
                    compare_position(a.chrom, a.start, b.chrom, b.start) == Ordering::Less
                });
                if before_prev && unsorted_at.is_none() {
                    unsorted_at = Some(total_items);
                }
                prev = Some(*item);
                total_items += 1;
            })
            .chunks(items_per_slot);
        let slots = chunks
            .into_iter()
            .filter_map(|chunk| {
                chunk.fold(None, |slot: Option<LeafSlot>, item| {
                    Some(match slot {
                        None => LeafSlot::new(&item),
                        Some(slot) => slot.extend(&item),
                    })
                })
            })
            .collect();
        slots
    };
    if let Some(index) = unsorted_at {
        return Err(CirTreeBuildError::UnsortedInput { index });
    }

    let slot_bounds: Vec<BoundingRange> = slots.iter().map(|s| s.bounds).collect();
    let mut current = group_level(&slot_bounds, block_size);
    if current.is_empty() {
        current.push(RTreeNode {
            bounds: BoundingRange::default(),
            children: 0..0,
        });
    }
    tracing::debug!(
        "Made {} slots in {} leaf nodes out of {} items",
        slots.len(),
        current.len(),
        total_items
    );

    let mut levels = vec![];
    while current.len() > 1 {
        let child_bounds: Vec<BoundingRange> = current.iter().map(|n| n.bounds).collect();
        let parents = group_level(&child_bounds, block_size);
        levels.push(current);
        current = parents;
    }
    levels.push(current);
    levels.reverse();

    let tree = RTree {
        slots,
        levels,
        item_count: total_items,
        block_size: options.block_size,
        items_per_slot: options.items_per_slot,
    };
    tracing::debug!(
        "{} levels. Level sizes are {:?}",
        tree.level_count(),
        tree.level_sizes()
    );
    Ok(tree)
}
