use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use byteordered::Endianness;
use thiserror::Error;

use crate::cirtree::build::{build_rtree, CirTreeBuildError, LeafSlot, RTree, RTreeNode};
use crate::cirtree::range::BoundingRange;
use crate::cirtree::{
    index_node_size, leaf_node_size, Item, CIR_TREE_HEADER_SIZE, CIR_TREE_MAGIC,
    LEAFNODE_SIZE, NON_LEAFNODE_SIZE,
};
use crate::utils::tell::Tell;

/// The default block size used when writing an index
pub const DEFAULT_BLOCK_SIZE: u32 = 256;
/// The default items per slot used when writing an index
pub const DEFAULT_ITEMS_PER_SLOT: u32 = 1;

/// Options for writing an index
#[derive(Copy, Clone, Debug)]
pub struct CirTreeWriteOptions {
    /// Maximum number of children of any node
    pub block_size: u32,
    /// Number of items bundled into a single leaf entry
    pub items_per_slot: u32,
    /// Byte order of the written file. Readers detect either order.
    pub endianness: Endianness,
}

impl Default for CirTreeWriteOptions {
    fn default() -> Self {
        CirTreeWriteOptions {
            block_size: DEFAULT_BLOCK_SIZE,
            items_per_slot: DEFAULT_ITEMS_PER_SLOT,
            endianness: Endianness::native(),
        }
    }
}

impl CirTreeWriteOptions {
    pub(crate) fn validate(&self) -> Result<(), CirTreeBuildError> {
        if self.block_size < 2 {
            return Err(CirTreeBuildError::InvalidParameter(format!(
                "Block size must be at least 2 (got {}).",
                self.block_size
            )));
        }
        if self.block_size > u32::from(u16::MAX) {
            return Err(CirTreeBuildError::InvalidParameter(format!(
                "Block size must be at most {} (got {}).",
                u16::MAX,
                self.block_size
            )));
        }
        if self.items_per_slot < 1 {
            return Err(CirTreeBuildError::InvalidParameter(
                "Items per slot must be at least 1.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Possible errors encountered when writing an index
#[derive(Error, Debug)]
pub enum CirTreeWriteError {
    #[error("{}", .0)]
    BuildError(#[from] CirTreeBuildError),
    #[error("Internal error: offset mismatch (at {} but expected {})", .actual, .expected)]
    OffsetMismatch { expected: u64, actual: u64 },
    #[error("Error occurred: {}", .0)]
    IoError(#[from] io::Error),
}

/// Computes the absolute offset of the first node of each level, plus the
/// offset just past the last leaf node.
fn calculate_offsets(tree: &RTree, index_start: u64) -> Vec<u64> {
    let block_size = tree.block_size;
    let leaf_level = tree.levels.len() - 1;
    let mut offsets = Vec::with_capacity(tree.levels.len() + 1);
    let mut offset = index_start;
    for (level, nodes) in tree.levels.iter().enumerate() {
        offsets.push(offset);
        let node_size = if level == leaf_level {
            leaf_node_size(block_size)
        } else {
            index_node_size(block_size)
        };
        offset += nodes.len() as u64 * node_size;
    }
    offsets.push(offset);
    offsets
}

fn write_zeroes<W: Write>(file: &mut W, count: u64) -> io::Result<()> {
    io::copy(&mut io::repeat(0).take(count), file)?;
    Ok(())
}

fn write_bounds<E: ByteOrder, W: Write>(file: &mut W, bounds: &BoundingRange) -> io::Result<()> {
    file.write_u32::<E>(bounds.start_chrom_ix)?;
    file.write_u32::<E>(bounds.start_base)?;
    file.write_u32::<E>(bounds.end_chrom_ix)?;
    file.write_u32::<E>(bounds.end_base)?;
    Ok(())
}

fn write_index_node<E: ByteOrder, W: Write>(
    file: &mut W,
    node: &RTreeNode,
    children: &[RTreeNode],
    childnode_offset: u64,
    child_node_size: u64,
    block_size: u32,
) -> io::Result<()> {
    let count = node.children.len();
    file.write_u8(0)?;
    file.write_u8(0)?;
    file.write_u16::<E>(count as u16)?;
    for idx in node.children.clone() {
        let child = &children[idx];
        write_bounds::<E, _>(file, &child.bounds)?;
        file.write_u64::<E>(childnode_offset + idx as u64 * child_node_size)?;
    }
    write_zeroes(file, (u64::from(block_size) - count as u64) * NON_LEAFNODE_SIZE)
}

fn write_leaf_node<E: ByteOrder, W: Write>(
    file: &mut W,
    node: &RTreeNode,
    slots: &[LeafSlot],
    block_size: u32,
) -> io::Result<()> {
    let count = node.children.len();
    file.write_u8(1)?;
    file.write_u8(0)?;
    file.write_u16::<E>(count as u16)?;
    for slot in &slots[node.children.clone()] {
        write_bounds::<E, _>(file, &slot.bounds)?;
        file.write_u64::<E>(slot.offset)?;
        file.write_u64::<E>(slot.size())?;
    }
    write_zeroes(file, (u64::from(block_size) - count as u64) * LEAFNODE_SIZE)
}

fn write_rtreeindex_inner<E: ByteOrder, W: Write + Seek>(
    file: &mut W,
    tree: &RTree,
    total_data_size: u64,
) -> Result<(), CirTreeWriteError> {
    let header_start = file.tell()?;
    let bounds = tree.bounds();
    file.write_u32::<E>(CIR_TREE_MAGIC)?;
    file.write_u32::<E>(tree.block_size)?;
    file.write_u64::<E>(tree.item_count)?;
    write_bounds::<E, _>(file, &bounds)?;
    file.write_u64::<E>(total_data_size)?;
    file.write_u32::<E>(tree.items_per_slot)?;
    file.write_u32::<E>(0)?; // reserved

    let index_start = header_start + CIR_TREE_HEADER_SIZE;
    let level_offsets = calculate_offsets(tree, index_start);
    for (level, offset) in level_offsets.iter().enumerate().take(tree.levels.len()) {
        tracing::debug!(
            "level {}: size {}, offset {}",
            level,
            tree.levels[level].len(),
            offset
        );
    }

    let leaf_level = tree.levels.len() - 1;
    for (level, nodes) in tree.levels.iter().enumerate() {
        let actual = file.tell()?;
        if actual != level_offsets[level] {
            tracing::error!(
                "Offset mismatch writing level {}: at {}, expected {}",
                level,
                actual,
                level_offsets[level]
            );
            return Err(CirTreeWriteError::OffsetMismatch {
                expected: level_offsets[level],
                actual,
            });
        }
        if level == leaf_level {
            for node in nodes {
                write_leaf_node::<E, _>(file, node, &tree.slots, tree.block_size)?;
            }
        } else {
            let child_node_size = if level + 1 == leaf_level {
                leaf_node_size(tree.block_size)
            } else {
                index_node_size(tree.block_size)
            };
            let children = &tree.levels[level + 1];
            for node in nodes {
                write_index_node::<E, _>(
                    file,
                    node,
                    children,
                    level_offsets[level + 1],
                    child_node_size,
                    tree.block_size,
                )?;
            }
        }
    }

    let actual = file.tell()?;
    let expected = level_offsets[tree.levels.len()];
    if actual != expected {
        return Err(CirTreeWriteError::OffsetMismatch { expected, actual });
    }

    Ok(())
}

/// Writes a built index at the current position of `file`.
///
/// All offsets written are absolute, so an index can be embedded in a larger
/// file. `total_data_size` is the size of the data file being indexed.
pub fn write_rtreeindex<W: Write + Seek>(
    file: &mut W,
    tree: &RTree,
    total_data_size: u64,
    endianness: Endianness,
) -> Result<(), CirTreeWriteError> {
    match endianness {
        Endianness::Big => write_rtreeindex_inner::<BigEndian, W>(file, tree, total_data_size),
        Endianness::Little => {
            write_rtreeindex_inner::<LittleEndian, W>(file, tree, total_data_size)
        }
    }
}

/// Builds an index from sorted `items` and writes it to `path`.
///
/// The index is written to a temporary file next to `path` and only moved into
/// place once it has been completely written, so a failed build never leaves a
/// partial index behind.
pub fn create_file<P, I>(
    path: P,
    items: I,
    total_data_size: u64,
    options: CirTreeWriteOptions,
) -> Result<RTree, CirTreeWriteError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Item>,
{
    let path = path.as_ref();
    let tree = build_rtree(items, options)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tempfile = tempfile::NamedTempFile::new_in(dir)?;
    let mut file = BufWriter::new(tempfile);
    write_rtreeindex(&mut file, &tree, total_data_size, options.endianness)?;
    let tempfile = file.into_inner().map_err(|e| e.into_error())?;
    tempfile.persist(path).map_err(|e| e.error)?;

    tracing::info!(
        "Wrote index of {} items ({} levels) to {}",
        tree.item_count(),
        tree.level_count(),
        path.display()
    );
    Ok(tree)
}
