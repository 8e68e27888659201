use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteordered::Endianness;
use bytes::{Buf, BytesMut};
use itertools::Either;
use smallvec::{smallvec, SmallVec};
use thiserror::Error;

use crate::cirtree::range::{BoundingRange, ChromRange, InvalidRange};
use crate::cirtree::{Block, CIR_TREE_HEADER_SIZE, CIR_TREE_MAGIC, LEAFNODE_SIZE, NON_LEAFNODE_SIZE};
use crate::utils::idmap::ChromIdMap;
use crate::utils::tell::Tell;

/// Header info for an index file
#[derive(Copy, Clone, Debug)]
pub struct CirTreeHeader {
    /// The byte order the file was written in
    pub endianness: Endianness,
    pub block_size: u32,
    pub item_count: u64,
    pub items_per_slot: u32,
    /// The area spanned by every item in the index
    pub bounds: BoundingRange,
    /// Size of the data file the index was built over
    pub total_data_size: u64,

    pub(crate) root_offset: u64,
}

impl CirTreeHeader {
    /// Whether the file byte order differs from this machine's.
    pub fn is_swapped(&self) -> bool {
        self.endianness != Endianness::native()
    }

    /// Offset of the root node (directly after the header).
    pub fn root_offset(&self) -> u64 {
        self.root_offset
    }

    /// Whether the index is small enough that no real tree was needed. Searches
    /// on such an index return the whole data file as one block.
    pub fn is_degenerate(&self) -> bool {
        self.item_count <= u64::from(self.block_size)
    }
}

/// Possible errors encountered when opening an index file
#[derive(Error, Debug)]
pub enum CirTreeOpenError {
    #[error("{} is not a chromosome id r-tree index file", .0)]
    NotAnIndexFile(String),
    #[error("Error occurred: {}", .0)]
    IoError(#[from] io::Error),
}

/// Possible errors encountered when searching an index
#[derive(Error, Debug)]
pub enum CirTreeSearchError {
    #[error("{}", .0)]
    InvalidRange(#[from] InvalidRange),
    #[error("The passed chromosome ({}) was incorrect.", .0)]
    InvalidChromosome(String),
    #[error("Invalid node at offset {} (isLeaf = {}).", .offset, .is_leaf)]
    InvalidNode { offset: u64, is_leaf: u8 },
    #[error("Error occurred: {}", .0)]
    IoError(#[from] io::Error),
}

fn name_io_error(name: &str, e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {}", name, e))
}

impl CirTreeSearchError {
    fn with_name(self, name: &str) -> Self {
        match self {
            CirTreeSearchError::IoError(e) => CirTreeSearchError::IoError(name_io_error(name, e)),
            e => e,
        }
    }
}

#[derive(Debug)]
pub(crate) struct UnknownMagic;

#[inline]
fn get_u32(buf: &mut BytesMut, endianness: Endianness) -> u32 {
    match endianness {
        Endianness::Big => buf.get_u32(),
        Endianness::Little => buf.get_u32_le(),
    }
}

#[inline]
fn get_u64(buf: &mut BytesMut, endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Big => buf.get_u64(),
        Endianness::Little => buf.get_u64_le(),
    }
}

#[inline]
fn get_bounds(buf: &mut BytesMut, endianness: Endianness) -> BoundingRange {
    BoundingRange {
        start_chrom_ix: get_u32(buf, endianness),
        start_base: get_u32(buf, endianness),
        end_chrom_ix: get_u32(buf, endianness),
        end_base: get_u32(buf, endianness),
    }
}

/// Reads the index header at the current position. The byte order is detected
/// from the magic number.
pub(crate) fn read_cir_tree_header<R: Read + Seek>(
    file: &mut R,
) -> Result<CirTreeHeader, Either<UnknownMagic, io::Error>> {
    let header_start = file.tell().map_err(Either::Right)?;

    // Anything too short to hold a magic number isn't an index.
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(Either::Left(UnknownMagic))
        }
        Err(e) => return Err(Either::Right(e)),
    }
    let endianness = if u32::from_le_bytes(magic) == CIR_TREE_MAGIC {
        Endianness::Little
    } else if u32::from_be_bytes(magic) == CIR_TREE_MAGIC {
        Endianness::Big
    } else {
        return Err(Either::Left(UnknownMagic));
    };

    let mut header_data = BytesMut::zeroed(CIR_TREE_HEADER_SIZE as usize - magic.len());
    file.read_exact(&mut header_data).map_err(Either::Right)?;

    let block_size = get_u32(&mut header_data, endianness);
    let item_count = get_u64(&mut header_data, endianness);
    let bounds = get_bounds(&mut header_data, endianness);
    let total_data_size = get_u64(&mut header_data, endianness);
    let items_per_slot = get_u32(&mut header_data, endianness);
    let _reserved = get_u32(&mut header_data, endianness);

    Ok(CirTreeHeader {
        endianness,
        block_size,
        item_count,
        items_per_slot,
        bounds,
        total_data_size,
        root_offset: header_start + CIR_TREE_HEADER_SIZE,
    })
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct CirTreeNodeLeaf {
    bounds: BoundingRange,
    data_offset: u64,
    data_size: u64,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct CirTreeNodeNonLeaf {
    bounds: BoundingRange,
    node_offset: u64,
}

pub(crate) struct CirTreeLeafItemIterator {
    endianness: Endianness,
    remaining: usize,
    bytes: BytesMut,
}

impl Iterator for CirTreeLeafItemIterator {
    type Item = CirTreeNodeLeaf;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let bytes = &mut self.bytes;
        let endianness = self.endianness;
        let bounds = get_bounds(bytes, endianness);
        let data_offset = get_u64(bytes, endianness);
        let data_size = get_u64(bytes, endianness);
        Some(CirTreeNodeLeaf {
            bounds,
            data_offset,
            data_size,
        })
    }
}

pub(crate) struct CirTreeNonLeafItemsIterator {
    endianness: Endianness,
    remaining: usize,
    bytes: BytesMut,
}

impl Iterator for CirTreeNonLeafItemsIterator {
    type Item = CirTreeNodeNonLeaf;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let bytes = &mut self.bytes;
        let endianness = self.endianness;
        let bounds = get_bounds(bytes, endianness);
        let node_offset = get_u64(bytes, endianness);
        Some(CirTreeNodeNonLeaf {
            bounds,
            node_offset,
        })
    }
}

pub(crate) enum CirTreeNodeIterator {
    Leaf(CirTreeLeafItemIterator),
    NonLeaf(CirTreeNonLeafItemsIterator),
}

/// Reads the node at `node_offset`. Only the `count` live children are read;
/// padding slots after them are never touched.
pub(crate) fn read_node<R: Read + Seek>(
    file: &mut R,
    node_offset: u64,
    endianness: Endianness,
) -> Result<CirTreeNodeIterator, CirTreeSearchError> {
    file.seek(SeekFrom::Start(node_offset))?;

    let mut header_data = BytesMut::zeroed(4);
    file.read_exact(&mut header_data)?;

    let isleaf: u8 = header_data.get_u8();
    let _reserved = header_data.get_u8();
    let count = match endianness {
        Endianness::Big => header_data.get_u16(),
        Endianness::Little => header_data.get_u16_le(),
    } as usize;

    let iter = match isleaf {
        1 => {
            let mut bytes = BytesMut::zeroed(count * LEAFNODE_SIZE as usize);
            file.read_exact(&mut bytes)?;
            CirTreeNodeIterator::Leaf(CirTreeLeafItemIterator {
                endianness,
                remaining: count,
                bytes,
            })
        }
        0 => {
            let mut bytes = BytesMut::zeroed(count * NON_LEAFNODE_SIZE as usize);
            file.read_exact(&mut bytes)?;
            CirTreeNodeIterator::NonLeaf(CirTreeNonLeafItemsIterator {
                endianness,
                remaining: count,
                bytes,
            })
        }
        is_leaf => {
            return Err(CirTreeSearchError::InvalidNode {
                offset: node_offset,
                is_leaf,
            })
        }
    };
    Ok(iter)
}

fn nodes_overlapping<F: Fn(&BoundingRange) -> bool>(
    iter: CirTreeNodeIterator,
    wanted: &F,
) -> (SmallVec<[u64; 4]>, SmallVec<[Block; 4]>) {
    match iter {
        CirTreeNodeIterator::Leaf(iter) => {
            let blocks = iter
                .filter(|child| wanted(&child.bounds))
                .map(|child| Block {
                    offset: child.data_offset,
                    size: child.data_size,
                })
                .collect();
            (smallvec![], blocks)
        }
        CirTreeNodeIterator::NonLeaf(iter) => {
            let childblocks = iter
                .filter(|child| wanted(&child.bounds))
                .map(|child| child.node_offset)
                .collect();
            (childblocks, smallvec![])
        }
    }
}

/// Stats on a single search of the tree
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CirTreeSearchStats {
    /// Offsets of every node read, in the order they were read
    pub visited_nodes: Vec<u64>,
}

pub(crate) struct CirTreeBlockSearchIter<'a, R: Read + Seek, F: Fn(&BoundingRange) -> bool> {
    remaining_childblocks: VecDeque<u64>,

    file: &'a mut R,
    endianness: Endianness,
    wanted: F,
    stats: &'a mut CirTreeSearchStats,
}

impl<'a, R: Read + Seek, F: Fn(&BoundingRange) -> bool> Iterator
    for CirTreeBlockSearchIter<'a, R, F>
{
    type Item = Result<SmallVec<[Block; 4]>, CirTreeSearchError>;
    fn next(&mut self) -> Option<Self::Item> {
        let node_offset = self.remaining_childblocks.pop_front()?;
        self.stats.visited_nodes.push(node_offset);

        let iter = match read_node(&mut *self.file, node_offset, self.endianness) {
            Ok(iter) => iter,
            Err(e) => return Some(Err(e)),
        };
        let (new_childblocks, blocks) = nodes_overlapping(iter, &self.wanted);
        tracing::trace!(
            "Node at {}: {} children to visit, {} blocks",
            node_offset,
            new_childblocks.len(),
            blocks.len()
        );

        // Depth-first, so blocks come out in file order
        for child in new_childblocks.into_iter().rev() {
            self.remaining_childblocks.push_front(child);
        }

        Some(Ok(blocks))
    }
}

fn search_blocks<R: Read + Seek, F: Fn(&BoundingRange) -> bool>(
    endianness: Endianness,
    file: &mut R,
    at: u64,
    wanted: F,
    stats: &mut CirTreeSearchStats,
) -> Result<Vec<Block>, CirTreeSearchError> {
    let mut remaining_childblocks = VecDeque::with_capacity(2048);
    remaining_childblocks.push_front(at);
    let iter = CirTreeBlockSearchIter {
        remaining_childblocks,
        file,
        endianness,
        wanted,
        stats,
    };

    let mut blocks = vec![];
    for i in iter {
        blocks.extend(i?);
    }
    Ok(blocks)
}

/// Searches the tree rooted at `at` for leaf blocks overlapping `query`.
#[cfg(test)]
pub(crate) fn search_cir_tree_inner<R: Read + Seek>(
    endianness: Endianness,
    file: &mut R,
    at: u64,
    query: &ChromRange,
) -> Result<Vec<Block>, CirTreeSearchError> {
    let mut stats = CirTreeSearchStats::default();
    search_blocks(
        endianness,
        file,
        at,
        |bounds| bounds.overlaps(query),
        &mut stats,
    )
}

/// An opened index file.
///
/// Only the header is read when opening. Nodes are read from the underlying
/// reader on every search and are not cached.
pub struct CirTreeFile<R> {
    name: String,
    read: R,
    header: CirTreeHeader,
}

impl CirTreeFile<BufReader<File>> {
    /// Opens an index file
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, CirTreeOpenError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| name_io_error(&name, e))?;
        let res = CirTreeFile::attach(name, BufReader::new(file));
        if let Err(e) = &res {
            tracing::debug!("Error when opening {}: {}", path.display(), e);
        }
        res
    }
}

impl<R: Read + Seek> CirTreeFile<R> {
    /// Reads an index whose header is at the current position of `read`.
    /// `name` is used in error messages.
    pub fn attach(name: impl Into<String>, mut read: R) -> Result<Self, CirTreeOpenError> {
        let name = name.into();
        let header = match read_cir_tree_header(&mut read) {
            Ok(header) => header,
            Err(Either::Left(UnknownMagic)) => return Err(CirTreeOpenError::NotAnIndexFile(name)),
            Err(Either::Right(e)) => return Err(name_io_error(&name, e).into()),
        };
        tracing::debug!(
            "Opened {}: {} items, block size {}, swapped: {}",
            name,
            header.item_count,
            header.block_size,
            header.is_swapped()
        );
        Ok(CirTreeFile { name, read, header })
    }

    pub fn header(&self) -> &CirTreeHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gives back the underlying reader.
    pub fn into_inner(self) -> R {
        self.read
    }

    /// Returns the blocks of the data file that between them contain every
    /// item overlapping `query`. Blocks are in file order and will usually
    /// also contain items that don't overlap.
    pub fn find_overlapping_blocks(
        &mut self,
        query: &ChromRange,
    ) -> Result<Vec<Block>, CirTreeSearchError> {
        self.find_overlapping_blocks_with_stats(query)
            .map(|(blocks, _)| blocks)
    }

    /// Like [`find_overlapping_blocks`][Self::find_overlapping_blocks], but
    /// also reports which nodes were read.
    pub fn find_overlapping_blocks_with_stats(
        &mut self,
        query: &ChromRange,
    ) -> Result<(Vec<Block>, CirTreeSearchStats), CirTreeSearchError> {
        if query.start > query.end {
            return Err(InvalidRange {
                start: query.start,
                end: query.end,
            }
            .into());
        }

        let header = self.header;
        let mut stats = CirTreeSearchStats::default();
        if header.is_degenerate() {
            let blocks = if header.item_count > 0 && header.bounds.overlaps(query) {
                vec![Block {
                    offset: 0,
                    size: header.total_data_size,
                }]
            } else {
                vec![]
            };
            return Ok((blocks, stats));
        }

        let blocks = search_blocks(
            header.endianness,
            &mut self.read,
            header.root_offset,
            |bounds| bounds.overlaps(query),
            &mut stats,
        )
        .map_err(|e| e.with_name(&self.name))?;
        Ok((blocks, stats))
    }

    /// Looks up `chrom` in `chroms` and searches for `start..end` on it.
    pub fn find_overlapping_blocks_by_name(
        &mut self,
        chroms: &ChromIdMap,
        chrom: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Block>, CirTreeSearchError> {
        let chrom_ix = chroms
            .get(chrom)
            .ok_or_else(|| CirTreeSearchError::InvalidChromosome(chrom.to_string()))?;
        let query = ChromRange::new(chrom_ix, start, end)?;
        self.find_overlapping_blocks(&query)
    }

    /// Returns every leaf block of the index, in file order.
    pub fn enumerate_blocks(&mut self) -> Result<Vec<Block>, CirTreeSearchError> {
        let header = self.header;
        let mut stats = CirTreeSearchStats::default();
        search_blocks(
            header.endianness,
            &mut self.read,
            header.root_offset,
            |_| true,
            &mut stats,
        )
        .map_err(|e| e.with_name(&self.name))
    }
}
