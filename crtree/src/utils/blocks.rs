/*!
Helpers for reading back the blocks returned by a search.

Searches return blocks in file order, and neighbouring blocks are frequently
adjacent in the data file. These helpers group adjacent blocks so they can be
read with a single seek and read.
*/
use std::io::{self, Read, Seek, SeekFrom};

use crate::Block;

/// Splits `blocks` at the first gap: the first slice holds the leading run of
/// blocks where each starts exactly where the previous one ended.
pub fn find_gap(blocks: &[Block]) -> (&[Block], &[Block]) {
    let gap = blocks
        .windows(2)
        .position(|w| w[1].offset != w[0].end())
        .map_or(blocks.len(), |i| i + 1);
    blocks.split_at(gap)
}

/// Iterates over runs of contiguous blocks.
pub fn contiguous_runs(mut blocks: &[Block]) -> impl Iterator<Item = &[Block]> {
    std::iter::from_fn(move || {
        if blocks.is_empty() {
            return None;
        }
        let (run, rest) = find_gap(blocks);
        blocks = rest;
        Some(run)
    })
}

/// Merges each run of contiguous blocks into a single block.
pub fn coalesce_blocks(blocks: &[Block]) -> Vec<Block> {
    contiguous_runs(blocks)
        .map(|run| {
            let offset = run[0].offset;
            let end = run[run.len() - 1].end();
            Block {
                offset,
                size: end - offset,
            }
        })
        .collect()
}

/// Reads the data for each block, one read per contiguous run.
///
/// Blocks reaching past the end of `read` are rejected with `InvalidData`
/// before anything is allocated for them.
pub fn read_blocks<R: Read + Seek>(read: &mut R, blocks: &[Block]) -> io::Result<Vec<Vec<u8>>> {
    let len = read.seek(SeekFrom::End(0))?;
    let mut data = Vec::with_capacity(blocks.len());
    for (run, merged) in contiguous_runs(blocks).zip(coalesce_blocks(blocks)) {
        match merged.offset.checked_add(merged.size) {
            Some(end) if end <= len => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Block at {} of size {} is past the end of the data ({})",
                        merged.offset, merged.size, len
                    ),
                ))
            }
        }
        read.seek(SeekFrom::Start(merged.offset))?;
        let mut merged_data = vec![0u8; merged.size as usize];
        read.read_exact(&mut merged_data)?;

        let mut rest = &merged_data[..];
        for block in run {
            let (block_data, remaining) = rest.split_at(block.size as usize);
            data.push(block_data.to_vec());
            rest = remaining;
        }
    }
    Ok(data)
}
