use std::error::Error;
use std::fs::File;
use std::io::{Cursor, Write};

use byteordered::Endianness;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crtree::utils::blocks::read_blocks;
use crtree::utils::idmap::ChromIdMap;
use crtree::{
    build_rtree, create_file, sort_items, write_rtreeindex, Block, ChromRange, CirTreeFile,
    CirTreeWriteError, CirTreeWriteOptions, Item,
};

fn item(chrom: u32, start: u32, end: u32, offset: u64, size: u64) -> Item {
    Item::new(ChromRange::new(chrom, start, end).unwrap(), offset, size)
}

fn options(block_size: u32, items_per_slot: u32, endianness: Endianness) -> CirTreeWriteOptions {
    CirTreeWriteOptions {
        block_size,
        items_per_slot,
        endianness,
    }
}

fn in_memory(
    items: &[Item],
    total_data_size: u64,
    options: CirTreeWriteOptions,
) -> Result<CirTreeFile<Cursor<Vec<u8>>>, Box<dyn Error>> {
    let tree = build_rtree(items.iter().copied(), options)?;
    let mut out = Cursor::new(vec![]);
    write_rtreeindex(&mut out, &tree, total_data_size, options.endianness)?;
    out.set_position(0);
    Ok(CirTreeFile::attach("in-memory", out)?)
}

fn covered(item: &Item, blocks: &[Block]) -> bool {
    blocks
        .iter()
        .any(|b| b.offset <= item.offset && item.end_offset() <= b.end())
}

#[test]
fn test_three_items() -> Result<(), Box<dyn Error>> {
    let mut chroms = ChromIdMap::default();
    let chr1 = chroms.get_id("chr1");
    let chr2 = chroms.get_id("chr2");
    let items = vec![
        item(chr1, 100, 200, 0, 50),
        item(chr1, 150, 250, 50, 60),
        item(chr2, 10, 20, 110, 30),
    ];
    let mut index = in_memory(&items, 140, options(2, 1, Endianness::native()))?;
    assert!(!index.header().is_degenerate());
    assert_eq!(index.header().item_count, 3);

    let blocks = index.find_overlapping_blocks_by_name(&chroms, "chr1", 120, 160)?;
    assert_eq!(
        blocks,
        vec![Block { offset: 0, size: 50 }, Block { offset: 50, size: 60 }]
    );

    let blocks = index.find_overlapping_blocks_by_name(&chroms, "chr2", 0, 5)?;
    assert!(blocks.is_empty());

    let blocks = index.find_overlapping_blocks_by_name(&chroms, "chr2", 15, 16)?;
    assert_eq!(blocks, vec![Block { offset: 110, size: 30 }]);

    assert!(index
        .find_overlapping_blocks_by_name(&chroms, "chr3", 0, 5)
        .is_err());

    Ok(())
}

fn random_items(rng: &mut StdRng, count: usize) -> (Vec<Item>, u64) {
    let mut items: Vec<Item> = (0..count)
        .map(|_| {
            let chrom = rng.gen_range(0..4);
            let start = rng.gen_range(0..10_000);
            let len = rng.gen_range(0..500);
            item(chrom, start, start + len, 0, 0)
        })
        .collect();
    sort_items(&mut items);
    let mut offset = 0;
    for item in items.iter_mut() {
        item.offset = offset;
        item.size = rng.gen_range(1..100);
        offset += item.size;
    }
    (items, offset)
}

#[test]
fn test_random_against_brute_force() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(0x2468ACE0);
    for &(count, block_size, items_per_slot) in &[
        (0, 4, 1),
        (3, 4, 1),
        (50, 2, 1),
        (200, 3, 2),
        (1000, 17, 1),
        (1000, 8, 5),
        (3000, 256, 1),
    ] {
        let (items, total_size) = random_items(&mut rng, count);
        let mut index = in_memory(&items, total_size, options(block_size, items_per_slot, Endianness::native()))?;

        for _ in 0..200 {
            let chrom = rng.gen_range(0..5);
            let start = rng.gen_range(0..10_500);
            let end = start + rng.gen_range(0..1_000);
            let query = ChromRange::new(chrom, start, end)?;
            let blocks = index.find_overlapping_blocks(&query)?;

            for item in items.iter().filter(|i| i.range.overlaps(&query)) {
                assert!(
                    covered(item, &blocks),
                    "{:?} not covered for query {:?} (count {}, block size {})",
                    item,
                    query,
                    count,
                    block_size
                );
            }
            assert!(blocks.windows(2).all(|w| w[0].offset <= w[1].offset));
            assert!(blocks.iter().all(|b| b.end() <= total_size));
            if !index.header().is_degenerate() && items_per_slot == 1 {
                // With one item per slot, every block is a single overlapping item.
                for block in &blocks {
                    assert!(items
                        .iter()
                        .filter(|i| i.offset == block.offset && i.size == block.size)
                        .any(|i| i.range.overlaps(&query)));
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_byte_orders_agree() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let (items, total_size) = random_items(&mut rng, 500);

    let mut big = in_memory(&items, total_size, options(6, 1, Endianness::Big))?;
    let mut little = in_memory(&items, total_size, options(6, 1, Endianness::Little))?;
    assert_eq!(big.header().endianness, Endianness::Big);
    assert_eq!(little.header().endianness, Endianness::Little);
    assert_ne!(big.header().is_swapped(), little.header().is_swapped());
    assert_eq!(big.header().bounds, little.header().bounds);
    assert_eq!(big.header().total_data_size, total_size);

    for chrom in 0..4 {
        for start in (0..10_000).step_by(700) {
            let query = ChromRange::new(chrom, start, start + 300)?;
            assert_eq!(
                big.find_overlapping_blocks(&query)?,
                little.find_overlapping_blocks(&query)?
            );
        }
    }
    assert_eq!(big.enumerate_blocks()?, little.enumerate_blocks()?);
    Ok(())
}

#[test]
fn test_small_index_returns_whole_file() -> Result<(), Box<dyn Error>> {
    let items = vec![item(0, 100, 200, 0, 10), item(0, 300, 400, 10, 10)];
    let mut index = in_memory(&items, 1000, options(4, 1, Endianness::native()))?;
    assert!(index.header().is_degenerate());

    let query = ChromRange::new(0, 150, 160)?;
    assert_eq!(
        index.find_overlapping_blocks(&query)?,
        vec![Block {
            offset: 0,
            size: 1000
        }]
    );
    // Outside the bounds of every item
    let query = ChromRange::new(1, 150, 160)?;
    assert!(index.find_overlapping_blocks(&query)?.is_empty());
    Ok(())
}

#[test]
fn test_enumerate_blocks() -> Result<(), Box<dyn Error>> {
    let items: Vec<Item> = (0..40).map(|i| item(i / 10, i * 10, i * 10 + 5, i as u64 * 3, 3)).collect();
    let mut index = in_memory(&items, 120, options(4, 1, Endianness::native()))?;
    let blocks = index.enumerate_blocks()?;
    let expected: Vec<Block> = items
        .iter()
        .map(|i| Block {
            offset: i.offset,
            size: i.size,
        })
        .collect();
    assert_eq!(blocks, expected);
    Ok(())
}

/// Writes a data file of `chrom\tstart\tend` records and indexes it, then
/// checks that filtering the bytes of the returned blocks gives exactly the
/// overlapping records.
#[test]
fn test_create_and_read_back() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let data_path = dir.path().join("records.tsv");
    let index_path = dir.path().join("records.idx");

    let mut rng = StdRng::seed_from_u64(42);
    let (mut items, _) = random_items(&mut rng, 400);
    let mut chroms = ChromIdMap::default();
    for name in ["chr1", "chr2", "chr3", "chr4"] {
        chroms.get_id(name);
    }

    let mut data = File::create(&data_path)?;
    let mut offset = 0;
    for item in items.iter_mut() {
        let line = format!(
            "{}\t{}\t{}\n",
            chroms.name(item.range.chrom).unwrap(),
            item.range.start,
            item.range.end
        );
        data.write_all(line.as_bytes())?;
        item.offset = offset;
        item.size = line.len() as u64;
        offset += item.size;
    }
    drop(data);

    let tree = create_file(
        &index_path,
        items.iter().copied(),
        offset,
        options(8, 1, Endianness::Big),
    )?;
    assert_eq!(tree.item_count(), 400);

    let mut index = CirTreeFile::open_file(&index_path)?;
    assert_eq!(index.header().total_data_size, offset);
    assert_eq!(index.header().block_size, 8);

    let mut data = File::open(&data_path)?;
    for (name, start, end) in [("chr1", 0, 2000), ("chr2", 5000, 5001), ("chr4", 9000, 12000), ("chr3", 0, 0)] {
        let blocks = index.find_overlapping_blocks_by_name(&chroms, name, start, end)?;
        let mut found = vec![];
        for bytes in read_blocks(&mut data, &blocks)? {
            for line in std::str::from_utf8(&bytes)?.lines() {
                let mut split = line.split('\t');
                let chrom = split.next().unwrap();
                let s: u32 = split.next().unwrap().parse()?;
                let e: u32 = split.next().unwrap().parse()?;
                if chrom == name && s < end && start < e {
                    found.push((s, e));
                }
            }
        }
        let chrom = chroms.get(name).unwrap();
        let expected: Vec<(u32, u32)> = items
            .iter()
            .filter(|i| i.range.chrom == chrom && i.range.start < end && start < i.range.end)
            .map(|i| (i.range.start, i.range.end))
            .collect();
        assert_eq!(found, expected);
    }
    Ok(())
}

#[test]
fn test_unsorted_leaves_no_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let index_path = dir.path().join("unsorted.idx");
    let items = vec![item(1, 0, 10, 0, 10), item(0, 0, 10, 10, 10)];
    let res = create_file(&index_path, items, 20, CirTreeWriteOptions::default());
    assert!(matches!(res, Err(CirTreeWriteError::BuildError(_))));
    assert!(!index_path.exists());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}
