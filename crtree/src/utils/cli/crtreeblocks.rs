use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use anyhow::Context;
use clap::Parser;

use crate::utils::blocks::coalesce_blocks;
use crate::utils::idmap::ChromIdMap;
use crate::CirTreeFile;

use super::crtreebuild::chroms_path;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "blocks",
    about = "Prints the blocks of the data file that may hold items overlapping a region.",
    long_about = None,
)]
pub struct CirTreeBlocksArgs {
    /// The index to search.
    pub index: String,

    /// The chromosome to search on.
    pub chrom: String,

    /// The start of the region (0-based, inclusive).
    pub start: u32,

    /// The end of the region (exclusive).
    pub end: u32,

    /// Chromosome names for the index. Defaults to `<index>.chroms`.
    #[arg(long)]
    pub chroms: Option<String>,

    /// If set, contiguous blocks are merged into one.
    #[arg(long)]
    #[arg(default_value_t = false)]
    pub merge: bool,
}

pub fn crtreeblocks(args: CirTreeBlocksArgs) -> anyhow::Result<()> {
    let chroms = args.chroms.clone().unwrap_or_else(|| chroms_path(&args.index));
    let chromsfile =
        File::open(&chroms).with_context(|| format!("Failed to open chroms file `{}`", &chroms))?;
    let chrom_ids = ChromIdMap::read_from(BufReader::new(chromsfile))
        .with_context(|| format!("Failed to read chroms file `{}`", &chroms))?;

    let mut index = CirTreeFile::open_file(&args.index)
        .with_context(|| format!("Failed to open index `{}`", &args.index))?;
    let blocks = index
        .find_overlapping_blocks_by_name(&chrom_ids, &args.chrom, args.start, args.end)
        .with_context(|| {
            format!(
                "Failed to search {}:{}-{} in `{}`",
                &args.chrom, args.start, args.end, &args.index
            )
        })?;
    tracing::debug!("Found {} blocks", blocks.len());
    let blocks = if args.merge {
        coalesce_blocks(&blocks)
    } else {
        blocks
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for block in blocks {
        writeln!(out, "{}\t{}", block.offset, block.size)?;
    }
    out.flush()?;

    Ok(())
}
