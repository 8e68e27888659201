use anyhow::Context;
use clap::Parser;

use crate::CirTreeFile;

use super::num_with_commas;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "info",
    about = "Gets information about an index.",
    long_about = None,
)]
pub struct CirTreeInfoArgs {
    /// The index to get info for.
    pub index: String,

    /// If set, will print out the number of leaf blocks in the index.
    #[arg(long)]
    #[arg(default_value_t = false)]
    pub blocks: bool,
}

pub fn crtreeinfo(args: CirTreeInfoArgs) -> anyhow::Result<()> {
    let mut index = CirTreeFile::open_file(&args.index)
        .with_context(|| format!("Failed to open index `{}`", &args.index))?;

    let header = *index.header();
    println!("isSwapped: {}", header.is_swapped().then(|| "1").unwrap_or("0"));
    println!("blockSize: {}", header.block_size);
    println!("itemsPerSlot: {}", header.items_per_slot);
    println!("itemCount: {}", num_with_commas(header.item_count));
    println!(
        "bounds: {}:{}-{}:{}",
        header.bounds.start_chrom_ix,
        header.bounds.start_base,
        header.bounds.end_chrom_ix,
        header.bounds.end_base
    );
    println!("dataSize: {}", num_with_commas(header.total_data_size));
    if args.blocks {
        let blocks = index
            .enumerate_blocks()
            .with_context(|| format!("Failed to read index `{}`", &args.index))?;
        println!("blockCount: {}", blocks.len());
    }

    Ok(())
}
