use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tempfile::NamedTempFile;

use crate::utils::idmap::ChromIdMap;
use crate::utils::itemreader::read_items;
use crate::{create_file, CirTreeWriteOptions, Item};

use super::CirTreeWriteArgs;

#[derive(Clone, Debug, PartialEq, Parser)]
#[command(
    name = "build",
    about = "Builds an index over a data file from a list of items.",
    long_about = None,
)]
pub struct CirTreeBuildArgs {
    /// The items to index (or - for stdin). Each line should have a chromosome, start, end,
    /// offset and size, separated by tabs. Items must be sorted by chromosome and start.
    pub items: String,

    /// The output index path. The chromosome names are written next to it, to `<output>.chroms`.
    pub output: String,

    /// Size of the data file being indexed. Defaults to the end of the last item.
    #[arg(long)]
    pub data_size: Option<u64>,

    #[command(flatten)]
    pub write_args: CirTreeWriteArgs,
}

/// The sidecar file holding the chromosome names for an index.
pub fn chroms_path(index: &str) -> String {
    format!("{}.chroms", index)
}

pub fn crtreebuild(args: CirTreeBuildArgs) -> anyhow::Result<()> {
    let mut chrom_ids = ChromIdMap::default();
    let items = if args.items == "-" || args.items == "stdin" {
        read_items(io::stdin().lock(), &mut chrom_ids)
            .with_context(|| "Failed to read items from stdin".to_string())?
    } else {
        let infile = File::open(&args.items)
            .with_context(|| format!("Failed to open items file `{}`", &args.items))?;
        read_items(BufReader::new(infile), &mut chrom_ids)
            .with_context(|| format!("Failed to read items file `{}`", &args.items))?
    };
    tracing::info!(
        "Read {} items on {} chromosomes",
        items.len(),
        chrom_ids.len()
    );

    let data_size = args
        .data_size
        .unwrap_or_else(|| items.iter().map(Item::end_offset).max().unwrap_or(0));

    write_index_and_chroms(
        &args.output,
        items,
        data_size,
        args.write_args.options(),
        &chrom_ids,
    )
}

/// Writes the index and its `.chroms` sidecar. The sidecar is fully written to
/// a temporary file before the index is built, and only moved into place once
/// the index is, so neither file is left behind when either write fails.
pub(crate) fn write_index_and_chroms(
    output: &str,
    items: Vec<Item>,
    data_size: u64,
    options: CirTreeWriteOptions,
    chrom_ids: &ChromIdMap,
) -> anyhow::Result<()> {
    let chroms = chroms_path(output);
    let dir = match Path::new(&chroms).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let chromsfile = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create `{}`", &chroms))?;
    let mut chromsfile = BufWriter::new(chromsfile);
    chrom_ids
        .write_to(&mut chromsfile)
        .and_then(|_| chromsfile.flush())
        .with_context(|| format!("Failed to write `{}`", &chroms))?;
    let chromsfile = chromsfile
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to write `{}`", &chroms))?;

    create_file(output, items, data_size, options)
        .with_context(|| format!("Failed to write index `{}`", output))?;

    if let Err(e) = chromsfile.persist(&chroms) {
        let _ = std::fs::remove_file(output);
        return Err(e.error).with_context(|| format!("Failed to write `{}`", &chroms));
    }

    Ok(())
}
