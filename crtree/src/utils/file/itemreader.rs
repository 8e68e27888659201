/*!
Reads items to index from a tab-separated file.

Each line is `chrom\tstart\tend\toffset\tsize`; any further columns are
ignored. Chromosome names are mapped to ids in order of first appearance.
*/
use std::io::{self, BufRead};

use crate::utils::idmap::ChromIdMap;
use crate::{ChromRange, Item};

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn parse_field<T: std::str::FromStr>(
    split: &mut std::str::SplitN<'_, char>,
    name: &str,
    line: &str,
) -> io::Result<T> {
    let s = split
        .next()
        .ok_or_else(|| invalid(format!("Missing {}: {:}", name, line)))?;
    s.parse::<T>()
        .map_err(|_| invalid(format!("Invalid {}: {:}", name, s)))
}

/// Parses a single line. Returns `None` for blank lines and `#` comments.
pub fn parse_item_line(line: &str, chrom_ids: &mut ChromIdMap) -> io::Result<Option<Item>> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut split = line.splitn(6, '\t');
    let chrom = split
        .next()
        .ok_or_else(|| invalid(format!("Missing chrom: {:}", line)))?;
    let start: u32 = parse_field(&mut split, "start", line)?;
    let end: u32 = parse_field(&mut split, "end", line)?;
    let offset: u64 = parse_field(&mut split, "offset", line)?;
    let size: u64 = parse_field(&mut split, "size", line)?;

    let chrom = chrom_ids.get_id(chrom);
    let range = ChromRange::new(chrom, start, end).map_err(|e| invalid(e.to_string()))?;
    Ok(Some(Item::new(range, offset, size)))
}

/// Reads every item from `read`, assigning chromosome ids into `chrom_ids`.
/// Line numbers (1-based) are included in parse errors.
pub fn read_items<R: BufRead>(read: R, chrom_ids: &mut ChromIdMap) -> io::Result<Vec<Item>> {
    let mut items = vec![];
    for (i, line) in read.lines().enumerate() {
        let line = line?;
        let item = parse_item_line(&line, chrom_ids)
            .map_err(|e| invalid(format!("Line {}: {}", i + 1, e)))?;
        items.extend(item);
    }
    Ok(items)
}
