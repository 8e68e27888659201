/*!
crtree provides a chromosome-range r-tree index ("cirTree") over flat data files.

The index maps genomic ranges (a chromosome id plus a half-open base range) to
byte spans of some other data file. It is built once from items sorted by
chromosome and start, written as a compact binary file, and then queried for
the blocks of the data file that may hold items overlapping a range.

Lookups are two-phase: the index only narrows a query down to candidate
[`Block`]s. The caller reads those bytes back (see
[`read_blocks`][crate::utils::blocks::read_blocks]) and filters on the real
record coordinates.

## Reading

The entrypoint to reading an index is [`CirTreeFile::open_file`], which takes
a path, or [`CirTreeFile::attach`], which takes any type that implements both
[`Read`][std::io::Read] and [`Seek`][std::io::Seek] positioned at the start of
an index (the index may be embedded inside a larger file). Indexes written on
a machine of either byte order can be read; the header's
[`is_swapped`][CirTreeHeader::is_swapped] reports when the byte order differs
from the current machine.

Once opened, [`CirTreeFile::find_overlapping_blocks`] returns the candidate
blocks for a [`ChromRange`], in file order.

## Writing

Items are collected into [`Item`]s (sorted with [`sort_items`] if needed) and
either written straight to a file with [`create_file`], or built in memory with
[`build_rtree`] and then written at any position of a writer with
[`write_rtreeindex`]. Layout is controlled by [`CirTreeWriteOptions`].

Chromosome names are not part of the index. [`ChromIdMap`][crate::utils::idmap::ChromIdMap]
assigns ids and can be stored alongside an index.
*/

mod cirtree;
pub mod utils;

pub use cirtree::*;
