use byteordered::Endianness;
use clap::Args;

use crate::{CirTreeWriteOptions, DEFAULT_BLOCK_SIZE, DEFAULT_ITEMS_PER_SLOT};

pub mod crtreeblocks;
pub mod crtreebuild;
pub mod crtreeinfo;

#[derive(Clone, Debug, PartialEq, Args)]
pub struct CirTreeWriteArgs {
    /// Number of items to bundle in r-tree.
    #[arg(long)]
    #[arg(default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,

    /// Number of data points bundled at lowest level.
    #[arg(long)]
    #[arg(default_value_t = DEFAULT_ITEMS_PER_SLOT)]
    pub items_per_slot: u32,

    /// Write the index big-endian, rather than in the byte order of this machine.
    #[arg(long, conflicts_with = "little_endian")]
    #[arg(default_value_t = false)]
    pub big_endian: bool,

    /// Write the index little-endian, rather than in the byte order of this machine.
    #[arg(long)]
    #[arg(default_value_t = false)]
    pub little_endian: bool,
}

impl CirTreeWriteArgs {
    pub fn options(&self) -> CirTreeWriteOptions {
        let endianness = if self.big_endian {
            Endianness::Big
        } else if self.little_endian {
            Endianness::Little
        } else {
            Endianness::native()
        };
        CirTreeWriteOptions {
            block_size: self.block_size,
            items_per_slot: self.items_per_slot,
            endianness,
        }
    }
}

pub(crate) fn num_with_commas(num: u64) -> String {
    let digits = num.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(c);
    }
    formatted
}

#[test]
fn test_num_with_commas() {
    assert_eq!("0", num_with_commas(0));
    assert_eq!("987", num_with_commas(987));
    assert_eq!("1,000", num_with_commas(1000));
    assert_eq!("12,987", num_with_commas(12987));
    assert_eq!("123,987", num_with_commas(123987));
    assert_eq!("4,023,987", num_with_commas(4023987));
    assert_eq!("9,456,000,987", num_with_commas(9456000987));
}
