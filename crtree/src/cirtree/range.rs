/*!
Ranges on chromosomes identified by integer ids.

Positions are compared as a two-part key: the chromosome id is the most
significant part and the base position the least significant. This lets a
single bounding range span several chromosomes.
*/
use std::cmp::Ordering;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid range: start ({}) is greater than end ({}).", .start, .end)]
pub struct InvalidRange {
    pub start: u32,
    pub end: u32,
}

/// A half-open interval `[start, end)` on a single chromosome.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChromRange {
    pub chrom: u32,
    pub start: u32,
    pub end: u32,
}

impl ChromRange {
    pub fn new(chrom: u32, start: u32, end: u32) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(ChromRange { chrom, start, end })
    }

    /// Whether two ranges on the same chromosome share at least one base.
    pub fn overlaps(&self, other: &ChromRange) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    pub fn bounds(&self) -> BoundingRange {
        BoundingRange {
            start_chrom_ix: self.chrom,
            start_base: self.start,
            end_chrom_ix: self.chrom,
            end_base: self.end,
        }
    }
}

/// The area spanned by a node of the tree. May cross chromosomes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundingRange {
    pub start_chrom_ix: u32,
    pub start_base: u32,
    pub end_chrom_ix: u32,
    pub end_base: u32,
}

impl BoundingRange {
    /// The smallest range covering both `self` and `other`.
    pub fn union(self, other: BoundingRange) -> BoundingRange {
        let (start_chrom_ix, start_base) = match compare_position(
            other.start_chrom_ix,
            other.start_base,
            self.start_chrom_ix,
            self.start_base,
        ) {
            Ordering::Less => (other.start_chrom_ix, other.start_base),
            _ => (self.start_chrom_ix, self.start_base),
        };
        let (end_chrom_ix, end_base) = match compare_position(
            other.end_chrom_ix,
            other.end_base,
            self.end_chrom_ix,
            self.end_base,
        ) {
            Ordering::Greater => (other.end_chrom_ix, other.end_base),
            _ => (self.end_chrom_ix, self.end_base),
        };
        BoundingRange {
            start_chrom_ix,
            start_base,
            end_chrom_ix,
            end_base,
        }
    }

    /// Whether any part of `query` could fall within this range.
    pub fn overlaps(&self, query: &ChromRange) -> bool {
        overlaps(
            query.chrom,
            query.start,
            query.end,
            self.start_chrom_ix,
            self.start_base,
            self.end_chrom_ix,
            self.end_base,
        )
    }
}

impl From<ChromRange> for BoundingRange {
    fn from(range: ChromRange) -> Self {
        range.bounds()
    }
}

#[inline]
pub fn compare_position(chrom1: u32, chrom1_base: u32, chrom2: u32, chrom2_base: u32) -> Ordering {
    chrom1.cmp(&chrom2).then(chrom1_base.cmp(&chrom2_base))
}

#[inline]
pub(crate) fn overlaps(
    chromq: u32,
    chromq_start: u32,
    chromq_end: u32,
    chromb1: u32,
    chromb1_start: u32,
    chromb2: u32,
    chromb2_end: u32,
) -> bool {
    compare_position(chromq, chromq_start, chromb2, chromb2_end) == Ordering::Less
        && compare_position(chromb1, chromb1_start, chromq, chromq_end) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(sc: u32, sb: u32, ec: u32, eb: u32) -> BoundingRange {
        BoundingRange {
            start_chrom_ix: sc,
            start_base: sb,
            end_chrom_ix: ec,
            end_base: eb,
        }
    }

    #[test]
    fn test_compare_position() {
        assert_eq!(compare_position(0, 500, 1, 0), Ordering::Less);
        assert_eq!(compare_position(1, 0, 0, 500), Ordering::Greater);
        assert_eq!(compare_position(2, 10, 2, 20), Ordering::Less);
        assert_eq!(compare_position(2, 10, 2, 10), Ordering::Equal);
    }

    #[test]
    fn test_half_open_overlap() {
        let a = ChromRange::new(0, 100, 200).unwrap();
        let touching = ChromRange::new(0, 200, 300).unwrap();
        let inside = ChromRange::new(0, 199, 300).unwrap();
        let other_chrom = ChromRange::new(1, 100, 200).unwrap();
        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
        assert!(a.overlaps(&inside));
        assert!(!a.overlaps(&other_chrom));

        assert!(!a.bounds().overlaps(&touching));
        assert!(a.bounds().overlaps(&inside));
        assert!(!a.bounds().overlaps(&other_chrom));
    }

    #[test]
    fn test_multi_chrom_bounds() {
        // chr0:500 to chr2:50 covers all of chr1
        let b = bounds(0, 500, 2, 50);
        assert!(b.overlaps(&ChromRange::new(1, 0, 1).unwrap()));
        assert!(b.overlaps(&ChromRange::new(0, 600, 700).unwrap()));
        assert!(!b.overlaps(&ChromRange::new(0, 0, 500).unwrap()));
        assert!(b.overlaps(&ChromRange::new(2, 0, 10).unwrap()));
        assert!(!b.overlaps(&ChromRange::new(2, 50, 60).unwrap()));
        assert!(!b.overlaps(&ChromRange::new(3, 0, 10).unwrap()));
    }

    #[test]
    fn test_union() {
        let a = ChromRange::new(1, 100, 200).unwrap().bounds();
        let b = ChromRange::new(1, 50, 150).unwrap().bounds();
        assert_eq!(a.union(b), bounds(1, 50, 1, 200));

        let c = ChromRange::new(0, 900, 1000).unwrap().bounds();
        let d = ChromRange::new(3, 5, 10).unwrap().bounds();
        assert_eq!(a.union(c).union(d), bounds(0, 900, 3, 10));
        assert_eq!(d.union(c), bounds(0, 900, 3, 10));
    }

    #[test]
    fn test_invalid_range() {
        assert_eq!(
            ChromRange::new(0, 10, 5),
            Err(InvalidRange { start: 10, end: 5 })
        );
        assert!(ChromRange::new(0, 10, 10).is_ok());
    }
}
