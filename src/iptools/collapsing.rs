// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    section::Section,
    segment::Segment,
    strings::*,
    structs::{max_value_u128, IpFam, ValueRange},
    AddressError,
};
use tracing::{debug, trace};

/**
Merge a list of same-family, same-length sections into an equivalent,
minimal list of prefix blocks.
- removes redundant sub-blocks
- merges adjacent/overlapping ranges

Non-sequential input sections are split into their sequential blocks first.
*/
pub fn merge_to_prefix_blocks(input: &[Section]) -> Result<Vec<Section>, AddressError> {
    let Some(first) = input.first() else {
        return Ok(Vec::new());
    };
    let merged: Vec<ValueRange> = merged_ranges(input)?;

    let mut out: Vec<Section> = Vec::new();
    for r in merged {
        out.extend(range_to_prefix_blocks(first.family(), first.segment_count(), r));
    }
    trace!(input = input.len(), output = out.len(), "{LOG_MERGED}");
    Ok(out)
}

/// Like [merge_to_prefix_blocks], producing sequential blocks instead.
pub fn merge_to_sequential_blocks(input: &[Section]) -> Result<Vec<Section>, AddressError> {
    let Some(first) = input.first() else {
        return Ok(Vec::new());
    };
    let merged: Vec<ValueRange> = merged_ranges(input)?;

    let mut out: Vec<Section> = Vec::new();
    for r in merged {
        out.extend(range_to_sequential_blocks(first.family(), first.segment_count(), r));
    }
    trace!(input = input.len(), output = out.len(), "{LOG_MERGED}");
    Ok(out)
}

/// Sorted, merged value ranges of every sequential block of `input`.
fn merged_ranges(input: &[Section]) -> Result<Vec<ValueRange>, AddressError> {
    let mut ranges: Vec<ValueRange> = Vec::with_capacity(input.len());
    for s in input {
        if let Err(e) = input[0].check_compatible(s) {
            debug!(error = %e, "{LOG_MERGE_MISMATCH}");
            return Err(e);
        }
        match s.is_sequential() {
            true => ranges.push(s.value_range()),
            false => ranges.extend(s.sequential_blocks().iter().map(Section::value_range)),
        }
    }

    // 1) Sort ranges
    ranges.sort_by(|a, b| a.cmp_key().cmp(&b.cmp_key()));

    // 2) Merge overlaps/adjacent
    Ok(merge_ranges(&ranges))
}

/* ---------------------------------- */

impl Section {
    /**
    The minimal list of single prefix blocks whose union is this section,
    in ascending order. A section that already is a single prefix block is
    returned as is.
    */
    pub fn span_with_prefix_blocks(&self) -> Vec<Section> {
        if self.is_sequential() {
            if self.is_single_prefix_block() {
                return vec![self.clone()];
            }
            return self.prefix_blocks_for(self.value_range());
        }
        let out: Vec<Section> = self
            .sequential_blocks()
            .iter()
            .flat_map(|b| self.prefix_blocks_for(b.value_range()))
            .collect();
        trace!(section = %self, blocks = out.len(), "{LOG_SPANNED}");
        out
    }

    /// Prefix blocks spanning from the lowest to the highest value of both sections.
    pub fn span_with_prefix_blocks_to(&self, other: &Section) -> Result<Vec<Section>, AddressError> {
        self.check_compatible(other)?;
        Ok(self.prefix_blocks_for(self.joined_range(other)))
    }

    /**
    The minimal list of sequential blocks whose union is this section, in
    ascending order. A sequential section is returned as is; the blocks of
    other sections carry no prefix length.
    */
    pub fn span_with_sequential_blocks(&self) -> Vec<Section> {
        if self.is_sequential() {
            return vec![self.clone()];
        }
        let out: Vec<Section> = self.sequential_blocks();
        trace!(section = %self, blocks = out.len(), "{LOG_SPANNED}");
        out
    }

    /// Sequential blocks spanning from the lowest to the highest value of both sections.
    pub fn span_with_sequential_blocks_to(&self, other: &Section) -> Result<Vec<Section>, AddressError> {
        self.check_compatible(other)?;
        Ok(range_to_sequential_blocks(self.family(), self.segment_count(), self.joined_range(other)))
    }

    /// The smallest single prefix block containing the whole section.
    pub fn cover_with_prefix_block(&self) -> Section {
        if self.is_single_prefix_block() {
            return self.clone();
        }
        self.covering_block(self.value_range())
    }

    /// The smallest single prefix block containing both sections.
    pub fn cover_with_prefix_block_to(&self, other: &Section) -> Result<Section, AddressError> {
        self.check_compatible(other)?;
        Ok(self.covering_block(self.joined_range(other)))
    }

    /* ---------------------------------- */

    #[inline]
    pub(crate) fn value_range(&self) -> ValueRange {
        ValueRange {
            beg: self.lower_value(),
            end: self.upper_value(),
        }
    }

    #[inline]
    fn joined_range(&self, other: &Section) -> ValueRange {
        ValueRange {
            beg: self.lower_value().min(other.lower_value()),
            end: self.upper_value().max(other.upper_value()),
        }
    }

    #[inline]
    fn prefix_blocks_for(&self, r: ValueRange) -> Vec<Section> {
        range_to_prefix_blocks(self.family(), self.segment_count(), r)
    }

    /// The block at the longest prefix shared by both ends of `r`.
    fn covering_block(&self, r: ValueRange) -> Section {
        let bits: u8 = self.bit_count();
        let diff: u128 = r.beg ^ r.end;
        let prefix: u8 = match diff {
            0 => bits,
            d => bits - (128 - d.leading_zeros()) as u8,
        };
        prefix_block(self.family(), self.segment_count(), r.beg, prefix)
    }

    /**
    Split the section into sequential sections, one for every combination
    of values of the segments before [Section::sequential_block_index].
    */
    pub(crate) fn sequential_blocks(&self) -> Vec<Section> {
        let idx: usize = self.sequential_block_index();
        let mut heads: Vec<Vec<Segment>> = vec![Vec::with_capacity(self.segment_count())];
        for seg in &self.segments()[..idx] {
            let seg: Segment = *seg;
            heads = heads
                .into_iter()
                .flat_map(|head| {
                    (seg.lower()..=seg.upper()).map(move |v| {
                        let mut next: Vec<Segment> = head.clone();
                        next.push(seg.derive_new_range(v, v, None));
                        next
                    })
                })
                .collect();
        }
        heads
            .into_iter()
            .map(|mut segs| {
                segs.extend_from_slice(&self.segments()[idx..]);
                self.derive(segs, None)
            })
            .collect()
    }
}

/* ---------------------------------- */

/// Merge overlapping/adjacent ranges. Input must be sorted.
#[inline]
fn merge_ranges(sorted: &[ValueRange]) -> Vec<ValueRange> {
    let mut out: Vec<ValueRange> = Vec::with_capacity(sorted.len());
    for r in sorted.iter().copied() {
        if let Some(last) = out.last_mut() {
            // overlap or adjacency?
            if r.beg <= last.end.saturating_add(1) {
                if r.end > last.end {
                    last.end = r.end;
                }
                continue;
            }
        }
        out.push(r);
    }
    out
}

/// The single prefix block of `count` segments at `prefix` containing `value`.
fn prefix_block(fam: IpFam, count: usize, value: u128, prefix: u8) -> Section {
    Section::from_single_values(fam, &fam.split_value(value, count)).to_prefix_block_len(prefix)
}

/// Decompose an inclusive range of `count` segment values into the minimal set of prefix blocks.
fn range_to_prefix_blocks(fam: IpFam, count: usize, r: ValueRange) -> Vec<Section> {
    let bits: u8 = (count * fam.bits_per_segment() as usize) as u8;

    // Full address space special-case
    if r.beg == 0 && r.end == max_value_u128(bits) {
        return vec![prefix_block(fam, count, 0, 0)];
    }

    let mut start: u128 = r.beg;
    let end: u128 = r.end;
    let mut out: Vec<Section> = Vec::new();

    while start <= end {
        /*
        Largest block aligned at 'start' (power-of-two size).
        If start==0, trailing_zeros is 128; clamp alignment to bits.
        */
        let tz: u8 = start.trailing_zeros().min(bits as u32) as u8;
        let max_align_prefix: u8 = bits - tz;

        // largest block that fits in remaining range length
        let remaining: u128 = (end - start).saturating_add(1);
        let max_fit_prefix: u8 = bits.saturating_sub(floor_log2_u128(remaining));

        let prefix: u8 = max_align_prefix.max(max_fit_prefix);
        out.push(prefix_block(fam, count, start, prefix));

        // advance start by block size = 2^(bits-prefix); prefix 0 only for the full space
        let block_size: u128 = 1u128 << (bits - prefix);
        match start.checked_add(block_size) {
            Some(next) => start = next,
            None => break,
        }
    }

    out
}

/**
Decompose an inclusive range of `count` segment values into the minimal
set of sequential blocks.

Let `i` be the first segment where the two ends differ. If the lower end
is all zeros after `i` and the upper end all max, one block covers the
range. Otherwise the partial lower and upper ends are split off
recursively, and the values strictly between them at segment `i` form one
block with full-range tails.
*/
fn range_to_sequential_blocks(fam: IpFam, count: usize, r: ValueRange) -> Vec<Section> {
    let lows: Vec<u32> = fam.split_value(r.beg, count);
    let highs: Vec<u32> = fam.split_value(r.end, count);
    let mut out: Vec<Section> = Vec::new();
    split_sequential(fam, &lows, &highs, &mut out);
    trace!(blocks = out.len(), "{LOG_SPANNED}");
    out
}

fn split_sequential(fam: IpFam, lows: &[u32], highs: &[u32], out: &mut Vec<Section>) {
    let max: u32 = fam.max_segment_value();
    let Some(i) = (0..lows.len()).find(|&i| lows[i] != highs[i]) else {
        out.push(Section::from_single_values(fam, lows));
        return;
    };
    let low_tail_zero: bool = lows[i + 1..].iter().all(|&v| v == 0);
    let high_tail_max: bool = highs[i + 1..].iter().all(|&v| v == max);

    let (mut mid_lo, mut mid_hi) = (lows[i], highs[i]);
    if !low_tail_zero {
        let mut upper: Vec<u32> = lows.to_vec();
        upper[i + 1..].fill(max);
        split_sequential(fam, lows, &upper, out);
        mid_lo += 1;
    }
    if !high_tail_max {
        mid_hi -= 1;
    }
    if mid_lo <= mid_hi {
        out.push(sequential_block(fam, &lows[..i], mid_lo, mid_hi, lows.len()));
    }
    if !high_tail_max {
        let mut lower: Vec<u32> = highs.to_vec();
        lower[i + 1..].fill(0);
        split_sequential(fam, &lower, highs, out);
    }
}

/// Fixed `head` values, then `[lower, upper]`, then full-range segments up to `count`.
fn sequential_block(fam: IpFam, head: &[u32], lower: u32, upper: u32, count: usize) -> Section {
    let bps: u8 = fam.bits_per_segment();
    let max: u32 = fam.max_segment_value();
    let mut segs: Vec<Segment> = head.iter().map(|&v| Segment::from_parts(bps, v, v, None)).collect();
    segs.push(Segment::from_parts(bps, lower, upper, None));
    segs.resize(count, Segment::from_parts(bps, 0, max, None));
    Section::derive_from(fam, segs, None)
}

/// floor(log2(x)) for x>=1, returns in [0..127]
#[inline]
fn floor_log2_u128(x: u128) -> u8 {
    debug_assert!(x >= 1);
    127u8.saturating_sub(x.leading_zeros() as u8)
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TST_A_1: [(u32, u32); 4] = [(192, 192), (168, 168), (0, 0), (0, 0)];
    const TST_A_2: [(u32, u32); 4] = [(192, 192), (168, 168), (1, 1), (0, 0)];
    const RES_T_A: &str = "192.168.0-1.0-255/23";

    const TST_B_1: [(u32, u32); 4] = [(10, 10), (0, 0), (0, 0), (0, 0)];
    const TST_B_2: [(u32, u32); 4] = [(10, 10), (1, 1), (2, 2), (0, 0)];
    const RES_T_B: &str = "10.0-255.0-255.0-255/8";

    const TST_C_1: u128 = 0x2001_0db8_0000_0000_0000_0000_0000_0000;
    const TST_C_2: u128 = 0x2001_0db8_0000_0000_8000_0000_0000_0000;
    const RES_T_C: &str = "2001:db8:0:0:0-ffff:0-ffff:0-ffff:0-ffff/64";

    const TST_D_V4: [u32; 4] = [4, 5, 6, 7];
    const RES_D_V4: &str = "172.16.0.4-7/30";
    const RES_D_V6: &str = "2001:db8:0:0:0:0:0:4-7/126";

    fn v4(ranges: &[(u32, u32)], prefix: Option<u8>) -> Section {
        Section::from_ranges(IpFam::V4, ranges, prefix).unwrap()
    }

    fn strs(sections: &[Section]) -> Vec<String> {
        sections.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merges_adjacent_v4() {
        let input: [Section; 2] = [v4(&TST_A_1, Some(24)), v4(&TST_A_2, Some(24))];
        let out: Vec<Section> = merge_to_prefix_blocks(&input).unwrap();
        assert_eq!(strs(&out), vec![RES_T_A]);
    }

    #[test]
    fn test_removes_redundant() {
        let input: [Section; 2] = [v4(&TST_B_1, Some(8)), v4(&TST_B_2, Some(24))];
        let out: Vec<Section> = merge_to_prefix_blocks(&input).unwrap();
        assert_eq!(strs(&out), vec![RES_T_B]);
    }

    #[test]
    fn test_handles_ipv6_merge() {
        let input: Vec<Section> = [TST_C_1, TST_C_2]
            .iter()
            .map(|&v| Section::from_value(IpFam::V6, v, 8, Some(65)).unwrap())
            .collect();
        let out: Vec<Section> = merge_to_prefix_blocks(&input).unwrap();
        assert_eq!(strs(&out), vec![RES_T_C]);
    }

    #[test]
    fn test_merges_hosts() {
        let input: Vec<Section> = TST_D_V4
            .iter()
            .map(|&v| Section::from_single_values(IpFam::V4, &[172, 16, 0, v]))
            .collect();
        assert_eq!(strs(&merge_to_prefix_blocks(&input).unwrap()), vec![RES_D_V4]);

        let input: Vec<Section> = TST_D_V4
            .iter()
            .map(|&v| Section::from_single_values(IpFam::V6, &[0x2001, 0xdb8, 0, 0, 0, 0, 0, v]))
            .collect();
        assert_eq!(strs(&merge_to_prefix_blocks(&input).unwrap()), vec![RES_D_V6]);
    }

    #[test]
    fn test_merge_sequential() {
        let input: [Section; 3] = [
            v4(&[(1, 1), (2, 2), (4, 4), (0, 255)], None),
            v4(&[(1, 1), (2, 2), (3, 3), (4, 255)], None),
            v4(&[(1, 1), (2, 2), (5, 5), (0, 10)], None),
        ];
        let out: Vec<Section> = merge_to_sequential_blocks(&input).unwrap();
        assert_eq!(strs(&out), vec!["1.2.3.4-255", "1.2.4.0-255", "1.2.5.0-10"]);

        // non-sequential input is split into its blocks first
        let gaps: Section = v4(&[(1, 1), (2, 2), (4, 5), (0, 10)], None);
        let out: Vec<Section> = merge_to_sequential_blocks(&[gaps]).unwrap();
        assert_eq!(strs(&out), vec!["1.2.4.0-10", "1.2.5.0-10"]);
    }

    #[test]
    fn test_merge_mismatch() {
        let input: [Section; 2] = [v4(&TST_B_1, None), Section::loopback(IpFam::V6).clone()];
        assert_eq!(
            merge_to_prefix_blocks(&input),
            Err(AddressError::Mismatch(IpFam::V4, IpFam::V6))
        );
        assert!(merge_to_sequential_blocks(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_range_to_prefix_blocks() {
        let r: ValueRange = ValueRange {
            beg: 172u128 << 24 | 16u128 << 16 | 4u128,
            end: 172u128 << 24 | 16u128 << 16 | 7u128,
        };
        assert_eq!(strs(&range_to_prefix_blocks(IpFam::V4, 4, r)), vec![RES_D_V4]);
        let full: ValueRange = ValueRange { beg: 0, end: u128::MAX };
        let out: Vec<Section> = range_to_prefix_blocks(IpFam::V6, 8, full);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_full_range() && out[0].prefix_len() == Some(0));
        // ranges reaching the top of the space must terminate
        let top: ValueRange = ValueRange { beg: u128::MAX - 2, end: u128::MAX };
        assert_eq!(range_to_prefix_blocks(IpFam::V6, 8, top).len(), 2);
    }

    #[test]
    fn test_span_prefix_blocks() {
        let s: Section = v4(&[(1, 1), (2, 2), (3, 3), (4, 6)], None);
        let out: Vec<Section> = s.span_with_prefix_blocks();
        assert_eq!(strs(&out), vec!["1.2.3.4-5/31", "1.2.3.6/32"]);

        let block: Section = v4(&[(1, 1), (2, 2), (3, 3), (0, 0)], Some(24));
        assert_eq!(block.span_with_prefix_blocks(), vec![block.clone()]);

        let gaps: Section = v4(&[(1, 2), (3, 3), (0, 255), (0, 255)], None);
        assert_eq!(strs(&gaps.span_with_prefix_blocks()), vec!["1.3.0-255.0-255/16", "2.3.0-255.0-255/16"]);
    }

    #[test]
    fn test_span_properties() {
        let samples: [Section; 3] = [
            v4(&[(10, 10), (0, 0), (3, 200), (0, 255)], None),
            v4(&[(10, 10), (0, 0), (0, 0), (1, 254)], None),
            Section::from_ranges(IpFam::V6, &[(0x2001, 0x2001), (1, 0x7777), (0, 0xffff)], None).unwrap(),
        ];
        for s in &samples {
            let out: Vec<Section> = s.span_with_prefix_blocks();
            assert_eq!(out[0].lower_value(), s.lower_value(), "{s}");
            assert_eq!(out[out.len() - 1].upper_value(), s.upper_value(), "{s}");
            assert!(out.iter().all(|b| b.is_single_prefix_block()), "{s}");
            for pair in out.windows(2) {
                assert_eq!(pair[0].upper_value() + 1, pair[1].lower_value(), "{s}");
            }
            // already minimal: merging changes nothing
            assert_eq!(merge_to_prefix_blocks(&out).unwrap(), out, "{s}");
        }
    }

    #[test]
    fn test_span_sequential_blocks() {
        let s: Section = v4(&[(1, 2), (3, 3), (4, 5), (0, 255)], Some(16));
        let out: Vec<Section> = s.span_with_sequential_blocks();
        assert_eq!(strs(&out), vec!["1.3.4-5.0-255", "2.3.4-5.0-255"]);
        assert!(out.iter().all(|b| b.is_sequential()));
        let seq: Section = v4(&[(1, 1), (3, 3), (4, 5), (0, 255)], None);
        assert_eq!(seq.span_with_sequential_blocks(), vec![seq.clone()]);
    }

    #[test]
    fn test_span_to() {
        let a: Section = v4(&[(10, 10), (0, 0), (0, 0), (255, 255)], None);
        let b: Section = v4(&[(10, 10), (0, 0), (1, 1), (0, 0)], None);
        assert_eq!(strs(&b.span_with_prefix_blocks_to(&a).unwrap()), vec!["10.0.0.255/32", "10.0.1.0/32"]);
        assert_eq!(strs(&a.span_with_sequential_blocks_to(&b).unwrap()), vec!["10.0.0.255", "10.0.1.0"]);
        let short: Section = Section::from_ranges(IpFam::V4, &[(1, 1)], None).unwrap();
        assert_eq!(a.span_with_prefix_blocks_to(&short), Err(AddressError::SizeMismatch(4, 1)));
    }

    #[test]
    fn test_cover() {
        let s: Section = v4(&[(1, 1), (2, 2), (3, 3), (4, 6)], None);
        assert_eq!(s.cover_with_prefix_block().to_string(), "1.2.3.4-7/30");
        let other: Section = v4(&[(1, 1), (2, 2), (4, 4), (0, 0)], None);
        assert_eq!(s.cover_with_prefix_block_to(&other).unwrap().to_string(), "1.2.0-7.0-255/21");
        let single: Section = v4(&[(1, 1), (2, 2), (3, 3), (4, 4)], None);
        assert_eq!(single.cover_with_prefix_block().to_string(), "1.2.3.4/32");
    }
}
