// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    masking::{mask_range, MaskResult},
    strings::*,
    structs::{segment_host_mask, segment_network_mask, IpFam},
    AddressError, IPV4_SEGMENT_BITS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/**
One segment of an address section: the inclusive value range
`[lower, upper]` within a fixed bit width (8 bits for IPv4 octets, 16 bits
for IPv6 groups).

A segment may carry a segment-local prefix length `0..=bits`, meaning only
the first N bits of its value are network bits. Inside a [Section] the
segment prefixes always agree with the section prefix length.

[Section]: super::Section
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    lower: u32,
    upper: u32,
    bits: u8,
    prefix: Option<u8>,
}

#[derive(Deserialize)]
struct RawSegment {
    lower: u32,
    upper: u32,
    bits: u8,
    prefix: Option<u8>,
}

impl TryFrom<RawSegment> for Segment {
    type Error = AddressError;

    fn try_from(raw: RawSegment) -> Result<Self, Self::Error> {
        let fam: IpFam = match raw.bits {
            IPV4_SEGMENT_BITS => IpFam::V4,
            _ => IpFam::V6,
        };
        if raw.bits != fam.bits_per_segment() {
            return Err(AddressError::InvalidSegment {
                lower: raw.lower,
                upper: raw.upper,
                max: fam.max_segment_value(),
            });
        }
        Ok(Segment::new(fam, raw.lower, raw.upper)?.with_prefix_len(raw.prefix))
    }
}

impl Segment {
    /// Create a new [Segment], validating `lower <= upper <= max`.
    pub fn new(fam: IpFam, lower: u32, upper: u32) -> Result<Self, AddressError> {
        let max: u32 = fam.max_segment_value();
        if lower > upper || upper > max {
            return Err(AddressError::InvalidSegment { lower, upper, max });
        }
        Ok(Self {
            lower,
            upper,
            bits: fam.bits_per_segment(),
            prefix: None,
        })
    }

    pub fn single(fam: IpFam, value: u32) -> Result<Self, AddressError> {
        Self::new(fam, value, value)
    }

    /// Unchecked constructor for values derived from already valid segments.
    #[inline]
    pub(crate) fn from_parts(bits: u8, lower: u32, upper: u32, prefix: Option<u8>) -> Self {
        debug_assert!(lower <= upper, "{PANIC_NAUGHTY}");
        debug_assert!(upper <= (1u32 << bits) - 1);
        Self {
            lower,
            upper,
            bits,
            prefix: prefix.map(|p| p.min(bits)),
        }
    }

    /// Same width, new range and prefix. Only checks the range in debug builds.
    #[inline]
    pub fn derive_new_range(&self, lower: u32, upper: u32, prefix: Option<u8>) -> Self {
        Self::from_parts(self.bits, lower, upper, prefix)
    }

    /// Attach a segment prefix length, clamped to the bit width.
    #[inline]
    pub fn with_prefix_len(self, prefix: Option<u8>) -> Self {
        Self {
            prefix: prefix.map(|p| p.min(self.bits)),
            ..self
        }
    }

    #[inline]
    pub fn without_prefix_len(self) -> Self {
        self.with_prefix_len(None)
    }

    /* ---------------------------------- */

    #[inline]
    pub fn lower(&self) -> u32 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> u32 {
        self.upper
    }

    #[inline]
    pub fn bit_count(&self) -> u8 {
        self.bits
    }

    #[inline]
    pub fn max_value(&self) -> u32 {
        (1u32 << self.bits) - 1
    }

    #[inline]
    pub fn prefix_len(&self) -> Option<u8> {
        self.prefix
    }

    /// Number of values in the range.
    #[inline]
    pub fn value_count(&self) -> u32 {
        self.upper - self.lower + 1
    }

    #[inline]
    pub fn is_multiple(&self) -> bool {
        self.lower != self.upper
    }

    #[inline]
    pub fn is_full_range(&self) -> bool {
        self.lower == 0 && self.upper == self.max_value()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.upper == 0
    }

    #[inline]
    pub fn includes_zero(&self) -> bool {
        self.lower == 0
    }

    #[inline]
    pub fn is_max(&self) -> bool {
        self.lower == self.max_value()
    }

    #[inline]
    pub fn includes_max(&self) -> bool {
        self.upper == self.max_value()
    }

    /* ---------------------------------- */

    /// Whether the range of `other` lies within this one. Prefixes are ignored.
    #[inline]
    pub fn contains(&self, other: &Segment) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    #[inline]
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }

    /// Range equality. Unlike `==`, the prefix length is ignored.
    #[inline]
    pub fn equals(&self, other: &Segment) -> bool {
        self.lower == other.lower && self.upper == other.upper
    }

    /// [Segment::contains] over the first `prefix` bits only.
    pub fn prefix_contains(&self, other: &Segment, prefix: u8) -> bool {
        let shift: u8 = self.bits - prefix.min(self.bits);
        self.lower >> shift <= other.lower >> shift && other.upper >> shift <= self.upper >> shift
    }

    /// [Segment::equals] over the first `prefix` bits only.
    pub fn prefix_equal(&self, other: &Segment, prefix: u8) -> bool {
        let shift: u8 = self.bits - prefix.min(self.bits);
        self.lower >> shift == other.lower >> shift && self.upper >> shift == other.upper >> shift
    }

    /**
    The smallest prefix length `n` for which this segment's range is a union
    of prefix blocks of length `n`: the low `bits - n` bits are all zero in
    `lower` and all one in `upper`.
    */
    pub fn min_prefix_len_for_block(&self) -> u8 {
        if self.lower == self.upper {
            return self.bits;
        }
        let lower_zeros: u32 = self.lower.trailing_zeros();
        let upper_ones: u32 = self.upper.trailing_ones();
        self.bits - lower_zeros.min(upper_ones).min(self.bits as u32) as u8
    }

    /// The prefix length for which this segment is exactly one prefix block, if any.
    pub fn prefix_len_for_single_block(&self) -> Option<u8> {
        let pfx: u8 = self.min_prefix_len_for_block();
        if pfx == self.bits {
            return (self.lower == self.upper).then_some(pfx);
        }
        let shift: u8 = self.bits - pfx;
        (self.lower >> shift == self.upper >> shift).then_some(pfx)
    }

    /// Whether the range is a union of blocks at the segment-local prefix `prefix`.
    pub fn contains_prefix_block(&self, prefix: u8) -> bool {
        let host: u32 = segment_host_mask(self.bits, Some(prefix.min(self.bits)));
        self.lower & host == 0 && self.upper & host == host
    }

    /// Whether the range is exactly one block at the segment-local prefix `prefix`.
    pub fn contains_single_prefix_block(&self, prefix: u8) -> bool {
        let prefix: u8 = prefix.min(self.bits);
        let shift: u8 = self.bits - prefix;
        self.contains_prefix_block(prefix) && self.lower >> shift == self.upper >> shift
    }

    pub fn is_prefix_block(&self) -> bool {
        self.prefix.is_some_and(|p| self.contains_prefix_block(p))
    }

    pub fn is_single_prefix_block(&self) -> bool {
        self.prefix.is_some_and(|p| self.contains_single_prefix_block(p))
    }

    /// The block(s) at the segment-local prefix `prefix` spanning this range.
    pub fn to_prefixed_network(&self, prefix: u8) -> Self {
        let prefix: u8 = prefix.min(self.bits);
        let net: u32 = segment_network_mask(self.bits, Some(prefix));
        let host: u32 = segment_host_mask(self.bits, Some(prefix));
        self.derive_new_range(self.lower & net, self.upper | host, Some(prefix))
    }

    /**
    Whether masking this segment with `mask` yields exactly the range
    `[lower, upper]`. A multi-valued segment only matches when its masked
    values are contiguous.
    */
    pub fn matches_with_mask(&self, lower: u32, upper: u32, mask: u32) -> bool {
        let r: MaskResult = mask_range(
            self.lower as u128,
            self.upper as u128,
            mask as u128,
            self.max_value() as u128,
        );
        r.sequential && r.lower == lower as u128 && r.upper == upper as u128
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.bits == IPV4_SEGMENT_BITS, self.is_multiple()) {
            (true, false) => write!(f, "{}", self.lower),
            (true, true) => write!(f, "{}{DASH}{}", self.lower, self.upper),
            (false, false) => write!(f, "{:x}", self.lower),
            (false, true) => write!(f, "{:x}{DASH}{:x}", self.lower, self.upper),
        }
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(lower: u32, upper: u32) -> Segment {
        Segment::new(IpFam::V4, lower, upper).unwrap()
    }

    fn v6(lower: u32, upper: u32) -> Segment {
        Segment::new(IpFam::V6, lower, upper).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(Segment::new(IpFam::V4, 5, 4).is_err());
        assert_eq!(
            Segment::new(IpFam::V4, 0, 256),
            Err(AddressError::InvalidSegment { lower: 0, upper: 256, max: 255 })
        );
        assert!(Segment::new(IpFam::V6, 0, 0xffff).unwrap().is_full_range());
    }

    #[test]
    fn test_flags() {
        let seg: Segment = v4(0, 255);
        assert!(seg.is_multiple() && seg.is_full_range());
        assert!(seg.includes_zero() && seg.includes_max());
        assert!(!seg.is_zero() && !seg.is_max());
        assert!(v4(0, 0).is_zero());
        assert!(v6(0xffff, 0xffff).is_max());
        assert_eq!(v4(10, 20).value_count(), 11);
    }

    #[test]
    fn test_interval_relations() {
        let a: Segment = v4(1, 10);
        let b: Segment = v4(4, 6);
        assert!(a.contains(&b) && !b.contains(&a));
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!v4(1, 3).overlaps(&v4(4, 6)));
        assert!(v4(0x10, 0x10).prefix_contains(&v4(0x12, 0x1f), 4));
        assert!(!v4(0x10, 0x10).prefix_contains(&v4(0x12, 0x20), 4));
        assert!(v4(0x31, 0x3e).prefix_equal(&v4(0x30, 0x3f), 4));
        assert!(v4(3, 9).prefix_contains(&v4(0, 255), 0));
        assert!(a.equals(&a.with_prefix_len(Some(4))));
        assert_ne!(a, a.with_prefix_len(Some(4)));
    }

    #[test]
    fn test_min_prefix_for_block() {
        assert_eq!(v4(7, 7).min_prefix_len_for_block(), 8);
        assert_eq!(v4(0, 255).min_prefix_len_for_block(), 0);
        assert_eq!(v4(16, 31).min_prefix_len_for_block(), 4);
        // two /7 blocks
        assert_eq!(v4(0, 3).min_prefix_len_for_block(), 6);
        assert_eq!(v4(4, 11).min_prefix_len_for_block(), 6);
        assert_eq!(v4(3, 4).min_prefix_len_for_block(), 8);
    }

    #[test]
    fn test_prefix_for_single_block() {
        assert_eq!(v4(16, 31).prefix_len_for_single_block(), Some(4));
        assert_eq!(v4(4, 11).prefix_len_for_single_block(), None);
        assert_eq!(v4(9, 9).prefix_len_for_single_block(), Some(8));
        assert_eq!(v4(3, 4).prefix_len_for_single_block(), None);
        assert_eq!(v6(0, 0xffff).prefix_len_for_single_block(), Some(0));
    }

    #[test]
    fn test_prefix_blocks() {
        let seg: Segment = v4(0x10, 0x3f);
        assert!(seg.contains_prefix_block(4));
        assert!(!seg.contains_single_prefix_block(4));
        assert!(v4(0x20, 0x3f).contains_single_prefix_block(3));
        assert!(!seg.is_prefix_block());
        assert!(seg.with_prefix_len(Some(4)).is_prefix_block());
        assert!(v4(0, 255).with_prefix_len(Some(0)).is_single_prefix_block());
    }

    #[test]
    fn test_to_prefixed_network() {
        let seg: Segment = v4(0x13, 0x25).to_prefixed_network(4);
        assert_eq!((seg.lower(), seg.upper(), seg.prefix_len()), (0x10, 0x2f, Some(4)));
        let seg: Segment = v6(0x1234, 0x1234).to_prefixed_network(0);
        assert!(seg.is_full_range());
    }

    #[test]
    fn test_matches_with_mask() {
        assert!(v4(0x12, 0x12).matches_with_mask(0x10, 0x10, 0xf0));
        assert!(v4(0x10, 0x1f).matches_with_mask(0x10, 0x10, 0xf0));
        assert!(v4(0, 255).matches_with_mask(0, 15, 0x0f));
        assert!(!v4(10, 20).matches_with_mask(0, 16, 0xf0));
    }

    #[test]
    fn test_display() {
        assert_eq!(v4(1, 1).to_string(), "1");
        assert_eq!(v4(1, 30).to_string(), "1-30");
        assert_eq!(v6(0xdb8, 0xdb8).to_string(), "db8");
        assert_eq!(v6(0, 0xffff).to_string(), "0-ffff");
    }

    #[test]
    fn test_serde_validates() {
        let seg: Segment = v6(1, 0xff).with_prefix_len(Some(12));
        let json: String = serde_json::to_string(&seg).unwrap();
        let back: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
        let bad: &str = r#"{"lower":9,"upper":3,"bits":8,"prefix":null}"#;
        assert!(serde_json::from_str::<Segment>(bad).is_err());
    }
}
