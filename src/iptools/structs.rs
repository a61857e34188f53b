// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    IPV4_BITS, IPV4_SEGMENT_BITS, IPV4_SEGMENT_COUNT, IPV6_BITS, IPV6_SEGMENT_BITS,
    IPV6_SEGMENT_COUNT,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/**
IP address family.

The family is the only thing that differs between IPv4 and IPv6 sections:
segment width, segment count and how wide integer values split into
segments. Everything else in the section algebra is shared.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum IpFam {
    V4,
    V6,
}

impl IpFam {
    #[inline]
    pub const fn bits_per_segment(self) -> u8 {
        match self {
            IpFam::V4 => IPV4_SEGMENT_BITS,
            IpFam::V6 => IPV6_SEGMENT_BITS,
        }
    }

    #[inline]
    pub const fn bytes_per_segment(self) -> usize {
        self.bits_per_segment() as usize / 8
    }

    /// Number of segments in a full address.
    #[inline]
    pub const fn segment_count(self) -> usize {
        match self {
            IpFam::V4 => IPV4_SEGMENT_COUNT,
            IpFam::V6 => IPV6_SEGMENT_COUNT,
        }
    }

    /// Number of bits in a full address.
    #[inline]
    pub const fn bit_count(self) -> u8 {
        match self {
            IpFam::V4 => IPV4_BITS,
            IpFam::V6 => IPV6_BITS,
        }
    }

    #[inline]
    pub const fn max_segment_value(self) -> u32 {
        (1u32 << self.bits_per_segment()) - 1
    }

    /**
    Split the low `count * bits_per_segment` bits of `value` into segment
    values, most significant segment first. Higher bits are ignored.
    */
    pub fn split_value(self, value: u128, count: usize) -> Vec<u32> {
        let bps: usize = self.bits_per_segment() as usize;
        let max: u128 = self.max_segment_value() as u128;
        (0..count)
            .map(|i| {
                let shift: usize = (count - 1 - i) * bps;
                ((value >> shift) & max) as u32
            })
            .collect()
    }

    /// Inverse of [IpFam::split_value].
    pub fn join_values<I>(self, values: I) -> u128
    where
        I: IntoIterator<Item = u32>,
    {
        let bps: u32 = self.bits_per_segment() as u32;
        values
            .into_iter()
            .fold(0u128, |acc, v| (acc << bps) | v as u128)
    }
}

impl fmt::Display for IpFam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFam::V4 => write!(f, "IPv4"),
            IpFam::V6 => write!(f, "IPv6"),
        }
    }
}

/* ---------------------------------- */

/// Inclusive range of integer address values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ValueRange {
    pub beg: u128,
    /// inclusive
    pub end: u128,
}

impl ValueRange {
    pub fn cmp_key(&self) -> (u128, u128) {
        (self.beg, self.end)
    }
}

/* -------------------------------------------------------------------------- */

/// All ones in the low `bits` bits.
#[inline]
pub(crate) fn max_value_u128(bits: u8) -> u128 {
    if bits >= IPV6_BITS {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/**
The prefix length local to segment `index` for a section prefix of `prefix`
bits:
- `None` when every bit of the segment is a network bit
- `Some(n)` with `1..=bps` for the segment holding the boundary
- `Some(0)` for segments entirely past the boundary
*/
#[inline]
pub(crate) fn prefixed_segment_prefix_len(bps: u8, prefix: u8, index: usize) -> Option<u8> {
    let local: isize = prefix as isize - (bps as isize * index as isize);
    if local <= 0 {
        Some(0)
    } else if local <= bps as isize {
        Some(local as u8)
    } else {
        None
    }
}

#[inline]
pub(crate) fn segment_prefix_len(bps: u8, prefix: Option<u8>, index: usize) -> Option<u8> {
    prefix.and_then(|p| prefixed_segment_prefix_len(bps, p, index))
}

/// Index of the segment holding the last network bit; `None` for prefix 0.
#[inline]
pub(crate) fn network_segment_index(prefix: u8, bps: u8) -> Option<usize> {
    match prefix {
        0 => None,
        p => Some((p as usize - 1) / bps as usize),
    }
}

/// Index of the segment holding the first host bit.
#[inline]
pub(crate) fn host_segment_index(prefix: u8, bps: u8) -> usize {
    prefix as usize / bps as usize
}

/// Segment-local network mask; all ones when the segment has no prefix.
#[inline]
pub(crate) fn segment_network_mask(bps: u8, seg_prefix: Option<u8>) -> u32 {
    let max: u32 = (1u32 << bps) - 1;
    match seg_prefix {
        None => max,
        Some(k) => (max << (bps - k.min(bps))) & max,
    }
}

/// Segment-local host mask; zero when the segment has no prefix.
#[inline]
pub(crate) fn segment_host_mask(bps: u8, seg_prefix: Option<u8>) -> u32 {
    let max: u32 = (1u32 << bps) - 1;
    !segment_network_mask(bps, seg_prefix) & max
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_V4_VALUE: u128 = 0xc0a8_0102;
    const TEST_V6_VALUE: u128 = 0x2001_0db8_0000_0000_0000_0000_0000_0001;

    #[test]
    fn test_split_join_v4() {
        let segs: Vec<u32> = IpFam::V4.split_value(TEST_V4_VALUE, 4);
        assert_eq!(segs, vec![192, 168, 1, 2]);
        assert_eq!(IpFam::V4.join_values(segs), TEST_V4_VALUE);
    }

    #[test]
    fn test_split_v6_partial() {
        let segs: Vec<u32> = IpFam::V6.split_value(TEST_V6_VALUE, 8);
        assert_eq!(segs, vec![0x2001, 0xdb8, 0, 0, 0, 0, 0, 1]);
        // only the low 32 bits survive a two segment split
        assert_eq!(IpFam::V6.split_value(TEST_V6_VALUE, 2), vec![0, 1]);
    }

    #[test]
    fn test_segment_prefix_lengths() {
        let pfx: Vec<Option<u8>> = (0..4).map(|i| segment_prefix_len(8, Some(20), i)).collect();
        assert_eq!(pfx, vec![None, None, Some(4), Some(0)]);
        let pfx: Vec<Option<u8>> = (0..4).map(|i| segment_prefix_len(8, Some(32), i)).collect();
        assert_eq!(pfx, vec![None, None, None, Some(8)]);
        assert_eq!(segment_prefix_len(16, None, 3), None);
    }

    #[test]
    fn test_segment_indexes() {
        assert_eq!(network_segment_index(0, 8), None);
        assert_eq!(network_segment_index(24, 8), Some(2));
        assert_eq!(network_segment_index(25, 8), Some(3));
        assert_eq!(host_segment_index(24, 8), 3);
        assert_eq!(host_segment_index(64, 16), 4);
    }

    #[test]
    fn test_segment_masks() {
        assert_eq!(segment_network_mask(8, Some(4)), 0xf0);
        assert_eq!(segment_host_mask(8, Some(4)), 0x0f);
        assert_eq!(segment_network_mask(16, Some(0)), 0);
        assert_eq!(segment_network_mask(16, None), 0xffff);
        assert_eq!(segment_host_mask(16, None), 0);
        assert_eq!(max_value_u128(128), u128::MAX);
        assert_eq!(max_value_u128(24), 0xff_ffff);
    }
}
