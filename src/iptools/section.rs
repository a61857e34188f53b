// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    memo::Memo,
    segment::Segment,
    strings::*,
    structs::{
        host_segment_index, max_value_u128, network_segment_index, prefixed_segment_prefix_len,
        segment_host_mask, segment_network_mask, segment_prefix_len, IpFam,
    },
    AddressError,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

lazy_static! {
    static ref IPV4_ZERO: Section = Section::from_single_values(IpFam::V4, &[0; 4]);
    static ref IPV6_ZERO: Section = Section::from_single_values(IpFam::V6, &[0; 8]);
    static ref IPV4_LOOPBACK: Section = Section::from_single_values(IpFam::V4, &[127, 0, 0, 1]);
    static ref IPV6_LOOPBACK: Section = Section::from_single_values(IpFam::V6, &[0, 0, 0, 0, 0, 0, 0, 1]);
}

/**
An ordered sequence of same-width [Segment]s forming all or part of an IP
address, with an optional prefix length.

A section represents the set of addresses given by the cartesian product of
its segment ranges. Sections are immutable: every operation derives a new
section. Derived values (lower/upper boundaries, block prefixes, mask
prefixes) are memoized per instance and safe to share across threads.

Equality via `==` is structural and includes the prefix length; use
[Section::equal] to compare value sets only.
*/
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "SectionRepr", into = "SectionRepr")]
pub struct Section {
    fam: IpFam,
    segments: Vec<Segment>,
    prefix: Option<u8>,
    is_multiple: bool,
    cache: SectionCache,
}

#[derive(Clone, Default)]
struct SectionCache {
    lower: Memo<Arc<Section>>,
    upper: Memo<Arc<Section>>,
    min_prefix: Memo<u8>,
    single_block_prefix: Memo<Option<u8>>,
    network_mask_prefix: Memo<Option<u8>>,
    host_mask_prefix: Memo<Option<u8>>,
}

/// Plain serialized form. Caches are never serialized.
#[derive(Serialize, Deserialize)]
struct SectionRepr {
    family: IpFam,
    segments: Vec<(u32, u32)>,
    prefix_len: Option<u8>,
}

impl From<Section> for SectionRepr {
    fn from(s: Section) -> Self {
        SectionRepr {
            family: s.fam,
            segments: s.segments.iter().map(|seg| (seg.lower(), seg.upper())).collect(),
            prefix_len: s.prefix,
        }
    }
}

impl TryFrom<SectionRepr> for Section {
    type Error = AddressError;

    fn try_from(r: SectionRepr) -> Result<Self, Self::Error> {
        let segments: Vec<Segment> = r
            .segments
            .iter()
            .map(|&(lower, upper)| Segment::new(r.family, lower, upper))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        let section: Section = Section::new(r.family, segments)?;
        Ok(match r.prefix_len {
            Some(p) => section.set_prefix_len(p),
            None => section,
        })
    }
}

/* -------------------------------------------------------------------------- */

impl Section {
    /// Create an unprefixed section. Segment prefixes are dropped.
    pub fn new(fam: IpFam, segments: Vec<Segment>) -> Result<Self, AddressError> {
        if segments.len() > fam.segment_count() {
            return Err(AddressError::TooManySegments {
                count: segments.len(),
                fam,
            });
        }
        if let Some(bad) = segments.iter().find(|s| s.bit_count() != fam.bits_per_segment()) {
            return Err(AddressError::InvalidSegment {
                lower: bad.lower(),
                upper: bad.upper(),
                max: fam.max_segment_value(),
            });
        }
        Ok(Self::derive_from(fam, segments, None))
    }

    /**
    Create a section with an optional prefix length (clamped to the bit
    count).

    A zero-host section, one whose lower values have all host bits zero,
    is promoted to the prefix block at that prefix: `1.2.0.0/16` becomes
    `1.2.0-255.0-255/16`. Anything else keeps its values and just records the
    prefix.
    */
    pub fn new_prefixed(fam: IpFam, segments: Vec<Segment>, prefix: Option<u8>) -> Result<Self, AddressError> {
        Ok(Self::new(fam, segments)?.assign_prefix(prefix))
    }

    /// Create a section from `(lower, upper)` segment value pairs.
    pub fn from_ranges(fam: IpFam, ranges: &[(u32, u32)], prefix: Option<u8>) -> Result<Self, AddressError> {
        let segments: Vec<Segment> = ranges
            .iter()
            .map(|&(lower, upper)| Segment::new(fam, lower, upper))
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        Self::new_prefixed(fam, segments, prefix)
    }

    /// Create a `count` segment section holding the single value `value`.
    pub fn from_value(fam: IpFam, value: u128, count: usize, prefix: Option<u8>) -> Result<Self, AddressError> {
        check_segment_count(fam, count)?;
        let bits: u8 = (count * fam.bits_per_segment() as usize) as u8;
        if value > max_value_u128(bits) {
            return Err(AddressError::ValueTooLarge { value, bits });
        }
        let values: Vec<u32> = fam.split_value(value, count);
        Ok(Self::from_single_values(fam, &values).assign_prefix(prefix))
    }

    /**
    Create a `count` segment section from big-endian bytes.

    Shorter input is zero-extended on the left. Longer input is accepted
    only when the extra leading bytes are zero.
    */
    pub fn from_bytes(fam: IpFam, bytes: &[u8], count: usize, prefix: Option<u8>) -> Result<Self, AddressError> {
        check_segment_count(fam, count)?;
        let byte_count: usize = count * fam.bytes_per_segment();
        let bits: u8 = (byte_count * 8) as u8;
        let split: usize = bytes.len().saturating_sub(byte_count);
        let (extra, significant) = bytes.split_at(split);
        if extra.iter().any(|&b| b != 0) {
            let value: u128 = bytes
                .iter()
                .try_fold(0u128, |acc, &b| acc.checked_mul(256).map(|v| v | b as u128))
                .unwrap_or(u128::MAX);
            return Err(AddressError::ValueTooLarge { value, bits });
        }
        let value: u128 = significant.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128);
        Self::from_value(fam, value, count, prefix)
    }

    /**
    Create a `count` segment section asking `lower` and `upper` for each
    segment's bounds. Swapped bounds are reordered.
    */
    pub fn from_providers<L, U>(
        fam: IpFam,
        count: usize,
        lower: L,
        upper: U,
        prefix: Option<u8>,
    ) -> Result<Self, AddressError>
    where
        L: Fn(usize) -> u32,
        U: Fn(usize) -> u32,
    {
        check_segment_count(fam, count)?;
        let segments: Vec<Segment> = (0..count)
            .map(|i| {
                let (a, b) = (lower(i), upper(i));
                Segment::new(fam, a.min(b), a.max(b))
            })
            .collect::<Result<Vec<Segment>, AddressError>>()?;
        Self::new_prefixed(fam, segments, prefix)
    }

    /// Single-valued variant of [Section::from_providers].
    pub fn from_provider<F>(fam: IpFam, count: usize, values: F, prefix: Option<u8>) -> Result<Self, AddressError>
    where
        F: Fn(usize) -> u32,
    {
        Self::from_providers(fam, count, &values, &values, prefix)
    }

    /// The section with no segments.
    pub fn empty(fam: IpFam) -> Self {
        Self::derive_from(fam, Vec::new(), None)
    }

    /// All-zero full address (`0.0.0.0` or `::`).
    pub fn zero(fam: IpFam) -> &'static Section {
        match fam {
            IpFam::V4 => &IPV4_ZERO,
            IpFam::V6 => &IPV6_ZERO,
        }
    }

    /// Loopback full address (`127.0.0.1` or `::1`).
    pub fn loopback(fam: IpFam) -> &'static Section {
        match fam {
            IpFam::V4 => &IPV4_LOOPBACK,
            IpFam::V6 => &IPV6_LOOPBACK,
        }
    }

    /// Full-length unprefixed mask with the first `prefix` bits set.
    pub fn network_mask(fam: IpFam, prefix: u8) -> Self {
        let bps: u8 = fam.bits_per_segment();
        let values: Vec<u32> = (0..fam.segment_count())
            .map(|i| segment_network_mask(bps, prefixed_segment_prefix_len(bps, prefix, i)))
            .collect();
        Self::from_single_values(fam, &values)
    }

    /// Full-length unprefixed mask with all bits after the first `prefix` set.
    pub fn host_mask(fam: IpFam, prefix: u8) -> Self {
        let bps: u8 = fam.bits_per_segment();
        let values: Vec<u32> = (0..fam.segment_count())
            .map(|i| segment_host_mask(bps, prefixed_segment_prefix_len(bps, prefix, i)))
            .collect();
        Self::from_single_values(fam, &values)
    }

    /* ---------------------------------- */

    /// Single-valued section from values known to fit the segment width.
    pub(crate) fn from_single_values(fam: IpFam, values: &[u32]) -> Self {
        let bps: u8 = fam.bits_per_segment();
        let segments: Vec<Segment> = values
            .iter()
            .map(|&v| Segment::from_parts(bps, v, v, None))
            .collect();
        Self::derive_from(fam, segments, None)
    }

    /**
    Wrap already valid segments. The prefix is clamped, and every segment
    prefix is re-derived from it, so the two always agree.
    */
    pub(crate) fn derive_from(fam: IpFam, mut segments: Vec<Segment>, prefix: Option<u8>) -> Self {
        let bps: u8 = fam.bits_per_segment();
        let bits: u8 = (segments.len() * bps as usize) as u8;
        let prefix: Option<u8> = prefix.map(|p| p.min(bits));
        for (i, seg) in segments.iter_mut().enumerate() {
            *seg = seg.with_prefix_len(segment_prefix_len(bps, prefix, i));
        }
        let is_multiple: bool = segments.iter().any(|s| s.is_multiple());
        Self {
            fam,
            segments,
            prefix,
            is_multiple,
            cache: SectionCache::default(),
        }
    }

    #[inline]
    pub(crate) fn derive(&self, segments: Vec<Segment>, prefix: Option<u8>) -> Self {
        Self::derive_from(self.fam, segments, prefix)
    }

    /// Attach a prefix, promoting zero-host sections to prefix blocks.
    pub(crate) fn assign_prefix(self, prefix: Option<u8>) -> Self {
        let Some(p) = prefix.map(|p| p.min(self.bit_count())) else {
            return self.derive(self.segments.clone(), None);
        };
        if p < self.bit_count() && is_zero_host_lower(&self.segments, self.bits_per_segment(), p) {
            return self.to_prefix_block_len(p);
        }
        self.derive(self.segments.clone(), Some(p))
    }

    /* ---------------------------------- */

    #[inline]
    pub fn family(&self) -> IpFam {
        self.fam
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn get_segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn bits_per_segment(&self) -> u8 {
        self.fam.bits_per_segment()
    }

    #[inline]
    pub fn bit_count(&self) -> u8 {
        (self.segments.len() * self.bits_per_segment() as usize) as u8
    }

    #[inline]
    pub fn prefix_len(&self) -> Option<u8> {
        self.prefix
    }

    #[inline]
    pub fn is_prefixed(&self) -> bool {
        self.prefix.is_some()
    }

    /// Whether any segment spans more than one value.
    #[inline]
    pub fn is_multiple(&self) -> bool {
        self.is_multiple
    }

    /// Whether the section has no segments at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All-ones value for the section's bit count.
    #[inline]
    pub(crate) fn max_value(&self) -> u128 {
        max_value_u128(self.bit_count())
    }

    /* ---------------------------------- */

    /// The lowest address in the section, keeping the prefix length.
    pub fn lower(&self) -> Section {
        let arc: Arc<Section> = self.cache.lower.get_or_init(|| {
            if !self.is_multiple {
                return Arc::new(self.clone());
            }
            let segs: Vec<Segment> = self
                .segments
                .iter()
                .map(|s| s.derive_new_range(s.lower(), s.lower(), s.prefix_len()))
                .collect();
            Arc::new(self.derive(segs, self.prefix))
        });
        Section::clone(&arc)
    }

    /// The highest address in the section, keeping the prefix length.
    pub fn upper(&self) -> Section {
        let arc: Arc<Section> = self.cache.upper.get_or_init(|| {
            if !self.is_multiple {
                return Arc::new(self.clone());
            }
            let segs: Vec<Segment> = self
                .segments
                .iter()
                .map(|s| s.derive_new_range(s.upper(), s.upper(), s.prefix_len()))
                .collect();
            Arc::new(self.derive(segs, self.prefix))
        });
        Section::clone(&arc)
    }

    /// The lowest address as an integer of [Section::bit_count] bits.
    pub fn lower_value(&self) -> u128 {
        self.fam.join_values(self.segments.iter().map(|s| s.lower()))
    }

    /// The highest address as an integer of [Section::bit_count] bits.
    pub fn upper_value(&self) -> u128 {
        self.fam.join_values(self.segments.iter().map(|s| s.upper()))
    }

    /// Big-endian bytes of the lowest address.
    pub fn bytes(&self) -> Vec<u8> {
        self.segment_bytes(|s| s.lower())
    }

    /// Big-endian bytes of the highest address.
    pub fn upper_bytes(&self) -> Vec<u8> {
        self.segment_bytes(|s| s.upper())
    }

    fn segment_bytes(&self, value: impl Fn(&Segment) -> u32) -> Vec<u8> {
        let per: usize = self.fam.bytes_per_segment();
        let mut out: Vec<u8> = Vec::with_capacity(self.segments.len() * per);
        for seg in &self.segments {
            let v: u32 = value(seg);
            out.extend((0..per).rev().map(|k| (v >> (8 * k)) as u8));
        }
        out
    }

    /* ---------------------------------- */

    /// Whether the section is one contiguous range of address values.
    pub fn is_sequential(&self) -> bool {
        match self.segments.iter().position(|s| s.is_multiple()) {
            Some(i) => self.segments[i + 1..].iter().all(|s| s.is_full_range()),
            None => true,
        }
    }

    /**
    Index of the last segment that is not full range, or 0. The section
    is a union of sequential blocks, one for each combination of values
    of the segments before this index.
    */
    pub fn sequential_block_index(&self) -> usize {
        let mut idx: usize = self.segments.len().saturating_sub(1);
        while idx > 0 && self.segments[idx].is_full_range() {
            idx -= 1;
        }
        idx
    }

    pub fn is_full_range(&self) -> bool {
        self.segments.iter().all(|s| s.is_full_range())
    }

    pub fn is_zero(&self) -> bool {
        self.segments.iter().all(|s| s.is_zero())
    }

    pub fn includes_zero(&self) -> bool {
        self.segments.iter().all(|s| s.includes_zero())
    }

    pub fn is_max(&self) -> bool {
        self.segments.iter().all(|s| s.is_max())
    }

    pub fn includes_max(&self) -> bool {
        self.segments.iter().all(|s| s.includes_max())
    }

    /**
    The smallest prefix length for which the section is a union of prefix
    blocks. Scans from the last segment: full-range segments contribute
    nothing, and the first segment that is not full range decides.
    */
    pub fn min_prefix_len_for_block(&self) -> u8 {
        self.cache.min_prefix.get_or_init(|| {
            let mut total: u8 = self.bit_count();
            for seg in self.segments.iter().rev() {
                let bits: u8 = seg.bit_count();
                let seg_prefix: u8 = seg.min_prefix_len_for_block();
                if seg_prefix == bits {
                    break;
                }
                total -= bits;
                if seg_prefix != 0 {
                    total += seg_prefix;
                    break;
                }
            }
            total
        })
    }

    /// The prefix length for which the section is exactly one prefix block, if any.
    pub fn prefix_len_for_single_block(&self) -> Option<u8> {
        self.cache.single_block_prefix.get_or_init(|| {
            let mut total: u8 = 0;
            for (i, seg) in self.segments.iter().enumerate() {
                let seg_prefix: u8 = seg.prefix_len_for_single_block()?;
                total += seg_prefix;
                if seg_prefix < seg.bit_count() {
                    let rest_full: bool = self.segments[i + 1..].iter().all(|s| s.is_full_range());
                    return rest_full.then_some(total);
                }
            }
            Some(total)
        })
    }

    /// Whether the section is a union of prefix blocks of length `prefix`.
    pub fn contains_prefix_block(&self, prefix: u8) -> bool {
        let bps: u8 = self.bits_per_segment();
        let prefix: u8 = prefix.min(self.bit_count());
        self.segments.iter().enumerate().all(|(i, seg)| {
            match prefixed_segment_prefix_len(bps, prefix, i) {
                Some(sp) => seg.contains_prefix_block(sp),
                None => true,
            }
        })
    }

    /// Whether the section is exactly one prefix block of length `prefix`.
    pub fn contains_single_prefix_block(&self, prefix: u8) -> bool {
        let bps: u8 = self.bits_per_segment();
        let prefix: u8 = prefix.min(self.bit_count());
        self.segments.iter().enumerate().all(|(i, seg)| {
            match prefixed_segment_prefix_len(bps, prefix, i) {
                Some(sp) => seg.contains_single_prefix_block(sp),
                None => !seg.is_multiple(),
            }
        })
    }

    /// Whether the section is a union of blocks at its own prefix length.
    pub fn is_prefix_block(&self) -> bool {
        self.prefix.is_some_and(|p| self.contains_prefix_block(p))
    }

    /// Whether the section is exactly one block at its own prefix length.
    pub fn is_single_prefix_block(&self) -> bool {
        self.prefix.is_some_and(|p| self.contains_single_prefix_block(p))
    }

    /* ---------------------------------- */

    pub fn is_zero_host(&self) -> bool {
        self.prefix.is_some_and(|p| self.is_zero_host_len(p))
    }

    /**
    Whether the section is a single value whose bits after the first
    `prefix` bits are all zero.
    */
    pub fn is_zero_host_len(&self, prefix: u8) -> bool {
        self.host_segments(prefix).all(|(seg, host)| !seg.is_multiple() && seg.lower() & host == 0)
    }

    pub fn is_max_host(&self) -> bool {
        self.prefix.is_some_and(|p| self.is_max_host_len(p))
    }

    /// Whether the section is a single value whose host bits are all one.
    pub fn is_max_host_len(&self, prefix: u8) -> bool {
        self.host_segments(prefix).all(|(seg, host)| !seg.is_multiple() && seg.lower() & host == host)
    }

    /// Whether some address in the section has a zero host at its prefix length.
    pub fn includes_zero_host(&self) -> bool {
        self.prefix.is_some_and(|p| self.includes_zero_host_len(p))
    }

    pub fn includes_zero_host_len(&self, prefix: u8) -> bool {
        self.host_segments(prefix).all(|(seg, host)| {
            if seg.lower() & host == 0 {
                return true;
            }
            // next value above lower with a zero host
            let next: u64 = (seg.lower() | host) as u64 + 1;
            next <= seg.upper() as u64
        })
    }

    /// Whether some address in the section has an all-ones host at its prefix length.
    pub fn includes_max_host(&self) -> bool {
        self.prefix.is_some_and(|p| self.includes_max_host_len(p))
    }

    pub fn includes_max_host_len(&self, prefix: u8) -> bool {
        self.host_segments(prefix).all(|(seg, host)| {
            if seg.upper() & host == host {
                return true;
            }
            // previous value below upper with an all-ones host
            let base: u32 = seg.upper() & !host;
            base > 0 && (base - 1) >= seg.lower()
        })
    }

    /// Segments holding host bits at `prefix`, with their segment-local host masks.
    fn host_segments(&self, prefix: u8) -> impl Iterator<Item = (&Segment, u32)> + '_ {
        let bps: u8 = self.bits_per_segment();
        let prefix: u8 = prefix.min(self.bit_count());
        let start: usize = host_segment_index(prefix, bps);
        self.segments
            .iter()
            .enumerate()
            .skip(start)
            .map(move |(i, seg)| (seg, segment_host_mask(bps, prefixed_segment_prefix_len(bps, prefix, i))))
    }

    /// Whether every address in the section shares the same network bits.
    pub fn is_single_network(&self) -> bool {
        let Some(p) = self.prefix else {
            return !self.is_multiple;
        };
        if p >= self.bit_count() {
            return !self.is_multiple;
        }
        let bps: u8 = self.bits_per_segment();
        let Some(idx) = network_segment_index(p, bps) else {
            return true;
        };
        if self.segments[..idx].iter().any(|s| s.is_multiple()) {
            return false;
        }
        let seg: &Segment = &self.segments[idx];
        let shift: u8 = bps - prefixed_segment_prefix_len(bps, p, idx).unwrap_or(bps);
        seg.lower() >> shift == seg.upper() >> shift
    }

    /**
    If the section is a single value shaped like a network mask (`network`
    true: ones then zeros) or a host mask (zeros then ones), the prefix
    length that mask corresponds to.
    */
    pub fn block_mask_prefix_len(&self, network: bool) -> Option<u8> {
        let memo: &Memo<Option<u8>> = match network {
            true => &self.cache.network_mask_prefix,
            false => &self.cache.host_mask_prefix,
        };
        memo.get_or_init(|| {
            if self.is_multiple || self.is_empty() {
                return None;
            }
            let bits: u8 = self.bit_count();
            let all: u128 = max_value_u128(bits);
            let value: u128 = self.lower_value();
            let pad: u32 = 128 - bits as u32;
            if network {
                let ones: u8 = ((value << pad).leading_ones()).min(bits as u32) as u8;
                (value == all ^ max_value_u128(bits - ones)).then_some(ones)
            } else {
                let zeros: u8 = (value.leading_zeros() - pad) as u8;
                (value == max_value_u128(bits - zeros)).then_some(zeros)
            }
        })
    }
}

/* ---------------------------------- */

#[inline]
fn check_segment_count(fam: IpFam, count: usize) -> Result<(), AddressError> {
    match count > fam.segment_count() {
        true => Err(AddressError::TooManySegments { count, fam }),
        false => Ok(()),
    }
}

/// Whether all host bits at `prefix` of the segments' lower values are zero.
pub(crate) fn is_zero_host_lower(segments: &[Segment], bps: u8, prefix: u8) -> bool {
    segments.iter().enumerate().all(|(i, seg)| {
        seg.lower() & segment_host_mask(bps, prefixed_segment_prefix_len(bps, prefix, i)) == 0
    })
}

/* -------------------------------------------------------------------------- */

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        self.fam == other.fam && self.prefix == other.prefix && self.segments == other.segments
    }
}

impl Eq for Section {}

impl Hash for Section {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fam.hash(state);
        self.segments.hash(state);
        self.prefix.hash(state);
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("fam", &self.fam)
            .field("segments", &self.segments)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Dotted (IPv4) or colon separated (IPv6) segments, then `/prefix` if any.
impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep: &str = match self.fam {
            IpFam::V4 => ".",
            IpFam::V6 => ":",
        };
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{seg}")?;
        }
        if let Some(p) = self.prefix {
            write!(f, "{SLASH}{p}")?;
        }
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_V4_BLOCK: [(u32, u32); 4] = [(192, 192), (168, 168), (0, 0), (0, 255)];
    const TEST_V4_RANGE: [(u32, u32); 4] = [(1, 4), (1, 3), (2, 2), (4, 4)];
    const TEST_V6_MASK64: [u32; 8] = [0xffff, 0xffff, 0xffff, 0xffff, 0, 0, 0, 0];

    fn v4(ranges: &[(u32, u32)], prefix: Option<u8>) -> Section {
        Section::from_ranges(IpFam::V4, ranges, prefix).unwrap()
    }

    #[test]
    fn test_new_checks_segments() {
        let seg: Segment = Segment::single(IpFam::V6, 1).unwrap();
        assert!(Section::new(IpFam::V4, vec![seg]).is_err());
        let segs: Vec<Segment> = vec![Segment::single(IpFam::V4, 1).unwrap(); 5];
        assert_eq!(
            Section::new(IpFam::V4, segs),
            Err(AddressError::TooManySegments { count: 5, fam: IpFam::V4 })
        );
    }

    #[test]
    fn test_segment_prefixes_follow_section() {
        let s: Section = v4(&TEST_V4_BLOCK, Some(20));
        let pfx: Vec<Option<u8>> = s.segments().iter().map(|s| s.prefix_len()).collect();
        assert_eq!(pfx, vec![None, None, Some(4), Some(0)]);
        assert_eq!(s.bit_count(), 32);
        // zero host at /20, so promoted to the block
        assert_eq!(s.to_string(), "192.168.0-15.0-255/20");
    }

    #[test]
    fn test_zero_host_promoted_to_block() {
        let s: Section = Section::from_value(IpFam::V4, 0x0102_0000, 4, Some(16)).unwrap();
        assert!(s.is_single_prefix_block());
        assert_eq!(s.to_string(), "1.2.0-255.0-255/16");
        // non-zero host is kept as is
        let s: Section = Section::from_value(IpFam::V4, 0x0102_0304, 4, Some(16)).unwrap();
        assert!(!s.is_multiple());
        assert_eq!(s.prefix_len(), Some(16));
    }

    #[test]
    fn test_from_bytes() {
        let s: Section = Section::from_bytes(IpFam::V4, &[0, 0, 10, 1, 2, 3], 4, None).unwrap();
        assert_eq!(s.to_string(), "10.1.2.3");
        let s: Section = Section::from_bytes(IpFam::V4, &[1, 2], 4, None).unwrap();
        assert_eq!(s.lower_value(), 0x0102);
        assert_eq!(
            Section::from_bytes(IpFam::V4, &[1, 0, 0, 0, 0], 4, None),
            Err(AddressError::ValueTooLarge { value: 1 << 32, bits: 32 })
        );
        assert!(Section::from_value(IpFam::V4, 256, 1, None).is_err());
    }

    #[test]
    fn test_from_providers() {
        let s: Section = Section::from_providers(IpFam::V6, 8, |i| i as u32, |i| (i * 2) as u32, None).unwrap();
        assert_eq!(s.to_string(), "0:1-2:2-4:3-6:4-8:5-a:6-c:7-e");
        let s: Section = Section::from_provider(IpFam::V4, 4, |i| [10, 0, 0, 1][i], Some(8)).unwrap();
        assert_eq!(s.to_string(), "10.0.0.1/8");
    }

    #[test]
    fn test_singletons() {
        assert!(Section::zero(IpFam::V6).is_zero());
        assert_eq!(Section::loopback(IpFam::V4).to_string(), "127.0.0.1");
        assert_eq!(Section::loopback(IpFam::V6).upper_value(), 1);
    }

    #[test]
    fn test_boundaries() {
        let s: Section = v4(&TEST_V4_RANGE, None);
        assert!(s.is_multiple());
        assert_eq!(s.lower().to_string(), "1.1.2.4");
        assert_eq!(s.upper().to_string(), "4.3.2.4");
        assert_eq!(s.lower_value(), 0x0101_0204);
        assert_eq!(s.upper_bytes(), vec![4, 3, 2, 4]);
        // memoized boundaries are identical on repeat
        assert_eq!(s.lower(), s.lower());
        let p: Section = v4(&TEST_V4_BLOCK, Some(24));
        assert_eq!(p.upper().prefix_len(), Some(24));
    }

    #[test]
    fn test_sequential() {
        assert!(v4(&TEST_V4_BLOCK, None).is_sequential());
        assert!(!v4(&TEST_V4_RANGE, None).is_sequential());
        assert_eq!(v4(&TEST_V4_RANGE, None).sequential_block_index(), 3);
        let s: Section = v4(&[(1, 1), (2, 5), (0, 255), (0, 255)], None);
        assert!(s.is_sequential());
        assert_eq!(s.sequential_block_index(), 1);
    }

    #[test]
    fn test_block_prefixes() {
        let s: Section = v4(&TEST_V4_BLOCK, None);
        assert_eq!(s.min_prefix_len_for_block(), 24);
        assert_eq!(s.prefix_len_for_single_block(), Some(24));
        assert!(s.contains_prefix_block(24));
        assert!(s.contains_single_prefix_block(24));
        assert!(!s.contains_single_prefix_block(16));

        let s: Section = v4(&[(10, 10), (0, 3), (0, 255), (0, 255)], None);
        assert_eq!(s.prefix_len_for_single_block(), Some(14));

        let s: Section = v4(&[(10, 11), (0, 3), (0, 255), (0, 255)], None);
        assert_eq!(s.min_prefix_len_for_block(), 14);
        assert_eq!(s.prefix_len_for_single_block(), None);
        assert!(s.contains_prefix_block(14));
        assert!(!s.contains_single_prefix_block(14));
    }

    #[test]
    fn test_host_queries() {
        let s: Section = Section::from_value(IpFam::V4, 0x0a00_0100, 4, None).unwrap().set_prefix_len(24);
        assert!(s.is_zero_host());
        assert!(!s.is_max_host());
        assert!(!s.is_zero_host_len(23));
        assert!(s.is_zero_host_len(32));
        assert!(Section::from_value(IpFam::V4, 0x0a00_01ff, 4, None).unwrap().is_max_host_len(24));

        let r: Section = v4(&[(10, 10), (0, 0), (1, 1), (3, 200)], Some(28));
        assert!(!r.is_zero_host());
        assert!(r.includes_zero_host());
        assert!(r.includes_max_host());
        assert!(!r.is_single_network());
        assert!(!v4(&[(10, 10), (0, 0), (1, 1), (3, 14)], Some(28)).includes_zero_host());
    }

    #[test]
    fn test_single_network() {
        assert!(v4(&TEST_V4_BLOCK, Some(24)).is_single_network());
        assert!(!v4(&TEST_V4_RANGE, Some(8)).is_single_network());
        assert!(v4(&TEST_V4_RANGE, Some(0)).is_single_network());
        assert!(!v4(&TEST_V4_RANGE, None).is_single_network());
    }

    #[test]
    fn test_block_mask_prefix() {
        let m: Section = Section::from_single_values(IpFam::V6, &TEST_V6_MASK64);
        assert_eq!(m.block_mask_prefix_len(true), Some(64));
        assert_eq!(m.block_mask_prefix_len(false), None);
        assert_eq!(Section::host_mask(IpFam::V4, 20).block_mask_prefix_len(false), Some(20));
        assert_eq!(Section::network_mask(IpFam::V4, 0).block_mask_prefix_len(true), Some(0));
        assert_eq!(Section::network_mask(IpFam::V4, 32).block_mask_prefix_len(true), Some(32));
        assert_eq!(Section::from_single_values(IpFam::V4, &[255, 0, 255, 0]).block_mask_prefix_len(true), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let s: Section = v4(&TEST_V4_BLOCK, Some(24)).to_zero_host().unwrap();
        let json: String = serde_json::to_string(&s).unwrap();
        let back: Section = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(!back.is_multiple());
    }

    #[test]
    fn test_send_sync() {
        fn check<T: Send + Sync>() {}
        check::<Section>();
    }
}
