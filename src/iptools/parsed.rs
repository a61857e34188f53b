// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building sections from tokenized address text.
//!
//! A tokenizer hands over one [ParsedSegment] per textual segment position,
//! already converted to numbers, plus a [Qualifier]. Positions standing for
//! several segments (IPv4 `inet_aton` joins, IPv6 `::` compression, trailing
//! wildcards) are expanded here, masks are applied, and the embedded IPv4
//! part of a mixed IPv6 address is folded into the last two segments.

use super::{
    masking::{mask_range, MaskResult},
    memo::Memo,
    section::{is_zero_host_lower, Section},
    segment::Segment,
    strings::*,
    structs::{max_value_u128, IpFam},
    AddressError, IPV6_MIXED_SEGMENT_COUNT,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Numeric parse data for one textual segment position.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParsedSegment {
    pub lower: u64,
    pub upper: u64,
    /// High 64 bits of a joined value wider than 64 bits (IPv6 only).
    pub extended_lower: u64,
    pub extended_upper: u64,
    /// `*`: the position spans every value it can stand for
    pub is_wildcard: bool,
    /// IPv6 `::`
    pub is_compressed: bool,
}

impl ParsedSegment {
    pub fn value(value: u64) -> Self {
        Self::range(value, value)
    }

    pub fn range(lower: u64, upper: u64) -> Self {
        Self {
            lower,
            upper,
            ..Default::default()
        }
    }

    /// A joined value wider than 64 bits; `high` holds the bits above 64.
    pub fn extended(lower: u64, upper: u64, high_lower: u64, high_upper: u64) -> Self {
        Self {
            lower,
            upper,
            extended_lower: high_lower,
            extended_upper: high_upper,
            ..Default::default()
        }
    }

    pub fn wildcard() -> Self {
        Self {
            upper: u64::MAX,
            is_wildcard: true,
            ..Default::default()
        }
    }

    pub fn compressed() -> Self {
        Self {
            is_compressed: true,
            ..Default::default()
        }
    }

    #[inline]
    fn wide_lower(&self) -> u128 {
        (self.extended_lower as u128) << 64 | self.lower as u128
    }

    #[inline]
    fn wide_upper(&self) -> u128 {
        (self.extended_upper as u128) << 64 | self.upper as u128
    }
}

/* ---------------------------------- */

/// Everything after the address itself: prefix length, mask, zone, port, service.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    pub prefix_len: Option<u8>,
    pub mask: Option<Section>,
    pub zone: Option<String>,
    pub port: Option<u16>,
    pub service: Option<String>,
}

impl Qualifier {
    pub fn with_prefix_len(prefix: u8) -> Self {
        Self {
            prefix_len: Some(prefix),
            ..Default::default()
        }
    }

    pub fn with_mask(mask: Section) -> Self {
        Self {
            mask: Some(mask),
            ..Default::default()
        }
    }

    /**
    The explicit prefix length, or the prefix length of a mask that is a
    network mask (`255.255.0.0` is `/16`).
    */
    pub fn equivalent_prefix_len(&self) -> Option<u8> {
        self.prefix_len
            .or_else(|| self.mask.as_ref().and_then(|m| m.block_mask_prefix_len(true)))
    }

    /// The mask to apply to values. A network mask only supplies a prefix length.
    fn applied_mask(&self) -> Option<&Section> {
        self.mask.as_ref().filter(|m| m.block_mask_prefix_len(true).is_none())
    }
}

/// Tokenizer output for one address.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub family: IpFam,
    pub segments: Vec<ParsedSegment>,
    pub qualifier: Qualifier,
    /// IPv4 only: the last position holds all the missing segments
    pub inet_aton_joined: bool,
    /// IPv6 only: the embedded IPv4 address filling the last two segments
    pub mixed: Option<Box<ParsedAddress>>,
}

impl ParsedAddress {
    pub fn new(family: IpFam, segments: Vec<ParsedSegment>) -> Self {
        Self {
            family,
            segments,
            qualifier: Qualifier::default(),
            inet_aton_joined: false,
            mixed: None,
        }
    }

    pub fn with_qualifier(self, qualifier: Qualifier) -> Self {
        Self { qualifier, ..self }
    }

    pub fn joined(self) -> Self {
        Self {
            inet_aton_joined: true,
            ..self
        }
    }

    pub fn with_mixed(self, embedded: ParsedAddress) -> Self {
        Self {
            mixed: Some(Box::new(embedded)),
            ..self
        }
    }

    /// Segments the parsed positions must expand into.
    fn target_count(&self) -> usize {
        match self.mixed.is_some() {
            true => IPV6_MIXED_SEGMENT_COUNT,
            false => self.family.segment_count(),
        }
    }

    /**
    The position that expands to cover the missing segments: the first
    compressed position, else the last wildcard with no wildcard or
    compression after it, else the last position. `inet_aton` joins
    always expand at the last position.
    */
    fn expansion_index(&self, missing: usize) -> Option<usize> {
        if missing == 0 {
            return None;
        }
        let last: usize = self.segments.len().checked_sub(1)?;
        (0..=last).find(|&i| {
            let seg: &ParsedSegment = &self.segments[i];
            if i == last || self.is_compression(seg) {
                return true;
            }
            if !seg.is_wildcard || self.inet_aton_joined {
                return false;
            }
            self.segments[i + 1..]
                .iter()
                .all(|s| !s.is_wildcard && !self.is_compression(s))
        })
    }

    /// `::` only means anything in IPv6. Elsewhere the flag is ignored.
    #[inline]
    fn is_compression(&self, seg: &ParsedSegment) -> bool {
        self.family == IpFam::V6 && seg.is_compressed
    }

    /// Reject input the tokenizer should never produce.
    fn validate(&self) -> Result<(), AddressError> {
        let target: usize = self.target_count();
        let count: usize = self.segments.len();
        if count > target {
            return Err(AddressError::TooManySegments { count, fam: self.family });
        }
        if count == 0 {
            return Err(AddressError::SizeMismatch(count, target));
        }
        let missing: usize = target - count;
        let expand_at: Option<usize> = self.expansion_index(missing);
        let bps: u8 = self.family.bits_per_segment();
        for (i, seg) in self.segments.iter().enumerate() {
            let expands: bool = Some(i) == expand_at;
            if seg.is_wildcard || (expands && self.is_compression(seg)) {
                continue;
            }
            let bits: u8 = match expands {
                true => (missing as u8 + 1) * bps,
                false => bps,
            };
            let (lower, upper) = (seg.wide_lower(), seg.wide_upper());
            if upper > max_value_u128(bits) {
                return Err(AddressError::ValueTooLarge { value: upper, bits });
            }
            if lower > upper {
                return Err(AddressError::InvalidSegment {
                    lower: u32::try_from(lower).unwrap_or(u32::MAX),
                    upper: u32::try_from(upper).unwrap_or(u32::MAX),
                    max: u32::try_from(max_value_u128(bits)).unwrap_or(u32::MAX),
                });
            }
        }
        match &self.mixed {
            Some(_) if self.family != IpFam::V6 => Err(AddressError::Mismatch(IpFam::V6, self.family)),
            Some(m) if m.family != IpFam::V4 => Err(AddressError::Mismatch(IpFam::V4, m.family)),
            Some(m) if m.mixed.is_some() => Err(AddressError::TooManySegments {
                count: IPV6_MIXED_SEGMENT_COUNT + 4,
                fam: IpFam::V6,
            }),
            Some(m) => m.validate(),
            None => Ok(()),
        }
    }
}

/* ---------------------------------- */

/**
The sections built from a [ParsedAddress], with independent errors.

`section` has the mask and prefix length applied. `host_section` holds the
unmasked, unprefixed values and is only present when the mask changed
something or there is a prefix length. A caller that only needs one of
them is not blocked by an error in the other.
*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SectionResult {
    pub section: Section,
    pub host_section: Option<Section>,
    pub join_address_error: Option<AddressError>,
    pub join_host_error: Option<AddressError>,
    pub mixed_error: Option<AddressError>,
    pub mask_error: Option<AddressError>,
}

impl SectionResult {
    /// The masked section, unless building it recorded an error.
    pub fn address(&self) -> Result<&Section, AddressError> {
        let err: Option<&AddressError> = self
            .mask_error
            .as_ref()
            .or(self.join_address_error.as_ref())
            .or(self.mixed_error.as_ref());
        match err {
            Some(e) => Err(e.clone()),
            None => Ok(&self.section),
        }
    }

    /// The unmasked section, falling back to the masked one when they agree.
    pub fn host_address(&self) -> Result<&Section, AddressError> {
        match self.join_host_error.as_ref().or(self.mixed_error.as_ref()) {
            Some(e) => Err(e.clone()),
            None => Ok(self.host_section.as_ref().unwrap_or(&self.section)),
        }
    }
}

/// Lowest and highest address of the parsed range, with the prefix length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Boundaries {
    pub lower: Section,
    pub upper: Section,
}

/// One final segment: unmasked and masked value ranges.
#[derive(Clone, Copy, Debug)]
struct Slot {
    host: (u32, u32),
    masked: (u32, u32),
}

/// Per-segment values of a parsed address before any section is built.
#[derive(Debug, Default)]
struct Assembly {
    slots: Vec<Slot>,
    /// first and last final segment produced by a joined value
    expanded: Option<(usize, usize)>,
    mask_error: Option<AddressError>,
    mixed_error: Option<AddressError>,
}

impl Assembly {
    fn record_mask(&mut self, index: usize, lower: u128, upper: u128, mask: u128, r: &MaskResult) {
        if !r.sequential && self.mask_error.is_none() {
            debug!(index, lower, upper, mask, "{LOG_MASK_MISMATCH}");
            self.mask_error = Some(AddressError::IncompatibleRange { index, lower, upper, mask });
        }
    }
}

#[inline]
fn ordered(a: u128, b: u128) -> (u32, u32) {
    (a.min(b) as u32, a.max(b) as u32)
}

/* -------------------------------------------------------------------------- */

/**
Parse data for one address, with the built sections and the range
boundaries memoized separately: callers often need only one of them.
*/
#[derive(Debug)]
pub struct ParsedIpAddress {
    parsed: ParsedAddress,
    sections: Memo<Arc<SectionResult>>,
    boundaries: Memo<Arc<Boundaries>>,
}

impl ParsedIpAddress {
    /// Wrap tokenizer output, rejecting segment counts or values that cannot occur.
    pub fn new(parsed: ParsedAddress) -> Result<Self, AddressError> {
        parsed.validate()?;
        Ok(Self {
            parsed,
            sections: Memo::new(),
            boundaries: Memo::new(),
        })
    }

    #[inline]
    pub fn parsed(&self) -> &ParsedAddress {
        &self.parsed
    }

    #[inline]
    pub fn family(&self) -> IpFam {
        self.parsed.family
    }

    /// The qualifier's prefix length, or that of its network mask.
    pub fn prefix_len(&self) -> Option<u8> {
        self.parsed
            .qualifier
            .equivalent_prefix_len()
            .map(|p| p.min(self.family().bit_count()))
    }

    pub fn zone(&self) -> Option<&str> {
        self.parsed.qualifier.zone.as_deref()
    }

    pub fn sections(&self) -> Arc<SectionResult> {
        self.sections.get_or_init(|| Arc::new(self.build_sections()))
    }

    pub fn boundaries(&self) -> Arc<Boundaries> {
        self.boundaries.get_or_init(|| Arc::new(self.build_boundaries()))
    }

    /// Shorthand for [SectionResult::address].
    pub fn address(&self) -> Result<Section, AddressError> {
        self.sections().address().cloned()
    }

    /// Shorthand for [SectionResult::host_address].
    pub fn host_address(&self) -> Result<Section, AddressError> {
        self.sections().host_address().cloned()
    }

    /* ---------------------------------- */

    fn build_sections(&self) -> SectionResult {
        let fam: IpFam = self.family();
        let bps: u8 = fam.bits_per_segment();
        let prefix: Option<u8> = self.prefix_len();
        let asm: Assembly = self.assemble();

        let masked: Vec<Segment> = asm
            .slots
            .iter()
            .map(|s| Segment::from_parts(bps, s.masked.0, s.masked.1, None))
            .collect();
        let section: Section = Section::derive_from(fam, masked, None).assign_prefix(prefix);

        let host_differs: bool = asm.slots.iter().any(|s| s.host != s.masked);
        let host_section: Option<Section> = (host_differs || prefix.is_some()).then(|| {
            let host: Vec<Segment> = asm
                .slots
                .iter()
                .map(|s| Segment::from_parts(bps, s.host.0, s.host.1, None))
                .collect();
            Section::derive_from(fam, host, None)
        });

        let join_address_error: Option<AddressError> = asm.expanded.and_then(|(beg, end)| {
            check_expanded_values(&section, beg, end).map(AddressError::InvalidJoinedRange)
        });
        let join_host_error: Option<AddressError> = match &host_section {
            Some(host) => asm.expanded.and_then(|(beg, end)| {
                check_expanded_values(host, beg, end).map(AddressError::InvalidJoinedRange)
            }),
            None => join_address_error.clone(),
        };
        if let Some(e) = join_address_error.as_ref().or(join_host_error.as_ref()) {
            debug!(error = %e, "{LOG_JOIN_ERROR}");
        }

        SectionResult {
            section,
            host_section,
            join_address_error,
            join_host_error,
            mixed_error: asm.mixed_error,
            mask_error: asm.mask_error,
        }
    }

    /**
    Lower and upper boundary with the prefix length. When the lower
    boundary has a zero host, the parsed address denotes the whole prefix
    block, so the upper boundary is the top of that block.
    */
    fn build_boundaries(&self) -> Boundaries {
        let fam: IpFam = self.family();
        let bps: u8 = fam.bits_per_segment();
        let prefix: Option<u8> = self.prefix_len();
        let asm: Assembly = self.assemble();

        let lowers: Vec<Segment> = asm
            .slots
            .iter()
            .map(|s| Segment::from_parts(bps, s.masked.0, s.masked.0, None))
            .collect();
        let uppers: Vec<Segment> = asm
            .slots
            .iter()
            .map(|s| Segment::from_parts(bps, s.masked.1, s.masked.1, None))
            .collect();

        let zero_host: bool = prefix.is_some_and(|p| p < fam.bit_count() && is_zero_host_lower(&lowers, bps, p));
        let lower: Section = Section::derive_from(fam, lowers, prefix);
        let mut upper: Section = Section::derive_from(fam, uppers, prefix);
        if zero_host {
            upper = upper.to_prefix_block().upper();
        }
        Boundaries { lower, upper }
    }

    /* ---------------------------------- */

    /// Expand, mask and join every parsed position into final segment values.
    fn assemble(&self) -> Assembly {
        let parsed: &ParsedAddress = &self.parsed;
        let fam: IpFam = parsed.family;
        let bps: u8 = fam.bits_per_segment();
        let seg_max: u128 = fam.max_segment_value() as u128;
        let missing: usize = parsed.target_count().saturating_sub(parsed.segments.len());
        let expand_at: Option<usize> = parsed.expansion_index(missing);

        let mut asm: Assembly = Assembly::default();
        let mask: Option<&Section> = match parsed.qualifier.applied_mask() {
            Some(m) if m.family() != fam || m.segment_count() != fam.segment_count() => {
                asm.mask_error = Some(match m.family() == fam {
                    true => AddressError::SizeMismatch(m.segment_count(), fam.segment_count()),
                    false => AddressError::Mismatch(fam, m.family()),
                });
                None
            }
            m => m,
        };
        let mask_at = |index: usize| -> u128 {
            mask.map_or(seg_max, |m| m.segments()[index].lower() as u128)
        };

        for (i, seg) in parsed.segments.iter().enumerate() {
            let n: usize = asm.slots.len();
            if Some(i) != expand_at {
                let (lower, upper) = match seg.is_wildcard {
                    true => (0, seg_max),
                    false => (seg.lower as u128, seg.upper as u128),
                };
                let m: u128 = mask_at(n);
                let r: MaskResult = mask_range(lower, upper, m, seg_max);
                if mask.is_some() {
                    asm.record_mask(n, lower, upper, m, &r);
                }
                asm.slots.push(Slot {
                    host: ordered(lower, upper),
                    masked: ordered(r.lower, r.upper),
                });
                continue;
            }

            // one position standing for missing + 1 segments
            let count: usize = missing + 1;
            let bits: u8 = count as u8 * bps;
            let wide_max: u128 = max_value_u128(bits);
            let (lower, upper) = match (parsed.is_compression(seg), seg.is_wildcard) {
                (true, _) => (0, 0),
                (false, true) => (0, wide_max),
                (false, false) => {
                    asm.expanded = Some((n, n + missing));
                    (seg.wide_lower(), seg.wide_upper())
                }
            };
            let wide_mask: u128 = fam.join_values((n..n + count).map(|k| mask_at(k) as u32));
            let r: MaskResult = mask_range(lower, upper, wide_mask, wide_max);
            if mask.is_some() {
                asm.record_mask(n, lower, upper, wide_mask, &r);
            }
            for k in 0..count {
                let shift: u32 = ((count - 1 - k) * bps as usize) as u32;
                let part = |v: u128| (v >> shift) & seg_max;
                asm.slots.push(Slot {
                    host: ordered(part(lower), part(upper)),
                    masked: ordered(part(r.lower), part(r.upper)),
                });
            }
            trace!(index = i, segments = count, "{LOG_EXPANDED}");
        }

        if let Some(embedded) = &parsed.mixed {
            self.join_mixed(embedded, mask, &mut asm);
        }
        asm
    }

    /**
    Fold the embedded IPv4 boundaries into two IPv6 segments, two octets
    each. A ranged high octet needs a full-range low octet, or the joined
    values are not contiguous.
    */
    fn join_mixed(&self, embedded: &ParsedAddress, mask: Option<&Section>, asm: &mut Assembly) {
        const OCTET_MAX: u128 = 0xff;
        // validated with the outer address, so this cannot fail
        let Ok(inner) = ParsedIpAddress::new(embedded.clone()) else {
            return;
        };
        let bounds: Arc<Boundaries> = inner.boundaries();
        let octet = |s: &Section, k: usize| s.segments()[k].lower() as u128;

        for pair in 0..2 {
            let n: usize = asm.slots.len();
            let (hi, lo) = (pair * 2, pair * 2 + 1);
            let host_hi: (u128, u128) = (octet(&bounds.lower, hi), octet(&bounds.upper, hi));
            let host_lo: (u128, u128) = (octet(&bounds.lower, lo), octet(&bounds.upper, lo));

            let (masked_hi, masked_lo) = match mask {
                Some(m) => {
                    let mval: u128 = m.segments()[n].lower() as u128;
                    let r_hi: MaskResult = mask_range(host_hi.0, host_hi.1, mval >> 8, OCTET_MAX);
                    asm.record_mask(n, host_hi.0, host_hi.1, mval >> 8, &r_hi);
                    let r_lo: MaskResult = mask_range(host_lo.0, host_lo.1, mval & OCTET_MAX, OCTET_MAX);
                    asm.record_mask(n, host_lo.0, host_lo.1, mval & OCTET_MAX, &r_lo);
                    ((r_hi.lower, r_hi.upper), (r_lo.lower, r_lo.upper))
                }
                None => (host_hi, host_lo),
            };

            for (h, l) in [(host_hi, host_lo), (masked_hi, masked_lo)] {
                let joinable: bool = h.0 == h.1 || (l.0 == 0 && l.1 == OCTET_MAX);
                if !joinable && asm.mixed_error.is_none() {
                    debug!(index = n, "{LOG_MIXED_ERROR}");
                    asm.mixed_error = Some(AddressError::MixedInvalidRange(n));
                }
            }
            asm.slots.push(Slot {
                host: ordered(host_hi.0 << 8 | host_lo.0, host_hi.1 << 8 | host_lo.1),
                masked: ordered(masked_hi.0 << 8 | masked_lo.0, masked_hi.1 << 8 | masked_lo.1),
            });
        }
    }
}

/**
After a joined value is split into segments, a ranged segment must be
followed only by full-range segments up to the end of the expansion, or
the segments no longer describe the joined range. Returns the index of the
first offending segment.
*/
fn check_expanded_values(section: &Section, start: usize, end: usize) -> Option<usize> {
    let segs: &[Segment] = section.segments().get(start..=end)?;
    let mut last_was_range: bool = segs.first()?.is_multiple();
    for (k, seg) in segs.iter().enumerate().skip(1) {
        if last_was_range {
            if !seg.is_full_range() {
                return Some(start + k);
            }
        } else {
            last_was_range = seg.is_multiple();
        }
    }
    None
}

/* -------------------------------------------------------------------------- */
