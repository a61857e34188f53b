// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    section::Section,
    segment::Segment,
    structs::{network_segment_index, prefixed_segment_prefix_len},
    AddressError,
};

impl Section {
    /// Both operands must be the same family with the same segment count.
    pub(crate) fn check_compatible(&self, other: &Section) -> Result<(), AddressError> {
        if self.family() != other.family() {
            return Err(AddressError::Mismatch(self.family(), other.family()));
        }
        if self.segment_count() != other.segment_count() {
            return Err(AddressError::SizeMismatch(self.segment_count(), other.segment_count()));
        }
        Ok(())
    }

    #[inline]
    fn comparable(&self, other: &Section) -> bool {
        self.family() == other.family() && self.segment_count() == other.segment_count()
    }

    #[inline]
    fn segment_pairs<'a>(&'a self, other: &'a Section) -> impl Iterator<Item = (&'a Segment, &'a Segment)> {
        self.segments().iter().zip(other.segments())
    }

    /// Whether every value of `other` is a value of this section. Prefix lengths are ignored.
    pub fn contains(&self, other: &Section) -> bool {
        self.comparable(other) && self.segment_pairs(other).all(|(a, b)| a.contains(b))
    }

    /// Whether the two sections share at least one value.
    pub fn overlaps(&self, other: &Section) -> bool {
        self.comparable(other) && self.segment_pairs(other).all(|(a, b)| a.overlaps(b))
    }

    /// Value set equality. Unlike `==`, the prefix length is ignored.
    pub fn equal(&self, other: &Section) -> bool {
        self.comparable(other) && self.segment_pairs(other).all(|(a, b)| a.equals(b))
    }

    /**
    Whether the network part of this section, at its prefix length, contains
    the same bits of `other`. Unprefixed sections compare every bit.
    */
    pub fn prefix_contains(&self, other: &Section) -> bool {
        self.prefix_compare(other, Segment::contains, Segment::prefix_contains)
    }

    /// Like [Section::prefix_contains], for equality of the network bits.
    pub fn prefix_equal(&self, other: &Section) -> bool {
        self.prefix_compare(other, Segment::equals, Segment::prefix_equal)
    }

    fn prefix_compare<W, P>(&self, other: &Section, whole: W, partial: P) -> bool
    where
        W: Fn(&Segment, &Segment) -> bool,
        P: Fn(&Segment, &Segment, u8) -> bool,
    {
        if !self.comparable(other) {
            return false;
        }
        let bps: u8 = self.bits_per_segment();
        let (full, boundary) = match self.prefix_len() {
            None => (self.segment_count(), None),
            Some(p) => match network_segment_index(p, bps) {
                None => return true,
                Some(idx) => (idx, prefixed_segment_prefix_len(bps, p, idx).map(|sp| (idx, sp))),
            },
        };
        if let Some((idx, sp)) = boundary {
            if !partial(&self.segments()[idx], &other.segments()[idx], sp) {
                return false;
            }
        }
        self.segment_pairs(other).take(full).all(|(a, b)| whole(a, b))
    }

    /**
    Whether this section, masked segment by segment with the lower values
    of `mask`, is exactly `other`. A ranged segment only matches when its
    masked values are contiguous.
    */
    pub fn matches_with_mask(&self, other: &Section, mask: &Section) -> bool {
        if !self.comparable(other) || !self.comparable(mask) {
            return false;
        }
        self.segment_pairs(other)
            .zip(mask.segments())
            .all(|((seg, o), m)| seg.matches_with_mask(o.lower(), o.upper(), m.lower()))
    }

    /* ---------------------------------- */

    /**
    The values common to both sections, or `None` when they are disjoint.

    The result carries the larger of the two prefix lengths when both are
    prefixed, and no prefix otherwise. When one operand contains the other
    and already has that prefix length, the contained operand is returned
    unchanged.
    */
    pub fn intersect(&self, other: &Section) -> Result<Option<Section>, AddressError> {
        self.check_compatible(other)?;
        let pref: Option<u8> = match (self.prefix_len(), other.prefix_len()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };

        if other.contains(self) {
            if pref == self.prefix_len() {
                return Ok(Some(self.clone()));
            }
        } else if !self.is_multiple() {
            return Ok(None);
        }
        if self.contains(other) {
            if pref == other.prefix_len() {
                return Ok(Some(other.clone()));
            }
        } else if !other.is_multiple() {
            return Ok(None);
        }

        if !self.overlaps(other) {
            return Ok(None);
        }
        let segs: Vec<Segment> = self
            .segment_pairs(other)
            .map(|(a, b)| a.derive_new_range(a.lower().max(b.lower()), a.upper().min(b.upper()), None))
            .collect();
        Ok(Some(self.derive(segs, pref)))
    }

    /**
    The values of this section that are not in `other`, as a list of
    pairwise disjoint sections.

    Each segment position where this section extends below or above `other`
    contributes one section for that overhang. Earlier positions are narrowed
    to the intersection, later positions keep their original ranges. If this
    section is prefixed, each result gets the prefix length at which it is a
    block, but never less than this section's own.
    */
    pub fn subtract(&self, other: &Section) -> Result<Vec<Section>, AddressError> {
        self.check_compatible(other)?;
        if !self.is_multiple() {
            return Ok(match other.contains(self) {
                true => Vec::new(),
                false => vec![self.clone()],
            });
        }
        if !self.overlaps(other) {
            return Ok(vec![self.clone()]);
        }

        let mut intersections: Vec<Segment> = Vec::with_capacity(self.segment_count());
        let mut out: Vec<Section> = Vec::new();
        for (i, (seg, oseg)) in self.segment_pairs(other).enumerate() {
            if seg.lower() < oseg.lower() {
                out.push(self.diff_section(&intersections, i, seg.lower(), oseg.lower() - 1));
            }
            if seg.upper() > oseg.upper() {
                out.push(self.diff_section(&intersections, i, oseg.upper() + 1, seg.upper()));
            }
            intersections.push(seg.derive_new_range(
                seg.lower().max(oseg.lower()),
                seg.upper().min(oseg.upper()),
                None,
            ));
        }

        if let Some(own) = self.prefix_len() {
            out = out
                .into_iter()
                .map(|s| {
                    let block: u8 = s.min_prefix_len_for_block();
                    match block == s.bit_count() {
                        true => s,
                        false => s.set_prefix_len(block.max(own)),
                    }
                })
                .collect();
        }
        Ok(out)
    }

    /// Segments before `index` from `intersections`, `[lower, upper]` at `index`, the rest as is.
    fn diff_section(&self, intersections: &[Segment], index: usize, lower: u32, upper: u32) -> Section {
        let segs: Vec<Segment> = self
            .segments()
            .iter()
            .enumerate()
            .map(|(j, seg)| match j {
                j if j < index => intersections[j],
                j if j == index => seg.derive_new_range(lower, upper, None),
                _ => *seg,
            })
            .collect();
        self.derive(segs, None)
    }
}

/* -------------------------------------------------------------------------- */
