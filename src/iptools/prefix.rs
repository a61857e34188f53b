// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prefix length algebra: prefix blocks, host/network zeroing, network and
//! host sub-sections, prefix length changes and whole-section masking.

use super::{
    masking::{bitwise_or_range, mask_range, MaskResult},
    section::Section,
    segment::Segment,
    strings::*,
    structs::{
        host_segment_index, network_segment_index, prefixed_segment_prefix_len, segment_host_mask,
        segment_network_mask,
    },
    AddressError,
};
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MaskOp {
    And,
    Or,
}

impl Section {
    /// The prefix block(s) at the section's prefix length; unprefixed sections are returned as is.
    pub fn to_prefix_block(&self) -> Section {
        match self.prefix_len() {
            Some(p) => self.to_prefix_block_len(p),
            None => self.clone(),
        }
    }

    /**
    Keep the first `prefix` bits of every segment range and let all bits
    after them span their full range. The boundary segment `[lo, hi]`
    becomes `[lo & mask, hi | !mask]`, later segments become full range.
    */
    pub fn to_prefix_block_len(&self, prefix: u8) -> Section {
        let prefix: u8 = prefix.min(self.bit_count());
        if self.prefix_len() == Some(prefix) && self.contains_prefix_block(prefix) {
            return self.clone();
        }
        let bps: u8 = self.bits_per_segment();
        let start: usize = network_segment_index(prefix, bps).unwrap_or(0);
        let segs: Vec<Segment> = self
            .segments()
            .iter()
            .enumerate()
            .map(|(i, seg)| match prefixed_segment_prefix_len(bps, prefix, i) {
                Some(sp) if i >= start => seg.to_prefixed_network(sp),
                _ => *seg,
            })
            .collect();
        self.derive(segs, Some(prefix))
    }

    /* ---------------------------------- */

    /**
    Zero every host bit. Unprefixed sections become all zeros with prefix 0.

    Fails with [AddressError::IncompatibleRange] when the zeroed values of
    a ranged segment are not contiguous, unless the section already holds a
    zero host of a single network, in which case that lower address is the
    answer.
    */
    pub fn to_zero_host(&self) -> Result<Section, AddressError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let Some(p) = self.prefix_len() else {
            return Ok(self.zeros(Some(0)));
        };
        if self.is_zero_host_len(p) {
            return Ok(self.clone());
        }
        if self.includes_zero_host() && self.is_single_network() {
            return Ok(self.lower());
        }
        self.network_masked(p, Some(p))
    }

    /// Zero the host bits after `prefix`, keeping the section's own prefix length.
    pub fn to_zero_host_len(&self, prefix: u8) -> Result<Section, AddressError> {
        if self.prefix_len() == Some(prefix) {
            return self.to_zero_host();
        }
        self.network_masked(prefix, self.prefix_len())
    }

    /**
    Set every host bit. Unprefixed sections become all ones with prefix 0.
    Fails the same way as [Section::to_zero_host].
    */
    pub fn to_max_host(&self) -> Result<Section, AddressError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let Some(p) = self.prefix_len() else {
            let ones: Vec<Segment> = self
                .segments()
                .iter()
                .map(|s| s.derive_new_range(s.max_value(), s.max_value(), None))
                .collect();
            return Ok(self.derive(ones, Some(0)));
        };
        if self.is_max_host_len(p) {
            return Ok(self.clone());
        }
        if self.includes_max_host() && self.is_single_network() {
            return Ok(self.upper());
        }
        self.host_ored(p, Some(p))
    }

    /// Set the host bits after `prefix`, keeping the section's own prefix length.
    pub fn to_max_host_len(&self, prefix: u8) -> Result<Section, AddressError> {
        if self.prefix_len() == Some(prefix) {
            return self.to_max_host();
        }
        self.host_ored(prefix, self.prefix_len())
    }

    /**
    Zero every network bit, keeping the prefix length. Unprefixed sections
    become all zeros.
    */
    pub fn to_zero_network(&self) -> Result<Section, AddressError> {
        let Some(p) = self.prefix_len() else {
            return Ok(self.zeros(None));
        };
        let bps: u8 = self.bits_per_segment();
        self.masked_segments(0, Some(p), MaskOp::And, |i| {
            segment_host_mask(bps, prefixed_segment_prefix_len(bps, p, i))
        })
    }

    fn zeros(&self, prefix: Option<u8>) -> Section {
        let segs: Vec<Segment> = self.segments().iter().map(|s| s.derive_new_range(0, 0, None)).collect();
        self.derive(segs, prefix)
    }

    /// AND with the network mask of `mask_prefix`.
    fn network_masked(&self, mask_prefix: u8, prefix: Option<u8>) -> Result<Section, AddressError> {
        let bps: u8 = self.bits_per_segment();
        let mask_prefix: u8 = mask_prefix.min(self.bit_count());
        let start: usize = network_segment_index(mask_prefix, bps).unwrap_or(0);
        self.masked_segments(start, prefix, MaskOp::And, |i| {
            segment_network_mask(bps, prefixed_segment_prefix_len(bps, mask_prefix, i))
        })
    }

    /// OR with the host mask of `mask_prefix`.
    fn host_ored(&self, mask_prefix: u8, prefix: Option<u8>) -> Result<Section, AddressError> {
        let bps: u8 = self.bits_per_segment();
        let mask_prefix: u8 = mask_prefix.min(self.bit_count());
        let start: usize = network_segment_index(mask_prefix, bps).unwrap_or(0);
        self.masked_segments(start, prefix, MaskOp::Or, |i| {
            segment_host_mask(bps, prefixed_segment_prefix_len(bps, mask_prefix, i))
        })
    }

    /**
    Apply a per-segment mask to segments `start..`, failing on the first
    segment whose masked range is not contiguous.
    */
    fn masked_segments<F>(&self, start: usize, prefix: Option<u8>, op: MaskOp, mask_at: F) -> Result<Section, AddressError>
    where
        F: Fn(usize) -> u32,
    {
        let mut segs: Vec<Segment> = self.segments().to_vec();
        for (i, seg) in segs.iter_mut().enumerate().skip(start) {
            let mask: u32 = mask_at(i);
            let (lower, upper, max) = (seg.lower() as u128, seg.upper() as u128, seg.max_value() as u128);
            let r: MaskResult = match op {
                MaskOp::And => mask_range(lower, upper, mask as u128, max),
                MaskOp::Or => bitwise_or_range(lower, upper, mask as u128, max),
            };
            if !r.sequential {
                debug!(index = i, lower, upper, mask, op = ?op, "{LOG_MASK_MISMATCH}");
                return Err(AddressError::IncompatibleRange {
                    index: i,
                    lower,
                    upper,
                    mask: mask as u128,
                });
            }
            *seg = seg.derive_new_range(r.lower as u32, r.upper as u32, None);
        }
        Ok(self.derive(segs, prefix))
    }

    /* ---------------------------------- */

    /// [Section::network_section_len] at the prefix length, or the full bit count.
    pub fn network_section(&self) -> Section {
        self.network_section_len(self.prefix_len().unwrap_or(self.bit_count()))
    }

    /**
    The leading segments holding the first `prefix` bits, with the boundary
    segment widened to its block. The result carries prefix `prefix`.
    */
    pub fn network_section_len(&self, prefix: u8) -> Section {
        let bps: u8 = self.bits_per_segment();
        let prefix: u8 = prefix.min(self.bit_count());
        let Some(idx) = network_segment_index(prefix, bps) else {
            return self.derive(Vec::new(), Some(0));
        };
        let mut segs: Vec<Segment> = self.segments()[..=idx].to_vec();
        let sp: u8 = prefixed_segment_prefix_len(bps, prefix, idx).unwrap_or(bps);
        segs[idx] = segs[idx].to_prefixed_network(sp);
        self.derive(segs, Some(prefix))
    }

    /// [Section::host_section_len] at the prefix length, or 0.
    pub fn host_section(&self) -> Section {
        self.host_section_len(self.prefix_len().unwrap_or(0))
    }

    /**
    The trailing segments holding the bits after the first `prefix` bits.
    Network bits of the first segment are masked off, and the result's
    prefix is the number of network bits left in that segment.
    */
    pub fn host_section_len(&self, prefix: u8) -> Section {
        let bps: u8 = self.bits_per_segment();
        let prefix: u8 = prefix.min(self.bit_count());
        let idx: usize = host_segment_index(prefix, bps);
        if idx >= self.segment_count() {
            return self.derive(Vec::new(), Some(0));
        }
        let sp: u8 = prefixed_segment_prefix_len(bps, prefix, idx).unwrap_or(0);
        let mut segs: Vec<Segment> = self.segments()[idx..].to_vec();
        let first: Segment = segs[0];
        let host: u32 = segment_host_mask(bps, Some(sp));
        let r: MaskResult = mask_range(
            first.lower() as u128,
            first.upper() as u128,
            host as u128,
            first.max_value() as u128,
        );
        // non-contiguous host values are covered by the whole host range
        let (lo, hi) = match r.sequential {
            true => (r.lower as u32, r.upper as u32),
            false => (0, host),
        };
        segs[0] = first.derive_new_range(lo, hi, None);
        self.derive(segs, Some(sp))
    }

    /* ---------------------------------- */

    /// Same values, new prefix length (clamped to the bit count).
    pub fn set_prefix_len(&self, prefix: u8) -> Section {
        self.derive(self.segments().to_vec(), Some(prefix))
    }

    /**
    New prefix length, zeroing the bits between the old and the new prefix
    length. Fails like [Section::to_zero_host] when a ranged segment cannot
    be zeroed contiguously.
    */
    pub fn set_prefix_len_zeroed(&self, prefix: u8) -> Result<Section, AddressError> {
        let prefix: u8 = prefix.min(self.bit_count());
        let old: u8 = match self.prefix_len() {
            Some(old) if old != prefix => old,
            _ => return Ok(self.set_prefix_len(prefix)),
        };
        let bps: u8 = self.bits_per_segment();
        let (min, max) = (old.min(prefix), old.max(prefix));
        self.masked_segments(0, Some(prefix), MaskOp::And, |i| {
            match prefixed_segment_prefix_len(bps, min, i) {
                None => segment_network_mask(bps, None),
                Some(min_sp) => {
                    let keep_net: u32 = segment_network_mask(bps, Some(min_sp));
                    match prefixed_segment_prefix_len(bps, max, i) {
                        None => keep_net,
                        Some(max_sp) => keep_net | segment_host_mask(bps, Some(max_sp)),
                    }
                }
            }
        })
    }

    /**
    Move the prefix length by `adjustment` bits, clamping at both ends. An
    unprefixed section counts from zero for positive adjustments and from
    the bit count for negative ones.
    */
    pub fn adjust_prefix_len(&self, adjustment: i16) -> Section {
        self.set_prefix_len(self.adjusted_prefix(adjustment))
    }

    pub fn adjust_prefix_len_zeroed(&self, adjustment: i16) -> Result<Section, AddressError> {
        self.set_prefix_len_zeroed(self.adjusted_prefix(adjustment))
    }

    fn adjusted_prefix(&self, adjustment: i16) -> u8 {
        let bits: i16 = self.bit_count() as i16;
        let target: i16 = match self.prefix_len() {
            Some(p) => (p as i16).saturating_add(adjustment),
            None if adjustment > 0 => adjustment,
            None => bits.saturating_add(adjustment),
        };
        target.clamp(0, bits) as u8
    }

    pub fn without_prefix_len(&self) -> Section {
        self.derive(self.segments().to_vec(), None)
    }

    /// The section with the prefix length of its single block, if it is one.
    pub fn assign_prefix_for_single_block(&self) -> Option<Section> {
        self.prefix_len_for_single_block().map(|p| self.set_prefix_len(p))
    }

    /// The section with the smallest prefix length at which it is a union of blocks.
    pub fn assign_min_prefix_for_block(&self) -> Section {
        self.set_prefix_len(self.min_prefix_len_for_block())
    }

    /* ---------------------------------- */

    /**
    AND the lower value of `mask` into every segment. The result has no
    prefix length. `mask` must have the same family and segment count.
    */
    pub fn mask(&self, mask: &Section) -> Result<Section, AddressError> {
        self.check_compatible(mask)?;
        self.masked_segments(0, None, MaskOp::And, |i| mask.segments()[i].lower())
    }

    /// OR the lower value of `mask` into every segment, like [Section::mask].
    pub fn bitwise_or(&self, mask: &Section) -> Result<Section, AddressError> {
        self.check_compatible(mask)?;
        self.masked_segments(0, None, MaskOp::Or, |i| mask.segments()[i].lower())
    }
}

/* -------------------------------------------------------------------------- */
