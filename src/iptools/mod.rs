// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IP address sections: per-segment value ranges with an optional prefix
//! length, plus the masking, prefix, set and spanning algebra over them.

mod addresses;
mod collapsing;
mod masking;
mod memo;
mod parsed;
mod prefix;
mod section;
mod segment;
mod setops;
mod strings;
mod structs;

use std::{error, fmt};
use strings::*;

pub use collapsing::{merge_to_prefix_blocks, merge_to_sequential_blocks};
pub use masking::{bitwise_or_range, mask_range, MaskResult};
pub use parsed::{Boundaries, ParsedAddress, ParsedIpAddress, ParsedSegment, Qualifier, SectionResult};
pub use section::Section;
pub use segment::Segment;
pub use structs::IpFam;

pub(crate) const IPV4_BITS: u8 = 32;
pub(crate) const IPV6_BITS: u8 = 128;
pub(crate) const IPV4_SEGMENT_BITS: u8 = 8;
pub(crate) const IPV6_SEGMENT_BITS: u8 = 16;
pub(crate) const IPV4_SEGMENT_COUNT: usize = 4;
pub(crate) const IPV6_SEGMENT_COUNT: usize = 8;
pub(crate) const IPV6_MIXED_SEGMENT_COUNT: usize = 6; // v6 segments preceding an embedded v4 address

#[rustfmt::skip]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// masking produced a set of values that is not a single contiguous range
    IncompatibleRange { index: usize, lower: u128, upper: u128, mask: u128 },
    /// operands have a different number of segments
    SizeMismatch(usize, usize),
    /// operands are not the same IP family (v4 vs v6).
    Mismatch(IpFam, IpFam),
    ValueTooLarge      { value: u128, bits: u8 },
    TooManySegments    { count: usize, fam: IpFam },
    InvalidSegment     { lower: u32, upper: u32, max: u32 },
    /// joined or compressed segments expand into a non-contiguous set
    InvalidJoinedRange(usize),
    /// embedded IPv4 segments cannot be joined into IPv6 segments
    MixedInvalidRange(usize),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::IncompatibleRange { index, lower, upper, mask } => {
                write!(f, "{ERR_INCOMPATIBLE} at segment {index}: {lower:#x}-{upper:#x} mask {mask:#x}")
            }
            AddressError::SizeMismatch(a, b) => {
                write!(f, "{ERR_SIZE_MISMATCH}: {a} vs {b}")
            }
            AddressError::Mismatch(a, b) => {
                write!(f, "{ERR_MISMATCH}: {a} - {b}")
            }
            AddressError::ValueTooLarge { value, bits } => {
                write!(f, "{ERR_VALUE_TOOLARGE} {bits} bits: {value:#x}")
            }
            AddressError::TooManySegments { count, fam } => {
                write!(f, "{ERR_SEGMENT_COUNT} {fam} ({count} > {})", fam.segment_count())
            }
            AddressError::InvalidSegment { lower, upper, max } => {
                write!(f, "{ERR_SEGMENT_RANGE}: {lower}-{upper} (max {max})")
            }
            AddressError::InvalidJoinedRange(idx) => {
                write!(f, "{ERR_JOINED_RANGE} at segment {idx}")
            }
            AddressError::MixedInvalidRange(idx) => {
                write!(f, "{ERR_MIXED_RANGE} at segment {idx}")
            }
        }
    }
}

impl error::Error for AddressError {}
