// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

// segment.rs, section.rs
pub(crate) static DASH: &str = "-";
pub(crate) static SLASH: &str = "/";

// mod.rs
pub(crate) static ERR_INCOMPATIBLE: &str = "masked range is not sequential";
pub(crate) static ERR_SIZE_MISMATCH: &str = "segment count mismatch";
pub(crate) static ERR_MISMATCH: &str = "cannot mix IPv4 and IPv6 sections";
pub(crate) static ERR_VALUE_TOOLARGE: &str = "value does not fit in";
pub(crate) static ERR_SEGMENT_COUNT: &str = "too many segments for";
pub(crate) static ERR_SEGMENT_RANGE: &str = "invalid segment range";
pub(crate) static ERR_JOINED_RANGE: &str = "joined segments do not form a contiguous range";
pub(crate) static ERR_MIXED_RANGE: &str = "embedded IPv4 range cannot be joined into IPv6 segments";

// segment.rs
pub(crate) static PANIC_NAUGHTY: &str = "Naughty programmer! Segment lower cannot be larger than upper!";

// prefix.rs, parsed.rs
pub(crate) static LOG_MASK_MISMATCH: &str = "mask produces a non-sequential range";

// parsed.rs
pub(crate) static LOG_EXPANDED: &str = "expanded joined segment";
pub(crate) static LOG_JOIN_ERROR: &str = "expanded segments are not contiguous";
pub(crate) static LOG_MIXED_ERROR: &str = "embedded IPv4 segments are not joinable";

// collapsing.rs
pub(crate) static LOG_MERGED: &str = "merged sections";
pub(crate) static LOG_SPANNED: &str = "spanned section with blocks";
pub(crate) static LOG_MERGE_MISMATCH: &str = "cannot merge sections of differing shape";
