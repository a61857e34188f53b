// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/**
Outcome of applying a mask to an inclusive value range.

When `sequential` is false, the set `{v & mask : v in [lower, upper]}` is
not a single contiguous range, and `lower`/`upper` are merely the masked
endpoints of the input range.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaskResult {
    pub lower: u128,
    pub upper: u128,
    pub sequential: bool,
}

impl MaskResult {
    #[inline]
    fn naive(lower: u128, upper: u128, mask: u128, sequential: bool) -> Self {
        Self {
            lower: lower & mask,
            upper: upper & mask,
            sequential,
        }
    }

    #[inline]
    pub fn is_sequential(&self) -> bool {
        self.sequential
    }
}

/// Index of the highest set bit. `x` must be nonzero.
#[inline]
fn high_bit(x: u128) -> u32 {
    debug_assert!(x != 0);
    127 - x.leading_zeros()
}

/// All ones in bits `0..=bit`.
#[inline]
fn ones_through(bit: u32) -> u128 {
    if bit >= 127 {
        u128::MAX
    } else {
        (1u128 << (bit + 1)) - 1
    }
}

/**
AND `mask` into every value of `[lower, upper]` and report the resulting
range, together with whether the masked values form a contiguous range.

`max_value` is the all-ones value for the bit width the values live in;
mask bits above it are ignored.

Let `p` be the highest bit in which `lower` and `upper` differ. Bits above
`p` are identical throughout the range, so masking them is exact. Below
that, only the mask bits at or under `p` matter; let `q` be the highest of
them.
- no mask bits at or under `p`: every value collapses to one result
- `q == p`: the result is contiguous only when all mask bits below `q`
  are set, in which case the masked endpoints are exact
- `q < p`: values wrap around the `q + 1` low bits, so the result is
  contiguous only when those bits are all kept and the range is wide
  enough to cover every combination of them
*/
pub fn mask_range(lower: u128, upper: u128, mask: u128, max_value: u128) -> MaskResult {
    debug_assert!(lower <= upper);
    let mask: u128 = mask & max_value;
    if lower == upper || mask == 0 || mask == max_value {
        return MaskResult::naive(lower, upper, mask, true);
    }

    let p: u32 = high_bit(lower ^ upper);
    let varying_mask: u128 = mask & ones_through(p);
    if varying_mask == 0 {
        return MaskResult::naive(lower, upper, mask, true);
    }

    let q: u32 = high_bit(varying_mask);
    let below_q: u128 = (1u128 << q) - 1;
    let low_bits_kept: bool = mask & below_q == below_q;

    if q == p {
        return MaskResult::naive(lower, upper, mask, low_bits_kept);
    }

    // q < p, so q + 1 <= 127 and the shift is safe
    let block: u128 = (1u128 << (q + 1)) - 1;
    if low_bits_kept && upper - lower >= block {
        let fixed: u128 = lower & mask & !block;
        return MaskResult {
            lower: fixed,
            upper: fixed | block,
            sequential: true,
        };
    }
    MaskResult::naive(lower, upper, mask, false)
}

/**
OR `mask` into every value of `[lower, upper]`, with the same contiguity
contract as [mask_range].

Within the bit width, `v | m == !(!v & !m)`, so this is [mask_range] over
the complemented range with the complemented mask, complemented back.
*/
pub fn bitwise_or_range(lower: u128, upper: u128, mask: u128, max_value: u128) -> MaskResult {
    debug_assert!(lower <= upper);
    let inverted: MaskResult = mask_range(
        max_value ^ upper,
        max_value ^ lower,
        max_value ^ (mask & max_value),
        max_value,
    );
    MaskResult {
        lower: max_value ^ inverted.upper,
        upper: max_value ^ inverted.lower,
        sequential: inverted.sequential,
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const MAX8: u128 = 0xff;
    const MAX16: u128 = 0xffff;

    /// Brute force reference: masked values form one contiguous range.
    fn brute(lower: u128, upper: u128, mask: u128, or: bool) -> (u128, u128, bool) {
        let mut vals: Vec<u128> = (lower..=upper)
            .map(|v| if or { v | mask } else { v & mask })
            .collect();
        vals.sort_unstable();
        vals.dedup();
        let lo: u128 = vals[0];
        let hi: u128 = vals[vals.len() - 1];
        (lo, hi, (hi - lo + 1) as usize == vals.len())
    }

    #[test]
    fn test_mask_not_sequential() {
        // {10..=20} & 0xf0 is exactly {0, 16}
        let r: MaskResult = mask_range(10, 20, 0xf0, MAX8);
        assert!(!r.is_sequential());
        assert_eq!((r.lower, r.upper), (0, 16));
    }

    #[test]
    fn test_mask_low_bits() {
        let r: MaskResult = mask_range(0, 255, 0x0f, MAX8);
        assert!(r.sequential);
        assert_eq!((r.lower, r.upper), (0, 15));

        // wraps around: 6..=9 & 3 covers 2,3,0,1
        let r: MaskResult = mask_range(6, 9, 3, MAX8);
        assert!(r.sequential);
        assert_eq!((r.lower, r.upper), (0, 3));

        // 14..=17 & 0x0f is {14, 15, 0, 1}
        assert!(!mask_range(14, 17, 0x0f, MAX8).sequential);
    }

    #[test]
    fn test_mask_trivial() {
        assert_eq!(mask_range(7, 7, 0x0c, MAX8), MaskResult { lower: 4, upper: 4, sequential: true });
        assert_eq!(mask_range(3, 200, 0, MAX8), MaskResult { lower: 0, upper: 0, sequential: true });
        assert_eq!(mask_range(3, 200, MAX8, MAX8), MaskResult { lower: 3, upper: 200, sequential: true });
        // mask bits above the varying bits only
        assert_eq!(mask_range(0x10, 0x1f, 0xf0, MAX8), MaskResult { lower: 0x10, upper: 0x10, sequential: true });
    }

    #[test]
    fn test_mask_full_width() {
        // network bits alone select every 2^64th value
        let r: MaskResult = mask_range(0, u128::MAX, u128::MAX << 64, u128::MAX);
        assert!(!r.sequential);
        assert_eq!((r.lower, r.upper), (0, u128::MAX << 64));
        let r: MaskResult = mask_range(0, u128::MAX, u64::MAX as u128, u128::MAX);
        assert!(r.sequential);
        assert_eq!((r.lower, r.upper), (0, u64::MAX as u128));
    }

    #[test]
    fn test_or_range() {
        let r: MaskResult = bitwise_or_range(0, 255, 0xf0, MAX8);
        assert!(r.sequential);
        assert_eq!((r.lower, r.upper), (0xf0, 0xff));
        // {8..=17} | 0x0f is {15, 31}
        let r: MaskResult = bitwise_or_range(8, 17, 0x0f, MAX8);
        assert!(!r.sequential);
        assert_eq!((r.lower, r.upper), (15, 31));
    }

    #[test]
    fn test_against_brute_force() {
        for mask in [0x00, 0x01, 0x0f, 0x3c, 0x55, 0x80, 0xc3, 0xf0, 0xfe] {
            for lower in (0..=255u128).step_by(7) {
                for upper in (lower..=255u128).step_by(11) {
                    let (lo, hi, seq) = brute(lower, upper, mask, false);
                    let r: MaskResult = mask_range(lower, upper, mask, MAX8);
                    assert_eq!(r.sequential, seq, "and {lower}-{upper} {mask:#x}");
                    if seq {
                        assert_eq!((r.lower, r.upper), (lo, hi), "and {lower}-{upper} {mask:#x}");
                    }
                    let (lo, hi, seq) = brute(lower, upper, mask, true);
                    let r: MaskResult = bitwise_or_range(lower, upper, mask, MAX8);
                    assert_eq!(r.sequential, seq, "or {lower}-{upper} {mask:#x}");
                    if seq {
                        assert_eq!((r.lower, r.upper), (lo, hi), "or {lower}-{upper} {mask:#x}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_wide_segment_values() {
        // {0x100..=0x2ff} & 0xff00 is {0x100, 0x200}
        let r: MaskResult = mask_range(0x0100, 0x02ff, 0xff00, MAX16);
        assert!(!r.sequential);
        assert_eq!((r.lower, r.upper), (0x0100, 0x0200));
        let r: MaskResult = mask_range(0x0100, 0x02ff, 0x00ff, MAX16);
        assert!(r.sequential);
        assert_eq!((r.lower, r.upper), (0, 0xff));
    }
}
