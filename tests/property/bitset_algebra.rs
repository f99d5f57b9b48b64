//! The two-limb set must behave exactly like a `u128`.

use ogr_rs::stdx::BitSet128;
use proptest::prelude::*;

fn model(b: BitSet128) -> u128 {
    let (lo, hi) = b.to_words();
    (hi as u128) << 64 | lo as u128
}

proptest! {
    #[test]
    fn shift_matches_u128(lo: u64, hi: u64, n in 0u32..200) {
        let b = BitSet128::from_words(lo, hi);
        let expected = if n >= 128 { 0 } else { model(b) << n };
        prop_assert_eq!(model(b.shl(n)), expected);
    }

    #[test]
    fn bit_ops_match_u128(a_lo: u64, a_hi: u64, b_lo: u64, b_hi: u64) {
        let a = BitSet128::from_words(a_lo, a_hi);
        let b = BitSet128::from_words(b_lo, b_hi);
        prop_assert_eq!(model(a & b), model(a) & model(b));
        prop_assert_eq!(model(a | b), model(a) | model(b));
        prop_assert_eq!(model(a ^ b), model(a) ^ model(b));
        prop_assert_eq!(a.intersects(b), model(a) & model(b) != 0);
        prop_assert_eq!(a.count_ones(), model(a).count_ones());
    }

    #[test]
    fn set_then_test(pos in 0u32..128, lo: u64, hi: u64) {
        let mut b = BitSet128::from_words(lo, hi);
        b.set(pos);
        prop_assert!(b.test(pos));
        prop_assert_eq!(model(b), model(BitSet128::from_words(lo, hi)) | (1u128 << pos));
    }

    #[test]
    fn extremal_bits_match_u128(lo: u64, hi: u64) {
        let b = BitSet128::from_words(lo, hi);
        let m = model(b);
        let lowest = (m != 0).then(|| m.trailing_zeros());
        let highest = (m != 0).then(|| 127 - m.leading_zeros());
        prop_assert_eq!(b.lowest_set(), lowest);
        prop_assert_eq!(b.highest_set(), highest);
    }
}
