//! Codec round-trips and rejection of corrupted frames.

use ogr_rs::cluster::{Message, WireError};
use ogr_rs::search::RulerState;
use ogr_rs::stdx::BitSet128;
use proptest::prelude::*;

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (any::<u32>(), any::<u32>())
            .prop_map(|(rank, best_len)| Message::Request { rank, best_len }),
        (any::<u32>(), any::<u64>(), any::<u64>(), any::<u64>(), any::<u64>(), 1u32..24, 0u32..128)
            .prop_map(|(best_len, rlo, rhi, ulo, uhi, marks_count, ruler_length)| {
                Message::Assignment {
                    best_len,
                    prefix: RulerState {
                        reversed_marks: BitSet128::from_words(rlo, rhi),
                        used_diffs: BitSet128::from_words(ulo, uhi),
                        marks_count,
                        ruler_length,
                    },
                }
            }),
        any::<u32>().prop_map(|best_len| Message::BoundUpdate { best_len }),
        Just(Message::Terminate),
        (any::<u32>(), proptest::collection::vec(any::<u32>(), 0..24))
            .prop_map(|(best_len, marks)| Message::FinalResult { best_len, marks }),
        (any::<u32>(), any::<u32>()).prop_map(|(round, value)| Message::Collective { round, value }),
    ]
}

proptest! {
    #[test]
    fn encode_decode_is_identity(msg in arb_message()) {
        let frame = msg.encode();
        prop_assert_eq!(Message::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn truncation_never_panics_and_never_parses_to_the_original(
        msg in arb_message(),
        cut in 1usize..8,
    ) {
        let frame = msg.encode();
        if frame.len() > cut {
            let truncated = &frame[..frame.len() - cut];
            match Message::decode(truncated) {
                // Every layout is length-exact, so truncation should
                // always be caught; if a future variant ever tolerates
                // it, the parse must still differ from the original.
                Ok(parsed) => prop_assert_ne!(parsed, msg),
                Err(WireError::Truncated { .. }) | Err(WireError::Empty) => {}
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn trailing_garbage_is_rejected(msg in arb_message(), extra in 1usize..4) {
        let mut frame = msg.encode();
        frame.extend(std::iter::repeat(0xAA).take(extra));
        match Message::decode(&frame) {
            Err(WireError::TrailingBytes { .. }) | Err(WireError::Truncated { .. }) => {}
            other => prop_assert!(false, "expected rejection, got {other:?}"),
        }
    }
}
