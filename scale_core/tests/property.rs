use proptest::prelude::*;
use scale_core::frame::{MIN_REPLY_CHARS, REPLY_WINDOW, UNAVAILABLE, decode_reply, is_confirmation};
use scale_core::{WeightText, parse_weight};

// Printable ASCII weights framed by STX/ETX, as the scale sends them.
fn framed_weight() -> impl Strategy<Value = (String, Vec<u8>)> {
    "[0-9 .kg+-]{1,5}".prop_map(|w| {
        let mut bytes = vec![0x02];
        bytes.extend_from_slice(w.as_bytes());
        bytes.push(0x03);
        (w, bytes)
    })
}

proptest! {
    #[test]
    fn never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = parse_weight(&bytes);
        let _ = is_confirmation(&bytes);
    }

    #[test]
    fn weight_is_two_chars_shorter_than_the_trimmed_reply(bytes in proptest::collection::vec(any::<u8>(), 0..=REPLY_WINDOW)) {
        let text = decode_reply(&bytes);
        match parse_weight(&bytes) {
            WeightText::Value(w) => {
                prop_assert!(text.chars().count() >= MIN_REPLY_CHARS);
                prop_assert_eq!(w.chars().count() + 2, text.chars().count());
                prop_assert!(text.contains(w.as_str()));
            }
            WeightText::Unavailable => {
                prop_assert!(text.chars().count() < MIN_REPLY_CHARS);
            }
        }
    }

    #[test]
    fn confirmation_matches_availability(bytes in proptest::collection::vec(any::<u8>(), 0..=REPLY_WINDOW)) {
        prop_assert_eq!(is_confirmation(&bytes), parse_weight(&bytes).is_available());
    }

    #[test]
    fn framed_weights_lose_only_the_frame((weight, bytes) in framed_weight()) {
        // Surrounding whitespace inside the frame survives; only the frame is stripped.
        let parsed = parse_weight(&bytes);
        prop_assert_eq!(parsed.as_str(), weight.as_str());
    }

    #[test]
    fn unavailable_text_is_the_sentinel(bytes in proptest::collection::vec(0x20u8..0x7f, 0..MIN_REPLY_CHARS)) {
        let parsed = parse_weight(&bytes);
        prop_assert_eq!(parsed.as_str(), UNAVAILABLE);
    }
}
