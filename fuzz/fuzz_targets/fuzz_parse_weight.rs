#![no_main]
use libfuzzer_sys::fuzz_target;
use scale_core::frame::{MIN_REPLY_CHARS, decode_reply, is_confirmation};
use scale_core::{WeightText, parse_weight};

fuzz_target!(|data: &[u8]| {
    let text = decode_reply(data);
    let weight = parse_weight(data);
    assert_eq!(is_confirmation(data), weight.is_available());
    match weight {
        WeightText::Value(w) => assert_eq!(w.chars().count() + 2, text.chars().count()),
        WeightText::Unavailable => assert!(text.chars().count() < MIN_REPLY_CHARS),
    }
});
