//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the `DATA ... ENDATA` decoder and
//! checks that it never panics, that the history stays bounded, and that a
//! reset decoder behaves the same on the same input.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use firenode::telemetry::frame::{FrameDecoder, ReadingHistory, HISTORY_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let mut history = ReadingHistory::new();

    let first = decoder.feed(data, &mut history);
    assert!(history.len() <= HISTORY_LEN);
    assert!(history.len() <= first);

    decoder.reset();
    let mut again = ReadingHistory::new();
    let second = decoder.feed(data, &mut again);
    assert_eq!(first, second, "decoding must not depend on prior state after reset");
});
