//! Fuzz target for decoding arbitrary bytes.
//!
//! Exercises the protocol dispatcher and the v2/v1 decoders with raw
//! input to find crashes, over-reads, or unbounded recursion. Invalid
//! input must always come back as an error; the decoder must NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use membridge_sbs::to_value;

fuzz_target!(|data: &[u8]| {
    let _ = to_value(data);
});
