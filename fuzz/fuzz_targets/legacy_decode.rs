//! Fuzz target for the legacy v1 decoder.
//!
//! Pins the protocol byte to the legacy marker so every input reaches the
//! v1 grammar instead of being rejected at dispatch.

#![no_main]

use libfuzzer_sys::fuzz_target;
use membridge_sbs::{tag, to_value};

fuzz_target!(|data: &[u8]| {
    let mut buffer = Vec::with_capacity(data.len() + 1);
    buffer.push(tag::PROTOCOL_V1);
    buffer.extend_from_slice(data);
    let _ = to_value(&buffer);
});
