//! Fuzz target for `LinkFrame::decode`.
//!
//! Exercises link-layer frame decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in length/checksum calculations
//! - Buffer over-reads
//! - Malformed headers that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use iap2_proto::LinkFrame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary bytes as a link frame.
    // This should never panic, only return Err for invalid data.
    let _ = LinkFrame::decode(data);
});
