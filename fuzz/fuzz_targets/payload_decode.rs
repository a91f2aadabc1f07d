//! Fuzz target for `Message::decode`.
//!
//! Exercises the control-session-message TLV codec with:
//! - Malformed or truncated headers
//! - Type confusion between message ids and their expected parameter shapes
//! - Oversized or malformed TLV parameter lists
//! - Nested/repeated parameter groups exceeding expected cardinality
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use iap2_messages::Message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Attempt to decode arbitrary bytes as a control-session message.
    // This should never panic, only return Err for invalid data.
    let _ = Message::decode(data);
});
