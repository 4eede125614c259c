#![no_main]

use libfuzzer_sys::fuzz_target;
use votifier_client::protocol::greeting::{verify_greeting, Greeting};

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary banners must never panic, and must agree with the predicate
    let parsed = Greeting::parse(data);
    let text = String::from_utf8_lossy(data);
    assert_eq!(parsed.is_some(), verify_greeting(&text));
});
