#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;
use votifier_client::core::codec::VoteFrameCodec;

fuzz_target!(|data: &[u8]| {
    // Fuzz frame decoding - test for panics on malformed headers and bodies
    let mut buf = BytesMut::from(data);
    let _ = VoteFrameCodec.decode(&mut buf);
});
