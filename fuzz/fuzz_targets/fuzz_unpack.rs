//! Fuzz testing for the key decoder.
//!
//! Feeds arbitrary byte sequences through every decode entry point to
//! ensure malformed input is handled gracefully without panicking, and
//! that anything that does decode re-encodes to an equivalent tuple.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use keypack::{decode_offsets, pack, unpack, unpacks, Key};

#[derive(Debug, Arbitrary)]
struct UnpackInput {
    prefix: Vec<u8>,
    data: Vec<u8>,
}

fuzz_target!(|input: UnpackInput| {
    if input.prefix.len() > 16 || input.data.len() > 4096 {
        return;
    }

    if let Ok(Some(tuple)) = unpack(&input.prefix, &input.data) {
        let repacked = pack(&input.prefix, &tuple).expect("decoded tuples must re-encode");
        let reparsed = unpack(&input.prefix, &repacked)
            .expect("re-encoded tuples must decode")
            .expect("prefix is preserved");
        assert_eq!(reparsed, tuple);
    }

    let _ = unpacks(&input.prefix, &input.data);
    let _ = decode_offsets(&input.data);

    if let Some(key) = Key::from_raw(&input.prefix, &input.data) {
        let _ = key.count();
        let _ = key.get(0);
        let _ = key.get(-1);
        for elem in key.iter() {
            let _ = elem;
        }
        assert_eq!(Key::from_hex(&key.to_hex()).unwrap(), key);
    }
});
