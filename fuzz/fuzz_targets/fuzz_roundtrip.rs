//! Fuzz testing for encode/decode round-trips.
//!
//! Builds tuples from arbitrary structured input and checks that packing
//! then unpacking returns the original tuple, that the Key sequence view
//! agrees with it, and that byte order never contradicts element order.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use keypack::{pack, unpack, Element, Key, Time, MAX_OFFSET_SECS, MIN_OFFSET_SECS};

#[derive(Debug, Arbitrary)]
struct RoundtripInput {
    first: Vec<FuzzElement>,
    second: Vec<FuzzElement>,
}

#[derive(Debug, Arbitrary)]
enum FuzzElement {
    Null,
    Bool(bool),
    Integer(i64),
    WideInteger { magnitude: u64, negative: bool },
    Blob(Vec<u8>),
    Text(String),
    Time { millis: i32, quarter_hours: i8 },
    Uuid([u8; 16]),
}

impl From<FuzzElement> for Element {
    fn from(fe: FuzzElement) -> Self {
        match fe {
            FuzzElement::Null => Element::Null,
            FuzzElement::Bool(b) => Element::Bool(b),
            FuzzElement::Integer(v) => Element::Integer(v.into()),
            FuzzElement::WideInteger { magnitude, negative } => {
                let v = i128::from(magnitude);
                Element::Integer(if negative { -v } else { v })
            }
            FuzzElement::Blob(b) => Element::Blob(b),
            FuzzElement::Text(s) => Element::Text(s),
            FuzzElement::Time { millis, quarter_hours } => {
                let offset = i32::from(quarter_hours)
                    .clamp(MIN_OFFSET_SECS / 900, MAX_OFFSET_SECS / 900)
                    * 900;
                Element::Time(Time::new(millis.into(), offset).expect("offset is clamped"))
            }
            FuzzElement::Uuid(u) => Element::Uuid(u),
        }
    }
}

fuzz_target!(|input: RoundtripInput| {
    if input.first.len() > 32 || input.second.len() > 32 {
        return;
    }

    let a: Vec<Element> = input.first.into_iter().map(Into::into).collect();
    let b: Vec<Element> = input.second.into_iter().map(Into::into).collect();

    let packed = pack(b"fz", &a).expect("valid tuples encode");
    let decoded = unpack(b"fz", &packed)
        .expect("own encodings decode")
        .expect("prefix is preserved");
    assert_eq!(decoded, a);

    let key_a = Key::new(&a).unwrap();
    let key_b = Key::new(&b).unwrap();
    assert_eq!(key_a.count().unwrap(), a.len());
    assert_eq!(key_a.cmp_elements(&b).unwrap(), key_a.cmp(&key_b));

    // Component-wise tuple order must match byte order.
    assert_eq!(a.cmp(&b), key_a.cmp(&key_b));
});
