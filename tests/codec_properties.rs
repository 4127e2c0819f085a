//! Property tests for the codec invariants: round-trips, order
//! preservation, skip fidelity, hashing, prefix filtering, varint
//! minimality and the offset table contract. Anything that fails here is
//! an on-disk compatibility break, not a style problem.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use proptest::prelude::*;

use keypack::io::{Reader, Writer};
use keypack::varint::{read_varint, varint_len, write_varint};
use keypack::{
    decode_offsets, encode_offsets, pack, pack_int, packs, unpack, unpacks, Element, Key, Time,
};

/// Millisecond bound that keeps the shifted composite well inside u64.
const TIME_MILLIS_BOUND: i64 = 1 << 50;

fn arb_time() -> BoxedStrategy<Time> {
    (
        -TIME_MILLIS_BOUND..TIME_MILLIS_BOUND,
        -31i32..=32,
    )
        .prop_map(|(millis, quarter_hours)| Time::new(millis, quarter_hours * 900).unwrap())
        .boxed()
}

fn arb_integer() -> BoxedStrategy<i128> {
    (any::<u64>(), any::<bool>())
        .prop_map(|(magnitude, negative)| {
            let v = i128::from(magnitude);
            if negative {
                -v
            } else {
                v
            }
        })
        .boxed()
}

fn arb_element() -> BoxedStrategy<Element> {
    prop_oneof![
        1 => Just(Element::Null),
        2 => any::<bool>().prop_map(Element::Bool),
        5 => arb_integer().prop_map(Element::Integer),
        4 => proptest::collection::vec(any::<u8>(), 0..40).prop_map(Element::Blob),
        4 => proptest::collection::vec(any::<char>(), 0..12)
            .prop_map(|chars| Element::Text(chars.into_iter().collect())),
        3 => arb_time().prop_map(Element::Time),
        2 => any::<[u8; 16]>().prop_map(Element::Uuid),
    ]
    .boxed()
}

fn arb_tuple() -> BoxedStrategy<Vec<Element>> {
    proptest::collection::vec(arb_element(), 0..8).boxed()
}

/// A pair of elements guaranteed to share a kind signature.
fn arb_same_kind_pair() -> BoxedStrategy<(Element, Element)> {
    prop_oneof![
        (any::<bool>(), any::<bool>())
            .prop_map(|(a, b)| (Element::Bool(a), Element::Bool(b))),
        (arb_integer(), arb_integer())
            .prop_map(|(a, b)| (Element::Integer(a), Element::Integer(b))),
        (
            proptest::collection::vec(any::<u8>(), 0..24),
            proptest::collection::vec(any::<u8>(), 0..24)
        )
            .prop_map(|(a, b)| (Element::Blob(a), Element::Blob(b))),
        (
            proptest::collection::vec(any::<char>(), 0..8),
            proptest::collection::vec(any::<char>(), 0..8)
        )
            .prop_map(|(a, b)| {
                (
                    Element::Text(a.into_iter().collect()),
                    Element::Text(b.into_iter().collect()),
                )
            }),
        (arb_time(), arb_time()).prop_map(|(a, b)| (Element::Time(a), Element::Time(b))),
        (any::<[u8; 16]>(), any::<[u8; 16]>())
            .prop_map(|(a, b)| (Element::Uuid(a), Element::Uuid(b))),
    ]
    .boxed()
}

fn hash_of(key: &Key) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1024))]

    #[test]
    fn element_roundtrip(elem in arb_element()) {
        let packed = pack(b"", &[elem.clone()]).unwrap();
        let decoded = unpack(b"", &packed).unwrap().expect("empty prefix always matches");
        prop_assert_eq!(decoded, vec![elem]);
    }

    #[test]
    fn tuple_roundtrip(tuple in arb_tuple()) {
        let packed = pack(b"pfx", &tuple).unwrap();
        let decoded = unpack(b"pfx", &packed).unwrap().expect("prefix matches");
        prop_assert_eq!(decoded, tuple);
    }

    #[test]
    fn batch_roundtrip(batch in proptest::collection::vec(
        proptest::collection::vec(arb_element(), 1..5), 0..5))
    {
        let packed = packs(b"b", &batch).unwrap();
        let decoded = unpacks(b"b", &packed).unwrap().expect("prefix matches");
        prop_assert_eq!(decoded, batch);
    }

    #[test]
    fn order_is_preserved_for_same_signature_tuples(
        pairs in proptest::collection::vec(arb_same_kind_pair(), 1..5))
    {
        let a: Vec<Element> = pairs.iter().map(|(x, _)| x.clone()).collect();
        let b: Vec<Element> = pairs.iter().map(|(_, y)| y.clone()).collect();
        let pa = pack(b"", &a).unwrap();
        let pb = pack(b"", &b).unwrap();
        prop_assert_eq!(a.cmp(&b), pa.cmp(&pb), "tuples {:?} vs {:?}", a, b);
    }

    #[test]
    fn cross_kind_order_is_decided_by_the_kind_byte(
        x in arb_element(), y in arb_element())
    {
        let px = pack(b"", &[x]).unwrap();
        let py = pack(b"", &[y]).unwrap();
        // Same kind byte means same kind here; otherwise the first byte
        // alone must settle the comparison.
        if px[0] != py[0] {
            prop_assert_eq!(px < py, px[0] < py[0]);
        }
    }

    #[test]
    fn element_ord_matches_byte_ord(x in arb_element(), y in arb_element()) {
        let px = pack(b"", &[x.clone()]).unwrap();
        let py = pack(b"", &[y.clone()]).unwrap();
        prop_assert_eq!(x.cmp(&y), px.cmp(&py), "{:?} vs {:?}", x, y);
    }

    #[test]
    fn skip_fidelity(tuple in arb_tuple()) {
        let key = Key::new(&tuple).unwrap();
        prop_assert_eq!(key.count().unwrap(), tuple.len());
        for (i, elem) in tuple.iter().enumerate() {
            let got = key.get(i as isize).unwrap();
            prop_assert_eq!(got.as_ref(), Some(elem));
        }
        prop_assert_eq!(key.get(tuple.len() as isize).unwrap(), None);
        if !tuple.is_empty() {
            let got = key.get(-1).unwrap();
            prop_assert_eq!(got.as_ref(), tuple.last());
        }
    }

    #[test]
    fn key_iteration_decodes_the_tuple(tuple in arb_tuple()) {
        let key = Key::new(&tuple).unwrap();
        let walked: Result<Vec<Element>, _> = key.iter().collect();
        prop_assert_eq!(walked.unwrap(), tuple);
    }

    #[test]
    fn equal_keys_hash_equal(tuple in arb_tuple()) {
        let a = Key::new(&tuple).unwrap();
        let b = Key::from_raw(b"", a.as_bytes()).expect("empty prefix");
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn key_tuple_comparison_agrees_with_byte_order(
        a in arb_tuple(), b in arb_tuple())
    {
        let ka = Key::new(&a).unwrap();
        let kb = Key::new(&b).unwrap();
        prop_assert_eq!(ka.cmp_elements(&b).unwrap(), ka.cmp(&kb), "{:?} vs {:?}", a, b);
    }

    #[test]
    fn prefix_filter(
        prefix in proptest::collection::vec(any::<u8>(), 0..6),
        data in proptest::collection::vec(any::<u8>(), 0..12))
    {
        let starts = data.starts_with(&prefix);
        let result = unpack(&prefix, &data);
        match result {
            Ok(None) => prop_assert!(!starts),
            // Ok(Some) and decode errors both require the prefix to match.
            _ => prop_assert!(starts),
        }
    }

    #[test]
    fn varint_is_minimal_and_roundtrips(v in any::<u64>()) {
        let mut wtr = Writer::with_capacity(9).unwrap();
        write_varint(&mut wtr, v, None, 0).unwrap();
        let buf = wtr.finish();
        prop_assert_eq!(buf.len(), varint_len(v));
        let mut rdr = Reader::new(&buf);
        prop_assert_eq!(read_varint(&mut rdr, 0).unwrap(), v);
        prop_assert!(rdr.is_empty());
    }

    #[test]
    fn varint_order_matches_numeric_order(a in any::<u64>(), b in any::<u64>()) {
        let pa = pack_int(b"", a).unwrap();
        let pb = pack_int(b"", b).unwrap();
        prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
    }

    #[test]
    fn offset_table_contract(
        deltas in proptest::collection::vec(any::<u32>().prop_map(u64::from), 0..12),
        trailer in proptest::collection::vec(any::<u8>(), 0..8))
    {
        let mut encoded = encode_offsets(&deltas).unwrap();
        let table_len = encoded.len();
        encoded.extend_from_slice(&trailer);
        let (offsets, consumed) = decode_offsets(&encoded).unwrap();
        prop_assert_eq!(consumed, table_len);
        prop_assert_eq!(offsets.len(), deltas.len() + 1);
        prop_assert_eq!(offsets[0], 0);
        let mut pos = 0u64;
        for (offset, delta) in offsets[1..].iter().zip(&deltas) {
            pos += delta;
            prop_assert_eq!(*offset, pos);
        }
    }

    #[test]
    fn decoder_never_panics_on_garbage(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = unpack(b"", &data);
        let _ = unpacks(b"", &data);
        let _ = decode_offsets(&data);
        let key = Key::from_raw(b"", &data).expect("empty prefix");
        let _ = key.count();
        let _ = key.get(-1);
        for elem in key.iter() {
            let _ = elem;
        }
    }

    #[test]
    fn whatever_decodes_reencodes_identically(data in proptest::collection::vec(any::<u8>(), 0..48)) {
        // Not every byte string is a canonical encoding (varints and the
        // 7-bit tail admit redundant forms), but a decoded tuple must
        // re-encode to a tuple that decodes equal again.
        if let Ok(Some(tuple)) = unpack(b"", &data) {
            let repacked = pack(b"", &tuple).unwrap();
            let reparsed = unpack(b"", &repacked).unwrap().expect("empty prefix");
            prop_assert_eq!(reparsed, tuple);
        }
    }
}
