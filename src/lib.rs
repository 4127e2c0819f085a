//! # keypack - Order-Preserving Tuple Key Codec
//!
//! keypack serializes heterogeneous tuples of primitive values into
//! opaque byte strings whose `memcmp` order reproduces the natural
//! component-wise order of the tuples. A storage engine that can only
//! compare raw bytes gets correctly sorted composite keys for free, and
//! the same bytes decode back to values that compare equal to the
//! originals.
//!
//! ## Quick Start
//!
//! ```
//! use keypack::{pack, unpack, Element, Key};
//!
//! # fn main() -> keypack::Result<()> {
//! // ("user", 42) under the "idx:" keyspace prefix
//! let raw = pack(b"idx:", &[Element::from("user"), Element::from(42i64)])?;
//!
//! // Bytes sort the way the tuples do
//! let later = pack(b"idx:", &[Element::from("user"), Element::from(43i64)])?;
//! assert!(raw < later);
//!
//! // Decode, filtering on the prefix
//! let tuple = unpack(b"idx:", &raw)?.expect("prefix matches");
//! assert_eq!(tuple[1], Element::from(42i64));
//!
//! // Or wrap the bytes and index lazily, without decoding the tuple
//! let key = Key::from_raw(b"idx:", &raw).expect("prefix matches");
//! assert_eq!(key.get(-1)?, Some(Element::from(42i64)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire Format
//!
//! Each element encodes as a kind byte plus a self-terminating payload;
//! tuples are elements back to back with no delimiter; batches are tuples
//! joined by a single separator byte:
//!
//! ```text
//! tuple:  elem elem elem ...
//! batch:  tuple 0x18 tuple 0x18 tuple
//! elem:   0x0F                    null
//!         0x12 00|01              bool
//!         0x13 varint             integer        (0x11, bytes^0xFF when < 0)
//!         0x14 varint             timestamp      (0x10, bytes^0xFF pre-epoch)
//!         0x15 7-bit packed       blob
//!         0x16 7-bit packed       text (UTF-8)
//!         0x17 16 raw bytes       uuid
//! ```
//!
//! Three mechanisms make the ordering work:
//!
//! - the **kind byte** fixes the order *between* types;
//! - the **varint** (see [`varint`]) gives bigger integers strictly
//!   longer encodings with strictly bigger first bytes;
//! - **7-bit packing** (see [`element`]) lifts every blob/text payload
//!   byte above 0x80, so payloads terminate unambiguously at any kind or
//!   separator byte while preserving byte order.
//!
//! Negative integers and pre-epoch timestamps encode the absolute value
//! with every payload byte XOR-inverted under a lower kind byte, which
//! reverses the varint order exactly as signed ordering requires.
//!
//! The kind-byte assignments, varint width table, 7-bit packing, and
//! timestamp composite are the persistence format and are frozen.
//!
//! ## Module Overview
//!
//! - [`io`]: bounds-checked byte cursors
//! - [`varint`]: the order-preserving variable-width integer
//! - [`element`]: one tagged element; encode, decode, skip
//! - [`tuple`]: tuple and batch framing over elements
//! - [`offsets`]: length-prefixed delta table for batched values
//! - [`key`]: the [`Key`] object; lazy sequence view over encoded bytes
//! - [`error`]: [`KeyError`] and the crate [`Result`]
//!
//! ## Scope
//!
//! The codec is synchronous, allocation-bounded, and does no I/O. There
//! is no schema, no versioning and no compression: the byte strings are
//! meaningful only to this codec and a `memcmp`-ordered keyspace.

pub mod element;
pub mod error;
pub mod io;
pub mod key;
pub mod offsets;
pub mod tuple;
pub mod varint;

pub use element::{kind, Element, Time, MAX_OFFSET_SECS, MIN_OFFSET_SECS, OFFSET_STEP_SECS};
pub use error::{KeyError, Result};
pub use key::{next_greater, Key, KeyIter};
pub use offsets::{decode_offsets, encode_offsets};
pub use tuple::{pack, packs, unpack, unpacks, TupleWrite};
pub use varint::pack_int;
