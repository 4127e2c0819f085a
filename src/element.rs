//! # Element Codec
//!
//! One tagged element of a tuple key: its in-memory representation
//! ([`Element`]), the frozen kind-byte table ([`kind`]), and the
//! encode/decode/skip routines that the tuple layer drives.
//!
//! ## Wire Layout
//!
//! Every element is `kind_byte || payload`:
//!
//! | Kind | Byte | Payload |
//! |------|------|---------|
//! | null | 0x0F | none |
//! | negative time | 0x10 | varint of the negated composite, bytes XOR 0xFF |
//! | negative integer | 0x11 | varint of the magnitude, bytes XOR 0xFF |
//! | bool | 0x12 | one byte, 0x00 or 0x01 |
//! | integer | 0x13 | varint |
//! | time | 0x14 | varint of `(millis << 7) \| offset_bits` |
//! | blob | 0x15 | 7-bit packed bytes |
//! | text | 0x16 | UTF-8, then 7-bit packed |
//! | uuid | 0x17 | 16 raw bytes |
//! | separator | 0x18 | none (tuple framing, not an element) |
//!
//! The numeric kind values are part of the on-disk format and fix the
//! cross-type sort order; they must never change.
//!
//! ## 7-Bit Packing
//!
//! Blob and text payloads are repacked so every output byte has the high
//! bit set. Any byte below 0x80 (the next kind byte, a separator, or end
//! of buffer) therefore terminates the payload unambiguously, with no
//! escaping and no length prefix, while byte order is preserved. The
//! price is one extra byte per 7 input bytes.
//!
//! ## Timestamps
//!
//! A [`Time`] carries milliseconds since the Unix epoch plus a UTC offset
//! in quarter-hour steps. The two pack into a single varint as
//! `(millis << 7) | (64 + offset_secs / 900)`; a negative composite flips
//! to the negative-time kind with the XOR mask, keeping pre-epoch
//! timestamps ordered before post-epoch ones. Sub-millisecond precision
//! and sub-quarter-hour offsets are not representable.
//!
//! ## Skipping
//!
//! [`skip_element`] advances a cursor past one element without decoding
//! it: every payload is either fixed-size, self-describing from its first
//! byte (varints), or delimited by the high bit (packed bytes). `Key`
//! uses this for O(1)-allocation length and indexing.

use std::cmp::Ordering;

use crate::error::{KeyError, Result};
use crate::io::{Reader, Writer};
use crate::varint::{read_varint, varint_width, write_varint};

/// Element kind bytes. The values fix the cross-type sort order and are
/// frozen; see the module docs.
pub mod kind {
    /// Null, sorts before everything else.
    pub const NULL: u8 = 0x0F;
    /// Timestamp with a negative composite (pre-epoch).
    pub const NEG_TIME: u8 = 0x10;
    /// Negative integer.
    pub const NEG_INTEGER: u8 = 0x11;
    /// Boolean.
    pub const BOOL: u8 = 0x12;
    /// Non-negative integer.
    pub const INTEGER: u8 = 0x13;
    /// Timestamp with a non-negative composite.
    pub const TIME: u8 = 0x14;
    /// Raw byte string.
    pub const BLOB: u8 = 0x15;
    /// UTF-8 text.
    pub const TEXT: u8 = 0x16;
    /// 16-byte UUID.
    pub const UUID: u8 = 0x17;
    /// Tuple separator within a batch key.
    pub const SEP: u8 = 0x18;
}

/// UTC offsets are stored in quarter-hour steps.
pub const OFFSET_STEP_SECS: i32 = 900;
/// Most westerly encodable UTC offset, in seconds.
pub const MIN_OFFSET_SECS: i32 = -31 * OFFSET_STEP_SECS;
/// Most easterly encodable UTC offset, in seconds.
pub const MAX_OFFSET_SECS: i32 = 32 * OFFSET_STEP_SECS;

/// Bias added to the quarter-hour offset count inside the composite.
const OFFSET_BIAS: i128 = 64;

/// A timestamp with millisecond precision and a fixed UTC offset.
///
/// Ordering is by `(millis, offset_secs)`, which is exactly the order of
/// the encoded bytes: the instant dominates, and two timestamps naming
/// the same instant from different offsets sort adjacently by offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    millis: i64,
    offset_secs: i32,
}

impl Time {
    /// Build a timestamp from milliseconds since the Unix epoch and a UTC
    /// offset in seconds.
    ///
    /// The offset must lie in `[-31*900, +32*900]` seconds and is
    /// truncated to a whole number of quarter hours. Timestamps whose
    /// 64-bit composite cannot be carried by the varint are rejected.
    pub fn new(millis: i64, offset_secs: i32) -> Result<Time> {
        if !(MIN_OFFSET_SECS..=MAX_OFFSET_SECS).contains(&offset_secs) {
            return Err(KeyError::OutOfRange {
                what: "utc offset (seconds)",
                value: i128::from(offset_secs),
            });
        }
        let t = Time {
            millis,
            offset_secs: (offset_secs / OFFSET_STEP_SECS) * OFFSET_STEP_SECS,
        };
        t.composite()?;
        Ok(t)
    }

    /// Build a UTC timestamp from milliseconds since the Unix epoch.
    pub fn utc(millis: i64) -> Result<Time> {
        Time::new(millis, 0)
    }

    /// Milliseconds since the Unix epoch.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// UTC offset in seconds, a multiple of 900.
    pub fn offset_secs(&self) -> i32 {
        self.offset_secs
    }

    /// The signed 64-bit composite `(millis << 7) | offset_bits` that the
    /// varint carries.
    fn composite(&self) -> Result<i128> {
        let bits = OFFSET_BIAS + i128::from(self.offset_secs / OFFSET_STEP_SECS);
        let c = i128::from(self.millis) * 128 + bits;
        if c.unsigned_abs() > u128::from(u64::MAX) {
            return Err(KeyError::OutOfRange {
                what: "timestamp (milliseconds)",
                value: i128::from(self.millis),
            });
        }
        Ok(c)
    }
}

/// One primitive value of a tuple key.
///
/// Negative integers and pre-epoch timestamps are not separate variants;
/// the encoder selects the negative kind byte from the value's sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    /// Absence of a value; sorts before everything.
    Null,
    /// `false` sorts before `true`.
    Bool(bool),
    /// Signed integer. Encodable magnitudes go up to 2^64-1, which is why
    /// the payload is `i128` rather than `i64`.
    Integer(i128),
    /// Arbitrary byte string.
    Blob(Vec<u8>),
    /// Unicode text; shares the blob representation after UTF-8 encoding.
    Text(String),
    /// Millisecond timestamp with quarter-hour UTC offset.
    Time(Time),
    /// Raw 16-byte UUID.
    Uuid([u8; 16]),
}

impl Element {
    /// The kind byte this element encodes under, accounting for sign.
    pub(crate) fn kind_byte(&self) -> u8 {
        match self {
            Element::Null => kind::NULL,
            Element::Bool(_) => kind::BOOL,
            Element::Integer(v) if *v < 0 => kind::NEG_INTEGER,
            Element::Integer(_) => kind::INTEGER,
            Element::Blob(_) => kind::BLOB,
            Element::Text(_) => kind::TEXT,
            Element::Time(t) if t.millis < 0 => kind::NEG_TIME,
            Element::Time(_) => kind::TIME,
            Element::Uuid(_) => kind::UUID,
        }
    }
}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Element {
    /// Matches the byte order of the encodings: kind byte first, then the
    /// natural order within a kind. Computed directly so comparison never
    /// encodes or allocates.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Element::Null, Element::Null) => Ordering::Equal,
            (Element::Bool(a), Element::Bool(b)) => a.cmp(b),
            (Element::Integer(a), Element::Integer(b)) => a.cmp(b),
            (Element::Blob(a), Element::Blob(b)) => a.cmp(b),
            (Element::Text(a), Element::Text(b)) => a.cmp(b),
            (Element::Time(a), Element::Time(b)) => a.cmp(b),
            (Element::Uuid(a), Element::Uuid(b)) => a.cmp(b),
            _ => self.kind_byte().cmp(&other.kind_byte()),
        }
    }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self {
        Element::Bool(v)
    }
}

impl From<i128> for Element {
    fn from(v: i128) -> Self {
        Element::Integer(v)
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::Integer(v.into())
    }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self {
        Element::Integer(v.into())
    }
}

impl From<u64> for Element {
    fn from(v: u64) -> Self {
        Element::Integer(v.into())
    }
}

impl From<u32> for Element {
    fn from(v: u32) -> Self {
        Element::Integer(v.into())
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::Text(v.to_owned())
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::Text(v)
    }
}

impl From<Vec<u8>> for Element {
    fn from(v: Vec<u8>) -> Self {
        Element::Blob(v)
    }
}

impl From<&[u8]> for Element {
    fn from(v: &[u8]) -> Self {
        Element::Blob(v.to_vec())
    }
}

impl From<[u8; 16]> for Element {
    fn from(v: [u8; 16]) -> Self {
        Element::Uuid(v)
    }
}

impl From<Time> for Element {
    fn from(v: Time) -> Self {
        Element::Time(v)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(v: Option<T>) -> Self {
        match v {
            None => Element::Null,
            Some(v) => v.into(),
        }
    }
}

/// Encode one element as `kind || payload`.
pub(crate) fn write_element(wtr: &mut Writer, elem: &Element) -> Result<()> {
    match elem {
        Element::Null => wtr.put_byte(kind::NULL),
        Element::Bool(b) => {
            wtr.put_byte(kind::BOOL)?;
            wtr.put_byte(u8::from(*b))
        }
        Element::Integer(v) => {
            let magnitude = v.unsigned_abs();
            if magnitude > u128::from(u64::MAX) {
                return Err(KeyError::OutOfRange {
                    what: "integer",
                    value: *v,
                });
            }
            if *v < 0 {
                write_varint(wtr, magnitude as u64, Some(kind::NEG_INTEGER), 0xFF)
            } else {
                write_varint(wtr, magnitude as u64, Some(kind::INTEGER), 0)
            }
        }
        Element::Blob(b) => write_packed_bytes(wtr, b, kind::BLOB),
        Element::Text(s) => write_packed_bytes(wtr, s.as_bytes(), kind::TEXT),
        Element::Time(t) => {
            let c = t.composite()?;
            if c < 0 {
                write_varint(wtr, (-c) as u64, Some(kind::NEG_TIME), 0xFF)
            } else {
                write_varint(wtr, c as u64, Some(kind::TIME), 0)
            }
        }
        Element::Uuid(u) => {
            wtr.put_byte(kind::UUID)?;
            wtr.put_bytes(u)
        }
    }
}

/// Decode one element. The cursor must be positioned on a kind byte; a
/// separator here means the tuple layer lost framing and is corrupt.
pub(crate) fn read_element(rdr: &mut Reader<'_>) -> Result<Element> {
    let k = rdr.take(1)?[0];
    let elem = match k {
        kind::NULL => Element::Null,
        kind::BOOL => Element::Bool(read_varint(rdr, 0)? != 0),
        kind::INTEGER => Element::Integer(read_varint(rdr, 0)?.into()),
        kind::NEG_INTEGER => Element::Integer(-i128::from(read_varint(rdr, 0xFF)?)),
        kind::TIME | kind::NEG_TIME => Element::Time(read_time(rdr, k)?),
        kind::BLOB => Element::Blob(read_packed_bytes(rdr)?),
        kind::TEXT => {
            let raw = read_packed_bytes(rdr)?;
            match String::from_utf8(raw) {
                Ok(s) => Element::Text(s),
                Err(e) => return Err(e.utf8_error().into()),
            }
        }
        kind::UUID => {
            let mut u = [0u8; 16];
            u.copy_from_slice(rdr.take(16)?);
            Element::Uuid(u)
        }
        other => return Err(KeyError::Corrupt { kind: other }),
    };
    Ok(elem)
}

fn read_time(rdr: &mut Reader<'_>, k: u8) -> Result<Time> {
    let xor = if k == kind::NEG_TIME { 0xFF } else { 0 };
    let magnitude = read_varint(rdr, xor)?;
    // Recover the signed composite before splitting off the offset bits;
    // masking the magnitude instead would hand back garbage for every
    // pre-epoch timestamp.
    let composite = if xor != 0 {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    let offset_bits = composite & 0x7F;
    let offset_secs = ((offset_bits - OFFSET_BIAS) * i128::from(OFFSET_STEP_SECS)) as i32;
    if !(MIN_OFFSET_SECS..=MAX_OFFSET_SECS).contains(&offset_secs) {
        return Err(KeyError::OutOfRange {
            what: "decoded utc offset (seconds)",
            value: i128::from(offset_secs),
        });
    }
    Ok(Time {
        millis: (composite >> 7) as i64,
        offset_secs,
    })
}

/// Outcome of [`skip_element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Skip {
    /// One element was skipped.
    Element,
    /// A separator byte was consumed; the current tuple ends here.
    Sep,
    /// The cursor was already at end of input.
    Eof,
}

/// Advance `rdr` past one element without materializing it.
pub(crate) fn skip_element(rdr: &mut Reader<'_>) -> Result<Skip> {
    let Some(k) = rdr.get() else {
        return Ok(Skip::Eof);
    };
    match k {
        kind::NULL => {}
        kind::BOOL => {
            rdr.ensure(1)?;
            rdr.bump(1);
        }
        kind::INTEGER | kind::NEG_INTEGER | kind::TIME | kind::NEG_TIME => {
            let xor = if k == kind::NEG_INTEGER || k == kind::NEG_TIME {
                0xFF
            } else {
                0
            };
            let first = xor ^ rdr.take(1)?[0];
            let trailing = varint_width(first) - 1;
            rdr.ensure(trailing)?;
            rdr.bump(trailing);
        }
        kind::BLOB | kind::TEXT => {
            while rdr.peek().is_some_and(|b| b & 0x80 != 0) {
                rdr.bump(1);
            }
        }
        kind::UUID => {
            rdr.ensure(16)?;
            rdr.bump(16);
        }
        kind::SEP => return Ok(Skip::Sep),
        other => return Err(KeyError::Corrupt { kind: other }),
    }
    Ok(Skip::Element)
}

/// Worst-case packed size of `len` payload bytes: one extra byte for
/// every started run of 7.
fn packed_len(len: usize) -> usize {
    len + len.div_ceil(7)
}

/// Emit `kind || data` with the payload 7-bit packed so every payload
/// byte has the high bit set.
fn write_packed_bytes(wtr: &mut Writer, data: &[u8], kind_byte: u8) -> Result<()> {
    wtr.need(1 + packed_len(data.len()))?;
    wtr.put_byte(kind_byte)?;
    let mut shift = 1u32;
    let mut trailer = 0u8;
    for &o in data {
        wtr.put_byte(0x80 | trailer | (o >> shift))?;
        if shift < 7 {
            trailer = (o << (7 - shift)) & 0x7F;
            shift += 1;
        } else {
            wtr.put_byte(0x80 | (o & 0x7F))?;
            shift = 1;
            trailer = 0;
        }
    }
    if shift > 1 {
        wtr.put_byte(0x80 | trailer)?;
    }
    Ok(())
}

/// Decode a 7-bit packed payload. Stops at the first byte with the high
/// bit clear, leaving it unread for the tuple parser; a payload that runs
/// to end of buffer is complete as-is.
fn read_packed_bytes(rdr: &mut Reader<'_>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let Some(lb) = rdr.get() else {
        return Ok(out);
    };
    if lb & 0x80 == 0 {
        rdr.unget();
        return Ok(out);
    }
    let mut lb = lb;
    let mut shift = 1u32;
    while let Some(cb) = rdr.get() {
        if cb & 0x80 == 0 {
            rdr.unget();
            break;
        }
        out.push((lb << shift) | ((cb & 0x7F) >> (7 - shift)));
        if shift < 7 {
            shift += 1;
            lb = cb;
        } else {
            shift = 1;
            match rdr.get() {
                Some(b) if b & 0x80 != 0 => lb = b,
                Some(_) => {
                    rdr.unget();
                    break;
                }
                None => break,
            }
        }
    }
    Ok(out)
}
