//! # Tuple and Batch Framing
//!
//! A tuple is a sequence of elements encoded back to back with **no
//! delimiter**: each element is self-terminating, so a delimiter would
//! only distort the byte order. A batch is a sequence of tuples joined by
//! the single separator byte [`kind::SEP`], with no trailing separator.
//!
//! ## Prefixes
//!
//! Every pack operation prepends a caller-supplied byte prefix verbatim,
//! and every unpack operation requires it. A prefix mismatch during
//! decode is *not* an error: `unpack`/`unpacks` return `None` so range
//! scans can cheaply discard keys belonging to a different keyspace
//! partition.
//!
//! ## The `TupleWrite` seam
//!
//! [`pack`] and [`packs`] accept anything that knows how to append itself
//! to a key: a single [`Element`], a slice or vec of elements, or an
//! already-encoded [`Key`] (which contributes its raw bytes unchanged).
//! Mixed batches go through `&dyn TupleWrite`.

use crate::element::{kind, read_element, write_element, Element};
use crate::error::Result;
use crate::io::{Reader, Writer};
use crate::key::Key;

/// Types that can append themselves to an encoded key.
pub trait TupleWrite {
    /// Append this value's encoding to `wtr`.
    fn write_to(&self, wtr: &mut Writer) -> Result<()>;
}

impl TupleWrite for Element {
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        write_element(wtr, self)
    }
}

impl TupleWrite for [Element] {
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        for elem in self {
            write_element(wtr, elem)?;
        }
        Ok(())
    }
}

impl<const N: usize> TupleWrite for [Element; N] {
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        self.as_slice().write_to(wtr)
    }
}

impl TupleWrite for Vec<Element> {
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        self.as_slice().write_to(wtr)
    }
}

impl TupleWrite for Key {
    /// A key is already encoded; its bytes pass through verbatim.
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        wtr.put_bytes(self.as_bytes())
    }
}

impl<T: TupleWrite + ?Sized> TupleWrite for &T {
    fn write_to(&self, wtr: &mut Writer) -> Result<()> {
        (**self).write_to(wtr)
    }
}

/// Encode one tuple (or element, or key) after `prefix`.
///
/// ```
/// use keypack::{pack, Element};
///
/// let k = pack(b"t:", &[Element::from(0i64), Element::from(1i64)]).unwrap();
/// assert_eq!(k, b"t:\x13\x00\x13\x01");
/// ```
pub fn pack<T: TupleWrite + ?Sized>(prefix: &[u8], value: &T) -> Result<Vec<u8>> {
    let mut wtr = Writer::with_capacity(prefix.len() + 20)?;
    wtr.put_bytes(prefix)?;
    value.write_to(&mut wtr)?;
    Ok(wtr.finish())
}

/// Encode a batch: each item of `values` after `prefix`, joined by the
/// separator byte.
///
/// A trailing empty tuple cannot be told apart from no tuple at all on
/// decode; batches should end with a non-empty tuple.
pub fn packs<T: TupleWrite>(prefix: &[u8], values: &[T]) -> Result<Vec<u8>> {
    let mut wtr = Writer::with_capacity(prefix.len() + 20 * values.len())?;
    wtr.put_bytes(prefix)?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            wtr.put_byte(kind::SEP)?;
        }
        value.write_to(&mut wtr)?;
    }
    Ok(wtr.finish())
}

/// Decode elements until end of input or a separator. Consumes the
/// separator so a following tuple starts clean.
pub(crate) fn read_tuple(rdr: &mut Reader<'_>) -> Result<Vec<Element>> {
    let mut elems = Vec::new();
    while let Some(b) = rdr.peek() {
        if b == kind::SEP {
            rdr.bump(1);
            break;
        }
        elems.push(read_element(rdr)?);
    }
    Ok(elems)
}

/// Decode the first tuple of `data`, which must start with `prefix`.
///
/// Returns `Ok(None)` when `data` does not start with `prefix`; this is
/// the scan-filter signal, not a failure. Bytes after the first
/// separator are ignored; use [`unpacks`] for whole batches.
pub fn unpack(prefix: &[u8], data: &[u8]) -> Result<Option<Vec<Element>>> {
    let Some(rest) = data.strip_prefix(prefix) else {
        return Ok(None);
    };
    let mut rdr = Reader::new(rest);
    read_tuple(&mut rdr).map(Some)
}

/// Decode an entire batch of tuples from `data`, which must start with
/// `prefix`. Returns `Ok(None)` on a prefix mismatch.
pub fn unpacks(prefix: &[u8], data: &[u8]) -> Result<Option<Vec<Vec<Element>>>> {
    let Some(rest) = data.strip_prefix(prefix) else {
        return Ok(None);
    };
    let mut rdr = Reader::new(rest);
    let mut tuples = Vec::new();
    while !rdr.is_empty() {
        tuples.push(read_tuple(&mut rdr)?);
    }
    Ok(Some(tuples))
}
