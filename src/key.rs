//! # The Key Value Object
//!
//! A [`Key`] wraps an encoded tuple and behaves as an immutable, ordered
//! sequence of elements without ever holding the decoded tuple. Length
//! and indexing walk the bytes with the skip fast path; iteration decodes
//! lazily, one element per step; comparison against other keys is a
//! straight byte compare, and comparison against element slices encodes
//! the candidate incrementally so a mismatch in the first component costs
//! a few bytes of work.
//!
//! ## Ownership Modes
//!
//! | Mode | Storage | Produced by |
//! |--------|-----------------------------------|-------------|
//! | owned | inline small-buffer, spills to heap | construction from elements, `from_raw`, `from_hex`, concat |
//! | shared | `Arc<[u8]>` subrange | `from_shared`, keeping a scan page alive |
//!
//! Either way a key is immutable after construction, so clones are cheap
//! and the cached hash can be published once.
//!
//! ## Hashing
//!
//! The hash is `h = (1000003 * h) ^ byte` over the raw bytes, cached in
//! an atomic. −1 marks "not yet computed"; a computed −1 is remapped to
//! −2 so the sentinel stays unambiguous.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering as MemOrdering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::element::{kind, read_element, skip_element, write_element, Element, Skip};
use crate::error::Result;
use crate::io::{Reader, Writer};

/// Keys at or below this many bytes live inline, no heap allocation.
const INLINE_KEY_BYTES: usize = 24;

/// Hash cache sentinel for "not yet computed".
const HASH_UNSET: i64 = -1;

#[derive(Clone)]
enum Repr {
    Owned(SmallVec<[u8; INLINE_KEY_BYTES]>),
    Shared {
        buf: Arc<[u8]>,
        start: usize,
        end: usize,
    },
}

/// An immutable, hashable, comparable, lazily-iterable encoded tuple.
pub struct Key {
    repr: Repr,
    hash: AtomicI64,
}

impl Key {
    fn from_owned_bytes(bytes: &[u8]) -> Key {
        Key {
            repr: Repr::Owned(SmallVec::from_slice(bytes)),
            hash: AtomicI64::new(HASH_UNSET),
        }
    }

    /// Encode `elems` into a new key.
    pub fn new(elems: &[Element]) -> Result<Key> {
        let mut wtr = Writer::with_capacity(32)?;
        for elem in elems {
            write_element(&mut wtr, elem)?;
        }
        Ok(Key::from_owned_bytes(&wtr.finish()))
    }

    /// Encode a single element into a new key.
    pub fn from_element(elem: impl Into<Element>) -> Result<Key> {
        Key::new(&[elem.into()])
    }

    /// Wrap raw encoded bytes, which must start with `prefix`. The prefix
    /// is stripped; nothing else is validated. Returns `None` on a prefix
    /// mismatch, the scan-filter signal.
    pub fn from_raw(prefix: &[u8], raw: &[u8]) -> Option<Key> {
        raw.strip_prefix(prefix).map(Key::from_owned_bytes)
    }

    /// Like [`from_raw`](Key::from_raw) but zero-copy: the key borrows a
    /// subrange of `buf` and keeps the whole buffer alive for as long as
    /// the key exists. Meant for keys handed out by a scan cursor that
    /// owns page-sized buffers.
    pub fn from_shared(prefix: &[u8], buf: Arc<[u8]>) -> Option<Key> {
        if !buf.starts_with(prefix) {
            return None;
        }
        Some(Key {
            repr: Repr::Shared {
                start: prefix.len(),
                end: buf.len(),
                buf,
            },
            hash: AtomicI64::new(HASH_UNSET),
        })
    }

    /// Parse a key from its [`to_hex`](Key::to_hex) representation.
    pub fn from_hex(hex_str: &str) -> Result<Key> {
        let bytes = hex::decode(hex_str)?;
        Ok(Key::from_owned_bytes(&bytes))
    }

    /// The encoded bytes, without any prefix.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Owned(b) => b,
            Repr::Shared { buf, start, end } => &buf[*start..*end],
        }
    }

    /// The encoded bytes with `prefix` prepended.
    pub fn to_raw(&self, prefix: &[u8]) -> Vec<u8> {
        let bytes = self.as_bytes();
        let mut out = Vec::with_capacity(prefix.len() + bytes.len());
        out.extend_from_slice(prefix);
        out.extend_from_slice(bytes);
        out
    }

    /// Lowercase hex of the encoded bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Number of elements, counted by skipping; nothing is decoded.
    ///
    /// For a batch-form key this counts the leading tuple only; decode
    /// batches with [`unpacks`](crate::unpacks).
    pub fn count(&self) -> Result<usize> {
        let mut rdr = Reader::new(self.as_bytes());
        let mut n = 0;
        loop {
            match skip_element(&mut rdr)? {
                Skip::Element => n += 1,
                Skip::Sep | Skip::Eof => return Ok(n),
            }
        }
    }

    /// True when the key encodes no elements at all.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Decode the element at `index`. Negative indices count from the
    /// end: `get(-1)` is the last element. Out-of-range indices return
    /// `None`.
    pub fn get(&self, index: isize) -> Result<Option<Element>> {
        let index = if index < 0 {
            let count = self.count()? as isize;
            match count.checked_add(index) {
                Some(i) if i >= 0 => i as usize,
                _ => return Ok(None),
            }
        } else {
            index as usize
        };

        let mut rdr = Reader::new(self.as_bytes());
        for _ in 0..index {
            match skip_element(&mut rdr)? {
                Skip::Element => {}
                Skip::Sep | Skip::Eof => return Ok(None),
            }
        }
        match rdr.peek() {
            None | Some(kind::SEP) => Ok(None),
            Some(_) => read_element(&mut rdr).map(Some),
        }
    }

    /// Iterate the elements, decoding one per step.
    pub fn iter(&self) -> KeyIter<'_> {
        KeyIter {
            rdr: Reader::new(self.as_bytes()),
        }
    }

    /// Byte-concatenate two keys.
    pub fn concat(&self, other: &Key) -> Key {
        let a = self.as_bytes();
        let b = other.as_bytes();
        let mut bytes = SmallVec::with_capacity(a.len() + b.len());
        bytes.extend_from_slice(a);
        bytes.extend_from_slice(b);
        Key {
            repr: Repr::Owned(bytes),
            hash: AtomicI64::new(HASH_UNSET),
        }
    }

    /// Encode `elems` and append them, producing a longer key.
    pub fn extend(&self, elems: &[Element]) -> Result<Key> {
        let bytes = self.as_bytes();
        let mut wtr = Writer::with_capacity(bytes.len() * 2)?;
        wtr.put_bytes(bytes)?;
        for elem in elems {
            write_element(&mut wtr, elem)?;
        }
        Ok(Key::from_owned_bytes(&wtr.finish()))
    }

    /// Compare this key against a tuple of elements, encoding the tuple
    /// one element at a time and stopping at the first difference. A
    /// tuple that is a strict prefix of the key sorts below it, and vice
    /// versa. Fails only if an element of `elems` cannot be encoded.
    pub fn cmp_elements(&self, elems: &[Element]) -> Result<Ordering> {
        let mut wtr = Writer::with_capacity(64)?;
        let mut remain = self.as_bytes();
        for elem in elems {
            if remain.is_empty() {
                return Ok(Ordering::Less);
            }
            wtr.clear();
            write_element(&mut wtr, elem)?;
            let chunk = wtr.written();
            let n = remain.len().min(chunk.len());
            match remain[..n].cmp(&chunk[..n]) {
                Ordering::Equal if remain.len() < chunk.len() => return Ok(Ordering::Less),
                Ordering::Equal => remain = &remain[n..],
                other => return Ok(other),
            }
        }
        Ok(if remain.is_empty() {
            Ordering::Equal
        } else {
            Ordering::Greater
        })
    }

    /// The cached content hash, computing and publishing it on first use.
    fn content_hash(&self) -> i64 {
        let cached = self.hash.load(MemOrdering::Acquire);
        if cached != HASH_UNSET {
            return cached;
        }
        let mut h: i64 = 0;
        for &b in self.as_bytes() {
            h = h.wrapping_mul(1_000_003) ^ i64::from(b);
        }
        if h == HASH_UNSET {
            h -= 1;
        }
        // Racing writers all store the same value.
        self.hash.store(h, MemOrdering::Release);
        h
    }
}

impl Clone for Key {
    fn clone(&self) -> Key {
        Key {
            repr: self.repr.clone(),
            hash: AtomicI64::new(self.hash.load(MemOrdering::Acquire)),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Key) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Key) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    /// Byte order; a key that is a strict prefix of another sorts first.
    fn cmp(&self, other: &Key) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialEq<[Element]> for Key {
    fn eq(&self, other: &[Element]) -> bool {
        matches!(self.cmp_elements(other), Ok(Ordering::Equal))
    }
}

impl PartialEq<Vec<Element>> for Key {
    fn eq(&self, other: &Vec<Element>) -> bool {
        self == other.as_slice()
    }
}

impl PartialOrd<[Element]> for Key {
    fn partial_cmp(&self, other: &[Element]) -> Option<Ordering> {
        self.cmp_elements(other).ok()
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.content_hash());
    }
}

impl TryFrom<&[Element]> for Key {
    type Error = crate::KeyError;

    fn try_from(elems: &[Element]) -> Result<Key> {
        Key::new(elems)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        let mut first = true;
        for item in self.iter() {
            match item {
                Ok(elem) => {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{elem:?}")?;
                }
                Err(_) => return write!(f, "<{}>)", self.to_hex()),
            }
        }
        write!(f, ")")
    }
}

/// Lazy element iterator over a [`Key`]; stops at the first separator.
pub struct KeyIter<'a> {
    rdr: Reader<'a>,
}

impl Iterator for KeyIter<'_> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rdr.peek() {
            None | Some(kind::SEP) => None,
            Some(_) => Some(read_element(&mut self.rdr)),
        }
    }
}

impl<'a> IntoIterator for &'a Key {
    type Item = Result<Element>;
    type IntoIter = KeyIter<'a>;

    fn into_iter(self) -> KeyIter<'a> {
        self.iter()
    }
}

/// The most compact byte string greater than every string that starts
/// with `bytes`: strip trailing `0xFF` bytes, then increment the last
/// remaining byte. `None` when the input is empty or all `0xFF`, in
/// which case no such bound exists and a scan is unbounded above.
///
/// This is the exclusive upper bound for a prefix range scan:
///
/// ```
/// use keypack::{next_greater, pack, Element};
///
/// let prefix = pack(b"", &[Element::from("user")]).unwrap();
/// let hi = next_greater(&prefix).unwrap();
/// let key = pack(b"", &[Element::from("user"), Element::from(9i64)]).unwrap();
/// assert!(prefix <= key && key < hi);
/// ```
pub fn next_greater(bytes: &[u8]) -> Option<Vec<u8>> {
    let end = bytes.iter().rposition(|&b| b != 0xFF)?;
    let mut out = bytes[..=end].to_vec();
    out[end] += 1;
    Some(out)
}
