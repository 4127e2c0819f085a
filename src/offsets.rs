//! # Offset Table Codec
//!
//! A length-prefixed array of cumulative varint deltas. The value layer
//! batches several records into one stored value and uses this table to
//! locate each record inside the concatenation:
//!
//! ```text
//! count || delta_1 || delta_2 || ... || delta_count
//! ```
//!
//! Every field is a plain (unmasked) varint. Decoding reconstructs the
//! absolute offsets by running sum starting at 0, so a table of `count`
//! deltas yields `count + 1` offsets: the start of each record plus the
//! end of the last one. The decoder also reports how many input bytes the
//! table occupied, because the record payload follows immediately after.

use crate::error::{KeyError, Result};
use crate::io::{Reader, Writer};
use crate::varint::{read_varint, write_varint};

/// Encode `deltas` as a length-prefixed varint array.
pub fn encode_offsets(deltas: &[u64]) -> Result<Vec<u8>> {
    let mut wtr = Writer::with_capacity(9 * (deltas.len() + 1))?;
    write_varint(&mut wtr, deltas.len() as u64, None, 0)?;
    for &delta in deltas {
        write_varint(&mut wtr, delta, None, 0)?;
    }
    Ok(wtr.finish())
}

/// Decode an offset table from the front of `data`.
///
/// Returns the running-sum offsets (always starting with 0) and the
/// number of bytes consumed, so the caller can continue reading the
/// payload right after the table.
pub fn decode_offsets(data: &[u8]) -> Result<(Vec<u64>, usize)> {
    let mut rdr = Reader::new(data);
    let count = read_varint(&mut rdr, 0)?;
    // Each delta takes at least one byte, so a count beyond the remaining
    // input is a truncation no matter what follows.
    if count > rdr.remaining() as u64 {
        return Err(KeyError::Truncated {
            needed: count as usize,
            remaining: rdr.remaining(),
        });
    }
    let mut offsets = Vec::with_capacity(count as usize + 1);
    offsets.push(0u64);
    let mut pos = 0u64;
    for _ in 0..count {
        let delta = read_varint(&mut rdr, 0)?;
        pos = pos.checked_add(delta).ok_or(KeyError::OutOfRange {
            what: "offset sum",
            value: i128::from(delta),
        })?;
        offsets.push(pos);
    }
    Ok((offsets, rdr.position()))
}
