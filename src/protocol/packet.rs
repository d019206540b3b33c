use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::MAX_PACKET_SIZE;
use crate::error::{Error, Result};

/// The 4-byte prefix of every wire packet: a 24-bit little-endian payload
/// length followed by the sequence number (zero-copy).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    len: [u8; 3],
    seq: u8,
}

impl PacketHeader {
    pub fn new(payload_len: usize, seq: u8) -> Self {
        let [lo, mid, hi, _] = (payload_len as u32).to_le_bytes();
        Self {
            len: [lo, mid, hi],
            seq,
        }
    }

    pub fn payload_len(&self) -> usize {
        let [lo, mid, hi] = self.len;
        usize::from(lo) | usize::from(mid) << 8 | usize::from(hi) << 16
    }

    pub fn sequence_id(&self) -> u8 {
        self.seq
    }

    /// Split a raw header into `(payload_len, sequence_id)`.
    pub fn parse(raw: &[u8; 4]) -> (usize, u8) {
        let [lo, mid, hi, seq] = *raw;
        (
            usize::from(lo) | usize::from(mid) << 8 | usize::from(hi) << 16,
            seq,
        )
    }
}

/// Verify the sequence number of an incoming packet and advance the counter.
#[inline]
pub fn check_sequence_number(expected: &mut u8, actual: u8) -> Result<()> {
    if actual != *expected {
        return Err(Error::SequenceNumberMismatch {
            expected: *expected,
            actual,
        });
    }
    *expected = expected.wrapping_add(1);
    Ok(())
}

/// Frame an outbound payload into `out`, splitting at the 16 MiB boundary.
///
/// Bodies that are an exact multiple of the maximum packet size get a
/// trailing zero-length packet so the receiver can detect the end. The
/// sequence counter advances once per emitted packet.
pub fn encode_frames(out: &mut Vec<u8>, payload: &[u8], seqnum: &mut u8) {
    let num_chunks = payload.len() / MAX_PACKET_SIZE + 1;
    out.reserve(num_chunks * 4 + payload.len());

    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PACKET_SIZE);
        let (chunk, rest) = remaining.split_at(chunk_size);

        out.extend_from_slice(PacketHeader::new(chunk_size, *seqnum).as_bytes());
        out.extend_from_slice(chunk);
        *seqnum = seqnum.wrapping_add(1);

        remaining = rest;
        // a full-size final chunk requires an explicit empty terminator
        if remaining.is_empty() && chunk_size < MAX_PACKET_SIZE {
            break;
        }
    }
}
