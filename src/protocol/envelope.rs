use std::mem;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf as _, Bytes, BytesMut};

use crate::error::Error;
use crate::io::BufMut;

/// Maximum payload of a single envelope: `2^24 - 1` bytes.
///
/// A logical message whose payload reaches this size continues in the next
/// envelope; the first envelope with a shorter payload terminates it.
pub const MAX_ENVELOPE_SIZE: usize = 0xFF_FF_FF;

/// A logical packet: one or more envelope payloads reassembled into a
/// single message.
///
/// The payloads are kept as an ordered list of reference-counted buffers
/// rather than copied together, so the combined message may exceed the
/// addressable range of a single allocation (a `LONG BLOB` row can pass
/// 2 GiB).
#[derive(Debug, Clone)]
pub struct LogicalPacket {
    /// Sequence id of the terminating envelope.
    pub seq: u8,
    buffers: Vec<Bytes>,
}

impl LogicalPacket {
    pub(crate) fn new(seq: u8, buffers: Vec<Bytes>) -> Self {
        Self { seq, buffers }
    }

    pub fn total_len(&self) -> u64 {
        self.buffers.iter().map(|b| b.len() as u64).sum()
    }

    /// The first payload byte; decode dispatch keys on it.
    pub fn first_byte(&self) -> Option<u8> {
        self.buffers.iter().find_map(|b| b.first().copied())
    }

    pub fn buffers(&self) -> &[Bytes] {
        &self.buffers
    }

    pub fn into_buffers(self) -> Vec<Bytes> {
        self.buffers
    }

    /// A contiguous view of the payload. Control packets always fit one
    /// envelope, so this borrows; it copies only in the multi-buffer case
    /// and must not be used on row-sized packets.
    pub(crate) fn contiguous(&self) -> Bytes {
        if self.buffers.len() == 1 {
            return self.buffers[0].clone();
        }

        let mut joined = BytesMut::with_capacity(self.total_len() as usize);
        for buf in &self.buffers {
            joined.extend_from_slice(buf);
        }

        joined.freeze()
    }
}

/// Reassembles MySQL envelopes out of the raw inbound byte stream.
///
/// Maintains a rolling input buffer; [`next_packet`] repeatedly extracts
/// one envelope (4-byte header, then payload) and joins continuation
/// envelopes into a [`LogicalPacket`]. Incomplete input yields `None`
/// until more bytes arrive.
///
/// [`next_packet`]: Self::next_packet
#[derive(Debug, Default)]
pub struct EnvelopeSlicer {
    buffer: BytesMut,

    // Payloads of maximum-size envelopes awaiting their terminator
    joining: Vec<Bytes>,

    // Sequence id expected on the next continuation envelope
    next_seq: Option<u8>,
}

impl EnvelopeSlicer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            joining: Vec::new(),
            next_seq: None,
        }
    }

    /// The rolling input buffer; the stream reads from the transport
    /// directly into it.
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    #[cfg(test)]
    pub(crate) fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Attempts to slice the next complete logical packet out of the
    /// rolling buffer. Returns `Ok(None)` when more bytes are required.
    pub fn next_packet(&mut self) -> Result<Option<LogicalPacket>, Error> {
        loop {
            if self.buffer.len() < 4 {
                return Ok(None);
            }

            let len = LittleEndian::read_u24(&self.buffer) as usize;
            let seq = self.buffer[3];

            if self.buffer.len() < 4 + len {
                // Retain the header until the full payload is available
                self.buffer.reserve(4 + len - self.buffer.len());
                return Ok(None);
            }

            if let Some(expected) = self.next_seq {
                if seq != expected {
                    return Err(err_protocol!(
                        "envelope sequence mismatch: expected {}, received {}",
                        expected,
                        seq
                    ));
                }
            }

            self.buffer.advance(4);
            let payload = self.buffer.split_to(len).freeze();
            self.next_seq = Some(seq.wrapping_add(1));

            if len == MAX_ENVELOPE_SIZE {
                self.joining.push(payload);
                continue;
            }

            let mut buffers = mem::take(&mut self.joining);
            if buffers.is_empty() || !payload.is_empty() {
                buffers.push(payload);
            }

            return Ok(Some(LogicalPacket::new(seq, buffers)));
        }
    }

    /// Resets sequence tracking at an exchange boundary.
    pub(crate) fn reset_sequence(&mut self) {
        self.next_seq = None;
        debug_assert!(self.joining.is_empty());
    }

    /// Advances the expected sequence past ids consumed by outbound
    /// envelopes in the same request/response cycle.
    pub(crate) fn set_expected_seq(&mut self, seq: u8) {
        self.next_seq = Some(seq);
    }
}

/// Splits an outbound payload into envelopes, writing frames into `buf`.
///
/// Payloads of at least [`MAX_ENVELOPE_SIZE`] continue across envelopes;
/// a payload that is an exact multiple of the maximum is terminated by an
/// empty envelope. The sequence id increments per envelope, wrapping
/// 255 -> 0.
pub(crate) fn write_envelopes(buf: &mut Vec<u8>, payload: &[u8], seq: &mut u8) {
    let mut rest = payload;

    loop {
        let take = rest.len().min(MAX_ENVELOPE_SIZE);
        let (chunk, tail) = rest.split_at(take);

        buf.put_u24::<LittleEndian>(take as u32);
        buf.put_u8(*seq);
        *seq = seq.wrapping_add(1);
        buf.put_bytes(chunk);

        rest = tail;

        if take < MAX_ENVELOPE_SIZE {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{write_envelopes, EnvelopeSlicer, MAX_ENVELOPE_SIZE};

    #[test]
    fn it_slices_a_simple_envelope() {
        let mut slicer = EnvelopeSlicer::new();
        slicer.extend(b"\x05\x00\x00\x00hello");

        let packet = slicer.next_packet().unwrap().unwrap();

        assert_eq!(packet.seq, 0);
        assert_eq!(packet.buffers().len(), 1);
        assert_eq!(&packet.buffers()[0][..], b"hello");
    }

    #[test]
    fn it_waits_for_a_full_payload() {
        let mut slicer = EnvelopeSlicer::new();

        slicer.extend(b"\x05\x00");
        assert!(slicer.next_packet().unwrap().is_none());

        slicer.extend(b"\x00\x00hel");
        assert!(slicer.next_packet().unwrap().is_none());

        slicer.extend(b"lo");
        let packet = slicer.next_packet().unwrap().unwrap();

        assert_eq!(&packet.buffers()[0][..], b"hello");
    }

    #[test]
    fn it_joins_a_maximum_size_envelope_and_its_terminator() {
        let mut slicer = EnvelopeSlicer::new();

        let mut wire = vec![0xFF, 0xFF, 0xFF, 0x00];
        wire.extend(std::iter::repeat(0xAB).take(MAX_ENVELOPE_SIZE));
        // zero-length terminator
        wire.extend_from_slice(b"\x00\x00\x00\x01");
        slicer.extend(&wire);

        let packet = slicer.next_packet().unwrap().unwrap();

        assert_eq!(packet.seq, 1);
        assert_eq!(packet.total_len(), MAX_ENVELOPE_SIZE as u64);
        assert_eq!(packet.buffers().len(), 1);
    }

    #[test]
    fn it_rejects_a_continuation_sequence_gap() {
        let mut slicer = EnvelopeSlicer::new();

        let mut wire = vec![0xFF, 0xFF, 0xFF, 0x00];
        wire.extend(std::iter::repeat(0).take(MAX_ENVELOPE_SIZE));
        // terminator skips sequence id 1
        wire.extend_from_slice(b"\x01\x00\x00\x05x");
        slicer.extend(&wire);

        assert!(slicer.next_packet().is_err());
    }

    #[test]
    fn it_round_trips_split_payloads() {
        // A payload of exactly one maximum envelope re-frames as
        // max + empty terminator
        let payload = vec![7u8; MAX_ENVELOPE_SIZE];
        let mut framed = Vec::new();
        let mut seq = 0;
        write_envelopes(&mut framed, &payload, &mut seq);

        assert_eq!(seq, 2);
        assert_eq!(framed.len(), 4 + MAX_ENVELOPE_SIZE + 4);
        assert_eq!(&framed[framed.len() - 4..], b"\x00\x00\x00\x01");

        let mut slicer = EnvelopeSlicer::new();
        slicer.extend(&framed);

        let packet = slicer.next_packet().unwrap().unwrap();
        assert_eq!(packet.total_len(), payload.len() as u64);
    }

    #[test]
    fn it_wraps_the_sequence_id_mid_message() {
        let mut seq = 254;
        let payload = vec![0u8; MAX_ENVELOPE_SIZE * 2 + 1];
        let mut framed = Vec::new();
        write_envelopes(&mut framed, &payload, &mut seq);

        // 254, 255, 0
        assert_eq!(seq, 0);
        assert_eq!(framed[3], 254);
        assert_eq!(framed[4 + MAX_ENVELOPE_SIZE + 3], 255);
        assert_eq!(framed[(4 + MAX_ENVELOPE_SIZE) * 2 + 3], 0);

        let mut slicer = EnvelopeSlicer::new();
        // seed expectation from the first header
        slicer.extend(&framed);
        let packet = slicer.next_packet().unwrap().unwrap();

        assert_eq!(packet.seq, 0);
        assert_eq!(packet.total_len(), payload.len() as u64);
        assert_eq!(packet.buffers().len(), 3);
    }

    #[test]
    fn it_emits_an_empty_logical_packet() {
        let mut slicer = EnvelopeSlicer::new();
        slicer.extend(b"\x00\x00\x00\x00");

        let packet = slicer.next_packet().unwrap().unwrap();

        assert_eq!(packet.total_len(), 0);
        assert_eq!(packet.first_byte(), None);
    }
}
