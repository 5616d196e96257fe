use crate::protocol::envelope::LogicalPacket;
use crate::protocol::field_reader::FieldReader;

/// One undecoded result row.
///
/// The engine does not interpret column bytes; it hands the reassembled
/// packet to the caller, who streams values out through a
/// [`FieldReader`]. A binary-protocol row additionally carries its
/// `0x00` header and NULL bitmap in front of the values; `binary`
/// records which framing applies.
#[derive(Debug, Clone)]
pub struct Row {
    packet: LogicalPacket,
    binary: bool,
}

impl Row {
    pub(crate) fn new(packet: LogicalPacket, binary: bool) -> Self {
        Self { packet, binary }
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn total_len(&self) -> u64 {
        self.packet.total_len()
    }

    /// A reader positioned at the first payload byte. Selects large mode
    /// by itself when the row passes `i32::MAX` bytes.
    pub fn reader(&self) -> FieldReader {
        FieldReader::new(self.packet.clone())
    }

    /// Releases this handle, returning the reader over the row content.
    pub fn into_reader(self) -> FieldReader {
        FieldReader::new(self.packet)
    }
}
