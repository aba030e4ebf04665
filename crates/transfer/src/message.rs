//! Wire format of archive chunks
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! u16 message id | i32 total archive size | u32 payload length | payload
//! ```
//!
//! Every chunk repeats the full archive size; the receiver appends payloads
//! in arrival order until it holds that many bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use sdkpack_errors::TransferError;

/// Length of the fixed frame header
pub const HEADER_LEN: usize = 2 + 4 + 4;

/// Largest archive the 32-bit size field can describe
pub const MAX_ARCHIVE_SIZE: u64 = i32::MAX as u64;

/// Client interface message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u16);

impl MessageId {
    /// "import client SDK" chunk
    pub const IMPORT_CLIENT_SDK: Self = Self(0x01F5);
}

/// One slice of a generated SDK archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportChunk {
    total_size: u32,
    payload: Bytes,
}

impl ImportChunk {
    /// Create a chunk; `total_size` must fit the signed 32-bit wire field
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MalformedChunk` if the total size or payload
    /// is larger than the wire format allows.
    pub fn new(total_size: u64, payload: Bytes) -> Result<Self, TransferError> {
        if total_size > MAX_ARCHIVE_SIZE || payload.len() as u64 > total_size {
            return Err(TransferError::MalformedChunk {
                message: format!(
                    "payload of {} bytes does not fit archive size {total_size}",
                    payload.len()
                ),
            });
        }
        Ok(Self {
            // Checked against MAX_ARCHIVE_SIZE above
            total_size: u32::try_from(total_size).unwrap_or(u32::MAX),
            payload,
        })
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        u64::from(self.total_size)
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Messages a transfer task sends to its peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ImportClientSdk(ImportChunk),
}

impl Message {
    #[must_use]
    pub fn id(&self) -> MessageId {
        match self {
            Self::ImportClientSdk(_) => MessageId::IMPORT_CLIENT_SDK,
        }
    }

    /// Encode the message into a single frame
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::ImportClientSdk(chunk) => {
                let mut buf = BytesMut::with_capacity(HEADER_LEN + chunk.payload.len());
                buf.put_u16_le(self.id().0);
                buf.put_i32_le(i32::try_from(chunk.total_size).unwrap_or(i32::MAX));
                buf.put_u32_le(u32::try_from(chunk.payload.len()).unwrap_or(u32::MAX));
                buf.put_slice(&chunk.payload);
                buf.freeze()
            }
        }
    }

    /// Decode one complete frame
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MalformedChunk` for short frames, unknown
    /// message ids, negative sizes, or a payload length that does not match
    /// the bytes present.
    pub fn decode(mut frame: Bytes) -> Result<Self, TransferError> {
        if frame.len() < HEADER_LEN {
            return Err(malformed(format!("frame of {} bytes is too short", frame.len())));
        }

        let id = MessageId(frame.get_u16_le());
        if id != MessageId::IMPORT_CLIENT_SDK {
            return Err(malformed(format!("unknown message id {:#06x}", id.0)));
        }

        let total_size = frame.get_i32_le();
        let total_size =
            u64::try_from(total_size).map_err(|_| malformed(format!("negative size {total_size}")))?;

        let len = frame.get_u32_le() as usize;
        if frame.remaining() != len {
            return Err(malformed(format!(
                "payload length {len} does not match {} remaining bytes",
                frame.remaining()
            )));
        }

        ImportChunk::new(total_size, frame).map(Self::ImportClientSdk)
    }
}

fn malformed(message: String) -> TransferError {
    TransferError::MalformedChunk { message }
}

/// Progress of a receiving-side reassembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    InProgress { received: u64, total: u64 },
    Complete(Bytes),
}

/// Rebuilds an archive from consecutive chunks
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    total: Option<u64>,
    data: BytesMut,
    chunks: u64,
}

impl ChunkAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MalformedChunk` if the chunk disagrees with the
    /// total size announced by earlier chunks, overruns it, or arrives after
    /// the archive was complete.
    pub fn push(&mut self, chunk: &ImportChunk) -> Result<Assembly, TransferError> {
        let total = *self.total.get_or_insert(chunk.total_size());
        if chunk.total_size() != total {
            return Err(malformed(format!(
                "chunk announces {} bytes, transfer started with {total}",
                chunk.total_size()
            )));
        }

        let received = self.data.len() as u64;
        if received == total {
            return Err(malformed("chunk received after archive completed".to_string()));
        }
        if received + chunk.payload().len() as u64 > total {
            return Err(malformed(format!(
                "chunk of {} bytes overruns archive at offset {received} of {total}",
                chunk.payload().len()
            )));
        }

        self.data.extend_from_slice(chunk.payload());
        self.chunks += 1;

        let received = self.data.len() as u64;
        if received == total {
            Ok(Assembly::Complete(self.data.clone().freeze()))
        } else {
            Ok(Assembly::InProgress { received, total })
        }
    }

    /// Number of chunks accepted so far
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(total: u64, payload: &[u8]) -> ImportChunk {
        ImportChunk::new(total, Bytes::copy_from_slice(payload)).unwrap()
    }

    #[test]
    fn frame_layout_is_little_endian() {
        let frame = Message::ImportClientSdk(chunk(10_000, b"PK\x03\x04")).encode();
        assert_eq!(frame.len(), HEADER_LEN + 4);
        assert_eq!(&frame[0..2], &0x01F5u16.to_le_bytes());
        assert_eq!(&frame[2..6], &10_000i32.to_le_bytes());
        assert_eq!(&frame[6..10], &4u32.to_le_bytes());
        assert_eq!(&frame[10..], b"PK\x03\x04");
    }

    #[test]
    fn decode_restores_chunk() {
        let original = Message::ImportClientSdk(chunk(7, b"abc"));
        let decoded = Message::decode(original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let frame = Message::ImportClientSdk(chunk(7, b"abc")).encode();
        let err = Message::decode(frame.slice(..frame.len() - 1)).unwrap_err();
        assert!(matches!(err, TransferError::MalformedChunk { .. }));
    }

    #[test]
    fn decode_rejects_unknown_id() {
        let mut frame = BytesMut::from(&Message::ImportClientSdk(chunk(3, b"abc")).encode()[..]);
        frame[0] = 0xFF;
        frame[1] = 0xFF;
        assert!(Message::decode(frame.freeze()).is_err());
    }

    #[test]
    fn decode_rejects_negative_size() {
        let mut frame = BytesMut::new();
        frame.put_u16_le(MessageId::IMPORT_CLIENT_SDK.0);
        frame.put_i32_le(-1);
        frame.put_u32_le(0);
        assert!(Message::decode(frame.freeze()).is_err());
    }

    #[test]
    fn chunk_larger_than_archive_is_rejected() {
        assert!(ImportChunk::new(2, Bytes::from_static(b"abc")).is_err());
        assert!(ImportChunk::new(MAX_ARCHIVE_SIZE + 1, Bytes::new()).is_err());
    }

    #[test]
    fn assembler_rebuilds_archive() {
        let mut assembler = ChunkAssembler::new();
        assert_eq!(
            assembler.push(&chunk(5, b"he")).unwrap(),
            Assembly::InProgress { received: 2, total: 5 }
        );
        assert_eq!(
            assembler.push(&chunk(5, b"llo")).unwrap(),
            Assembly::Complete(Bytes::from_static(b"hello"))
        );
        assert_eq!(assembler.chunks(), 2);
        assert!(assembler.push(&chunk(5, b"!")).is_err());
    }

    #[test]
    fn assembler_rejects_size_change() {
        let mut assembler = ChunkAssembler::new();
        assembler.push(&chunk(5, b"he")).unwrap();
        assert!(assembler.push(&chunk(6, b"llo")).is_err());
    }

    #[test]
    fn assembler_rejects_overrun() {
        let mut assembler = ChunkAssembler::new();
        assembler.push(&chunk(4, b"he")).unwrap();
        assert!(assembler.push(&chunk(4, b"llo")).is_err());
    }
}
