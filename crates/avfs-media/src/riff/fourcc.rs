//! Four-character codes and chunk headers.

use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// Four-character RIFF code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const LIST: Self = Self(*b"LIST");
    pub const JUNK: Self = Self(*b"JUNK");
    pub const AVI: Self = Self(*b"AVI ");
    pub const AVIX: Self = Self(*b"AVIX");
    pub const HDRL: Self = Self(*b"hdrl");
    pub const AVIH: Self = Self(*b"avih");
    pub const STRL: Self = Self(*b"strl");
    pub const STRH: Self = Self(*b"strh");
    pub const STRF: Self = Self(*b"strf");
    pub const INDX: Self = Self(*b"indx");
    pub const ODML: Self = Self(*b"odml");
    pub const DMLH: Self = Self(*b"dmlh");
    pub const MOVI: Self = Self(*b"movi");
    pub const IDX1: Self = Self(*b"idx1");
    pub const VIDS: Self = Self(*b"vids");
    pub const AUDS: Self = Self(*b"auds");

    /// Uncompressed RGB handler.
    pub const DIB: Self = Self(*b"DIB ");
    /// BI_RGB compression (all zero).
    pub const BI_RGB: Self = Self([0; 4]);
    pub const YUY2: Self = Self(*b"YUY2");
    pub const YV12: Self = Self(*b"YV12");
    pub const YV16: Self = Self(*b"YV16");
    pub const YV24: Self = Self(*b"YV24");
    pub const Y800: Self = Self(*b"Y800");

    /// Uncompressed video data chunk.
    pub const VIDEO_DIB: Self = Self(*b"00db");
    /// Compressed (or non-RGB) video data chunk.
    pub const VIDEO_COMPRESSED: Self = Self(*b"00dc");
    /// Audio data chunk.
    pub const AUDIO: Self = Self(*b"01wb");
    pub const VIDEO_INDEX: Self = Self(*b"ix00");
    pub const AUDIO_INDEX: Self = Self(*b"ix01");

    /// Parse a user supplied code from its first four characters.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() < 4 || !s.is_ascii() {
            return None;
        }
        Some(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Little-endian integer value as stored in RIFF structures.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// True for chunk ids that carry a list type after the header.
    pub fn is_list(self) -> bool {
        self == Self::RIFF || self == Self::LIST
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == [0; 4] {
            return write!(f, "0x00000000");
        }
        write!(f, "{}", self.as_str())
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Round a chunk payload size up to the RIFF word boundary.
pub const fn align_up(size: u64) -> u64 {
    (size + 1) & !1
}

/// Eight byte chunk header: id followed by little-endian payload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: FourCC,
    pub size: u32,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    pub fn new(id: FourCC, size: u32) -> Self {
        Self { id, size }
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.id.0);
        buf.put_u32_le(self.size);
    }

    /// Write a `RIFF` or `LIST` header followed by its list type.
    pub fn write_list<B: BufMut>(buf: &mut B, id: FourCC, size: u32, list_type: FourCC) {
        Self::new(id, size).write(buf);
        buf.put_slice(&list_type.0);
    }

    pub fn parse<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(Error::BufferUnderflow {
                need: Self::SIZE,
                have: buf.remaining(),
            });
        }
        let mut id = [0u8; 4];
        buf.copy_to_slice(&mut id);
        Ok(Self {
            id: FourCC(id),
            size: buf.get_u32_le(),
        })
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        self.write(&mut &mut out[..]);
        out
    }
}
