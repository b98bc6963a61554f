//! Fixed-size AVI and OpenDML records.
//!
//! Every record knows its exact serialized payload size. Chunk headers are
//! written separately with [`ChunkHeader`](super::ChunkHeader).

use super::FourCC;
use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// A fixed-size little-endian record.
pub trait Record: Sized {
    /// Serialized size in bytes.
    const SIZE: usize;

    fn write<B: BufMut>(&self, buf: &mut B);

    fn read<B: Buf>(buf: &mut B) -> Self;

    /// Parse a record, checking that enough bytes remain.
    fn parse<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(Error::BufferUnderflow {
                need: Self::SIZE,
                have: buf.remaining(),
            });
        }
        Ok(Self::read(buf))
    }
}

fn get_fourcc<B: Buf>(buf: &mut B) -> FourCC {
    let mut code = [0u8; 4];
    buf.copy_to_slice(&mut code);
    FourCC(code)
}

/// `avih` flag: the file carries an `idx1` index.
pub const AVIF_HASINDEX: u32 = 0x10;
/// `avih` flag: chunks are interleaved.
pub const AVIF_ISINTERLEAVED: u32 = 0x100;
/// `idx1` flag: the chunk is a keyframe.
pub const AVIIF_KEYFRAME: u32 = 0x10;

/// Index of indexes.
pub const AVI_INDEX_OF_INDEXES: u8 = 0;
/// Index of chunks.
pub const AVI_INDEX_OF_CHUNKS: u8 = 1;

/// `avih` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl Record for MainHeader {
    const SIZE: usize = 56;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.micro_sec_per_frame);
        buf.put_u32_le(self.max_bytes_per_sec);
        buf.put_u32_le(self.padding_granularity);
        buf.put_u32_le(self.flags);
        buf.put_u32_le(self.total_frames);
        buf.put_u32_le(self.initial_frames);
        buf.put_u32_le(self.streams);
        buf.put_u32_le(self.suggested_buffer_size);
        buf.put_u32_le(self.width);
        buf.put_u32_le(self.height);
        // dwReserved[4]
        buf.put_bytes(0, 16);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        let header = Self {
            micro_sec_per_frame: buf.get_u32_le(),
            max_bytes_per_sec: buf.get_u32_le(),
            padding_granularity: buf.get_u32_le(),
            flags: buf.get_u32_le(),
            total_frames: buf.get_u32_le(),
            initial_frames: buf.get_u32_le(),
            streams: buf.get_u32_le(),
            suggested_buffer_size: buf.get_u32_le(),
            width: buf.get_u32_le(),
            height: buf.get_u32_le(),
        };
        buf.advance(16);
        header
    }
}

/// `strh` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHeader {
    pub fcc_type: FourCC,
    pub fcc_handler: FourCC,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    /// left, top, right, bottom
    pub frame: [i16; 4],
}

impl Record for StreamHeader {
    const SIZE: usize = 56;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.fcc_type.0);
        buf.put_slice(&self.fcc_handler.0);
        buf.put_u32_le(self.flags);
        buf.put_u16_le(self.priority);
        buf.put_u16_le(self.language);
        buf.put_u32_le(self.initial_frames);
        buf.put_u32_le(self.scale);
        buf.put_u32_le(self.rate);
        buf.put_u32_le(self.start);
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.suggested_buffer_size);
        buf.put_u32_le(self.quality);
        buf.put_u32_le(self.sample_size);
        for v in self.frame {
            buf.put_i16_le(v);
        }
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            fcc_type: get_fourcc(buf),
            fcc_handler: get_fourcc(buf),
            flags: buf.get_u32_le(),
            priority: buf.get_u16_le(),
            language: buf.get_u16_le(),
            initial_frames: buf.get_u32_le(),
            scale: buf.get_u32_le(),
            rate: buf.get_u32_le(),
            start: buf.get_u32_le(),
            length: buf.get_u32_le(),
            suggested_buffer_size: buf.get_u32_le(),
            quality: buf.get_u32_le(),
            sample_size: buf.get_u32_le(),
            frame: [
                buf.get_i16_le(),
                buf.get_i16_le(),
                buf.get_i16_le(),
                buf.get_i16_le(),
            ],
        }
    }
}

/// BITMAPINFOHEADER video `strf` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitmapInfoHeader {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: FourCC,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl Record for BitmapInfoHeader {
    const SIZE: usize = 40;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(Self::SIZE as u32);
        buf.put_i32_le(self.width);
        buf.put_i32_le(self.height);
        buf.put_u16_le(self.planes);
        buf.put_u16_le(self.bit_count);
        buf.put_slice(&self.compression.0);
        buf.put_u32_le(self.size_image);
        buf.put_i32_le(self.x_pels_per_meter);
        buf.put_i32_le(self.y_pels_per_meter);
        buf.put_u32_le(self.clr_used);
        buf.put_u32_le(self.clr_important);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        buf.advance(4);
        Self {
            width: buf.get_i32_le(),
            height: buf.get_i32_le(),
            planes: buf.get_u16_le(),
            bit_count: buf.get_u16_le(),
            compression: get_fourcc(buf),
            size_image: buf.get_u32_le(),
            x_pels_per_meter: buf.get_i32_le(),
            y_pels_per_meter: buf.get_i32_le(),
            clr_used: buf.get_u32_le(),
            clr_important: buf.get_u32_le(),
        }
    }
}

/// WAVE_FORMAT_EXTENSIBLE tag.
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;
/// Size of the extension following WAVEFORMATEX.
pub const WAVE_FORMAT_EXTENSIBLE_CB_SIZE: u16 = 22;

/// Sub-format GUID tail shared by PCM and IEEE float.
const SUBFORMAT_GUID_TAIL: [u8; 12] = [
    0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// KSDATAFORMAT_SUBTYPE_PCM first field.
pub const SUBTYPE_PCM: u32 = 0x0000_0001;
/// KSDATAFORMAT_SUBTYPE_IEEE_FLOAT first field.
pub const SUBTYPE_IEEE_FLOAT: u32 = 0x0000_0003;

/// WAVEFORMATEXTENSIBLE audio `strf` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveFormatExtensible {
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    /// First GUID field; `SUBTYPE_PCM` or `SUBTYPE_IEEE_FLOAT`.
    pub sub_format: u32,
}

impl Record for WaveFormatExtensible {
    const SIZE: usize = 40;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_le(WAVE_FORMAT_EXTENSIBLE);
        buf.put_u16_le(self.channels);
        buf.put_u32_le(self.samples_per_sec);
        buf.put_u32_le(self.avg_bytes_per_sec);
        buf.put_u16_le(self.block_align);
        buf.put_u16_le(self.bits_per_sample);
        buf.put_u16_le(WAVE_FORMAT_EXTENSIBLE_CB_SIZE);
        buf.put_u16_le(self.valid_bits_per_sample);
        buf.put_u32_le(self.channel_mask);
        buf.put_u32_le(self.sub_format);
        buf.put_slice(&SUBFORMAT_GUID_TAIL);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        buf.advance(2);
        let channels = buf.get_u16_le();
        let samples_per_sec = buf.get_u32_le();
        let avg_bytes_per_sec = buf.get_u32_le();
        let block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();
        buf.advance(2);
        let valid_bits_per_sample = buf.get_u16_le();
        let channel_mask = buf.get_u32_le();
        let sub_format = buf.get_u32_le();
        buf.advance(SUBFORMAT_GUID_TAIL.len());
        Self {
            channels,
            samples_per_sec,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            valid_bits_per_sample,
            channel_mask,
            sub_format,
        }
    }
}

/// Header shared by super indexes and standard indexes, after the chunk header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexHeader {
    pub longs_per_entry: u16,
    pub index_sub_type: u8,
    pub index_type: u8,
    pub entries_in_use: u32,
    pub chunk_id: FourCC,
    pub base_offset: u64,
}

impl IndexHeader {
    /// Header of a super index (`indx`) pointing at standard indexes.
    pub fn super_index(chunk_id: FourCC, entries_in_use: u32) -> Self {
        Self {
            longs_per_entry: 4,
            index_sub_type: 0,
            index_type: AVI_INDEX_OF_INDEXES,
            entries_in_use,
            chunk_id,
            base_offset: 0,
        }
    }

    /// Header of a standard index (`ix##`) for one segment.
    pub fn standard_index(chunk_id: FourCC, entries_in_use: u32, base_offset: u64) -> Self {
        Self {
            longs_per_entry: 2,
            index_sub_type: 0,
            index_type: AVI_INDEX_OF_CHUNKS,
            entries_in_use,
            chunk_id,
            base_offset,
        }
    }
}

impl Record for IndexHeader {
    const SIZE: usize = 24;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_le(self.longs_per_entry);
        buf.put_u8(self.index_sub_type);
        buf.put_u8(self.index_type);
        buf.put_u32_le(self.entries_in_use);
        buf.put_slice(&self.chunk_id.0);
        buf.put_u32_le(self.base_offset as u32);
        buf.put_u32_le((self.base_offset >> 32) as u32);
        // dwReserved3
        buf.put_u32_le(0);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        let longs_per_entry = buf.get_u16_le();
        let index_sub_type = buf.get_u8();
        let index_type = buf.get_u8();
        let entries_in_use = buf.get_u32_le();
        let chunk_id = get_fourcc(buf);
        let low = buf.get_u32_le() as u64;
        let high = buf.get_u32_le() as u64;
        buf.advance(4);
        Self {
            longs_per_entry,
            index_sub_type,
            index_type,
            entries_in_use,
            chunk_id,
            base_offset: low | (high << 32),
        }
    }
}

/// One super index entry: where a standard index lives and what it covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuperIndexEntry {
    pub offset: u64,
    pub size: u32,
    pub duration: u32,
}

impl Record for SuperIndexEntry {
    const SIZE: usize = 16;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.offset as u32);
        buf.put_u32_le((self.offset >> 32) as u32);
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.duration);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        let low = buf.get_u32_le() as u64;
        let high = buf.get_u32_le() as u64;
        Self {
            offset: low | (high << 32),
            size: buf.get_u32_le(),
            duration: buf.get_u32_le(),
        }
    }
}

/// One standard index entry. The offset is relative to the index base
/// offset and points past the data chunk header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdIndexEntry {
    pub offset: u32,
    pub size: u32,
}

impl Record for StdIndexEntry {
    const SIZE: usize = 8;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.size);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            offset: buf.get_u32_le(),
            size: buf.get_u32_le(),
        }
    }
}

/// One `idx1` entry. The offset points at the data chunk header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyIndexEntry {
    pub chunk_id: FourCC,
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

impl Record for LegacyIndexEntry {
    const SIZE: usize = 16;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.chunk_id.0);
        buf.put_u32_le(self.flags);
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.size);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        Self {
            chunk_id: get_fourcc(buf),
            flags: buf.get_u32_le(),
            offset: buf.get_u32_le(),
            size: buf.get_u32_le(),
        }
    }
}

/// `dmlh` payload: total frame count followed by reserved space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedHeader {
    pub grand_frames: u32,
}

impl Record for ExtendedHeader {
    const SIZE: usize = 248;

    fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.grand_frames);
        buf.put_bytes(0, Self::SIZE - 4);
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        let grand_frames = buf.get_u32_le();
        buf.advance(Self::SIZE - 4);
        Self { grand_frames }
    }
}
