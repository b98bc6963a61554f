//! Fixed byte layout of the AVI segments.

use crate::riff::{
    BitmapInfoHeader, ExtendedHeader, IndexHeader, LegacyIndexEntry, MainHeader, Record,
    StdIndexEntry, StreamHeader, SuperIndexEntry,
};

/// Chunk header: id and size.
pub const CHUNK_HEADER_SIZE: usize = 8;
/// `RIFF`/`LIST` header: id, size and list type.
pub const LIST_HEADER_SIZE: usize = 12;

/// Maximum number of segments, and capacity of each super index.
pub const MAX_SEGMENTS: usize = 5000;

/// `indx` chunk including header and all entries.
pub const SUPER_INDEX_SIZE: usize =
    CHUNK_HEADER_SIZE + IndexHeader::SIZE + MAX_SEGMENTS * SuperIndexEntry::SIZE;

/// `LIST strl` with `strh`, a 40 byte `strf` and `indx`. The audio format
/// record is the same size as the bitmap header, so both lists match.
pub const STRL_SIZE: usize = LIST_HEADER_SIZE
    + CHUNK_HEADER_SIZE
    + StreamHeader::SIZE
    + CHUNK_HEADER_SIZE
    + BitmapInfoHeader::SIZE
    + SUPER_INDEX_SIZE;

/// `LIST odml` holding `dmlh`.
pub const ODML_SIZE: usize = LIST_HEADER_SIZE + CHUNK_HEADER_SIZE + ExtendedHeader::SIZE;

/// Spare header room left as `JUNK`.
pub const HDRL_JUNK_SIZE: usize = 32 + 10 * 1024;

/// `LIST hdrl` in the first segment.
pub const HDRL_SIZE: usize = LIST_HEADER_SIZE
    + CHUNK_HEADER_SIZE
    + MainHeader::SIZE
    + 2 * STRL_SIZE
    + ODML_SIZE
    + HDRL_JUNK_SIZE;

/// Offset of the `LIST movi` header in the first segment.
pub const FIRST_MOVI_OFFSET: usize = LIST_HEADER_SIZE + HDRL_SIZE;
/// Offset of the `LIST movi` header in later segments.
pub const NEXT_MOVI_OFFSET: usize = LIST_HEADER_SIZE;

/// Header bytes before the first data chunk of the first segment.
pub const FIRST_HEADER_SIZE: usize = FIRST_MOVI_OFFSET + LIST_HEADER_SIZE;
/// Header bytes before the first data chunk of later segments.
pub const NEXT_HEADER_SIZE: usize = NEXT_MOVI_OFFSET + LIST_HEADER_SIZE;

/// Offsets of patched fields in the first segment.
pub const AVIH_OFFSET: usize = LIST_HEADER_SIZE * 2;
pub const MAX_BYTES_PER_SEC_OFFSET: usize = AVIH_OFFSET + CHUNK_HEADER_SIZE + 4;
pub const VIDEO_STRL_OFFSET: usize = AVIH_OFFSET + CHUNK_HEADER_SIZE + MainHeader::SIZE;
pub const AUDIO_STRL_OFFSET: usize = VIDEO_STRL_OFFSET + STRL_SIZE;
pub const ODML_OFFSET: usize = AUDIO_STRL_OFFSET + STRL_SIZE;
pub const HDRL_JUNK_OFFSET: usize = ODML_OFFSET + ODML_SIZE;

/// Offset of the `indx` chunk within a `strl` list.
const INDX_IN_STRL: usize = STRL_SIZE - SUPER_INDEX_SIZE;
/// Offset of the first super index entry within an `indx` chunk.
const ENTRIES_IN_INDX: usize = CHUNK_HEADER_SIZE + IndexHeader::SIZE;

pub const VIDEO_SUPER_ENTRIES_OFFSET: usize = VIDEO_STRL_OFFSET + INDX_IN_STRL + ENTRIES_IN_INDX;
pub const AUDIO_SUPER_ENTRIES_OFFSET: usize = AUDIO_STRL_OFFSET + INDX_IN_STRL + ENTRIES_IN_INDX;

/// `JUNK` padding before and after the index chunks of every segment.
pub const INDEX_PAD_SIZE: usize = 0x20000;

/// `ix##` chunk header plus index header.
pub const STD_INDEX_HEADER_SIZE: usize = CHUNK_HEADER_SIZE + IndexHeader::SIZE;
/// `idx1` chunk header.
pub const LEGACY_INDEX_HEADER_SIZE: usize = CHUNK_HEADER_SIZE;

/// Size of a standard index with `entries` entries.
pub const fn std_index_size(entries: u32) -> usize {
    STD_INDEX_HEADER_SIZE + entries as usize * StdIndexEntry::SIZE
}

/// Size of the legacy index with `entries` entries.
pub const fn legacy_index_size(entries: u32) -> usize {
    LEGACY_INDEX_HEADER_SIZE + entries as usize * LegacyIndexEntry::SIZE
}

/// Largest segment allowed by 32 bit RIFF sizes.
pub const MAX_SEGMENT_SIZE: u64 = 0xFFFF_FFFE;
/// Segment cap with small segments enabled.
pub const MAX_SMALL_SEGMENT_SIZE: u64 = 0x3FFF_FFFE;
