//! Container plan: every size, offset and index of the virtual AVI file.
//!
//! A plan is computed once per file by [`PlanBuilder`]. It stores the
//! serialized header and index bytes of each segment plus a per-frame
//! offset table, which is all the byte server needs to answer reads.
//! Media payloads are never stored.

mod builder;
mod layout;
mod timing;

pub use builder::PlanBuilder;
pub use layout::*;
pub use timing::AudioTiming;

use crate::riff::{FourCC, Record, SuperIndexEntry};
use bytes::BufMut;
use std::ops::Range;

/// Video stream layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VideoLayout {
    /// `00db` or `00dc`.
    pub chunk_id: FourCC,
    pub handler: FourCC,
    pub compression: FourCC,
    /// Payload bytes per frame.
    pub frame_size: u32,
    /// Zero bytes after each payload.
    pub pad: u32,
    /// Frames placed in the file.
    pub frame_count: u32,
}

/// Audio stream layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AudioLayout {
    /// Bytes per sample frame.
    pub sample_size: u32,
    /// Audio chunks placed in the file.
    pub chunk_count: u32,
    /// Samples covered by those chunks.
    pub sample_count: u64,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub timing: AudioTiming,
    /// Largest audio chunk for one frame, padded.
    pub max_chunk_size: u32,
}

/// The global two-level index: one entry per segment for each stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperIndex {
    pub video: Vec<SuperIndexEntry>,
    pub audio: Vec<SuperIndexEntry>,
}

impl SuperIndex {
    /// Write both entry tables into the first segment header.
    fn write_into(&self, header: &mut [u8]) {
        let mut video = &mut header[VIDEO_SUPER_ENTRIES_OFFSET..];
        for entry in &self.video {
            entry.write(&mut video);
        }
        let mut audio = &mut header[AUDIO_SUPER_ENTRIES_OFFSET..];
        for entry in &self.audio {
            entry.write(&mut audio);
        }
    }
}

/// One `RIFF` segment of the file.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: u32,
    /// File offset of the `RIFF` header.
    pub start_offset: u64,
    /// Total segment size in bytes.
    pub size: u32,
    /// First file frame in this segment.
    pub start_frame: u32,
    pub frame_count: u32,
    /// Frames with a video chunk.
    pub video_frames: u32,
    /// Frames with an audio chunk.
    pub audio_chunks: u32,
    /// Extra frames of audio packed into the last audio chunk.
    pub last_chunk_extra: u32,
    /// Bytes of interleaved data chunks.
    pub data_size: u32,
    /// Data offset of each frame's first chunk, relative to the data start.
    frame_offsets: Vec<u32>,
    /// Header and index bytes, back to back.
    arena: Vec<u8>,
    header: Range<usize>,
    video_index: Range<usize>,
    audio_index: Range<usize>,
    legacy_index: Range<usize>,
}

impl Segment {
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.size as u64
    }

    /// Serialized `RIFF` header through the `LIST movi` header.
    pub fn header(&self) -> &[u8] {
        &self.arena[self.header.clone()]
    }

    /// Serialized `ix00` chunk.
    pub fn video_index(&self) -> &[u8] {
        &self.arena[self.video_index.clone()]
    }

    /// Serialized `ix01` chunk, empty without audio.
    pub fn audio_index(&self) -> &[u8] {
        &self.arena[self.audio_index.clone()]
    }

    /// Serialized `idx1` chunk, only present in the first segment.
    pub fn legacy_index(&self) -> &[u8] {
        &self.arena[self.legacy_index.clone()]
    }

    pub fn frame_offsets(&self) -> &[u32] {
        &self.frame_offsets
    }

    /// Offset of the first data chunk relative to the segment start.
    pub fn data_offset(&self) -> u64 {
        self.header.len() as u64
    }

    /// Offset of the first index chunk relative to the segment start.
    pub fn index_offset(&self) -> u64 {
        self.data_offset() + self.data_size as u64 + INDEX_PAD_SIZE as u64
    }

    /// Frame whose chunks contain data offset `offset`, and the offset
    /// within that frame.
    pub fn locate_frame(&self, offset: u64) -> (u32, u64) {
        let idx = self
            .frame_offsets
            .partition_point(|&o| o as u64 <= offset)
            .saturating_sub(1);
        let base = self.frame_offsets.get(idx).copied().unwrap_or(0) as u64;
        (idx as u32, offset - base)
    }
}

/// The complete layout of one virtual AVI file.
#[derive(Debug, Clone)]
pub struct ContainerPlan {
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub video: VideoLayout,
    pub audio: Option<AudioLayout>,
    /// Frames (chunk groups) in the file.
    pub frame_count: u32,
    /// Longest stream duration in frames.
    pub duration_frames: u32,
    pub max_segment_frames: u32,
    pub segments: Vec<Segment>,
    pub super_index: SuperIndex,
}

impl ContainerPlan {
    /// Segment containing file offset `offset`.
    pub fn segment_index_at(&self, offset: u64) -> usize {
        self.segments
            .partition_point(|s| s.start_offset <= offset)
            .saturating_sub(1)
    }

    /// Audio chunk `frame` of `segment`: start sample and sample count.
    pub fn audio_chunk(&self, segment: &Segment, frame: u32) -> (u64, u64) {
        let Some(audio) = &self.audio else {
            return (0, 0);
        };
        let count = if frame + 1 == segment.audio_chunks {
            segment.last_chunk_extra + 1
        } else {
            1
        };
        audio.timing.locate(segment.start_frame + frame, count)
    }

    /// Patch the first segment header once all segments are known.
    fn finish_header(&mut self, max_bytes_per_sec: u32) {
        let Some(first) = self.segments.first_mut() else {
            return;
        };
        let header = &mut first.arena[first.header.clone()];
        self.super_index.write_into(header);
        (&mut header[MAX_BYTES_PER_SEC_OFFSET..]).put_u32_le(max_bytes_per_sec);
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            file_size: self.file_size,
            width: self.width,
            height: self.height,
            fps_num: self.fps_num,
            fps_den: self.fps_den,
            frame_count: self.frame_count,
            duration_frames: self.duration_frames,
            max_segment_frames: self.max_segment_frames,
            video: self.video.clone(),
            audio: self.audio.clone(),
            segments: self
                .segments
                .iter()
                .map(|s| SegmentSummary {
                    index: s.index,
                    start_offset: s.start_offset,
                    size: s.size,
                    start_frame: s.start_frame,
                    frame_count: s.frame_count,
                    video_frames: s.video_frames,
                    audio_chunks: s.audio_chunks,
                })
                .collect(),
        }
    }
}

/// Owned overview of a plan for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PlanSummary {
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub frame_count: u32,
    pub duration_frames: u32,
    pub max_segment_frames: u32,
    pub video: VideoLayout,
    pub audio: Option<AudioLayout>,
    pub segments: Vec<SegmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SegmentSummary {
    pub index: u32,
    pub start_offset: u64,
    pub size: u32,
    pub start_frame: u32,
    pub frame_count: u32,
    pub video_frames: u32,
    pub audio_chunks: u32,
}
