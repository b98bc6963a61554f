//! Plan builder.

use super::layout::*;
use super::{AudioLayout, AudioTiming, ContainerPlan, Segment, SuperIndex, VideoLayout};
use crate::riff::{
    align_up, BitmapInfoHeader, ChunkHeader, ExtendedHeader, FourCC, IndexHeader,
    LegacyIndexEntry, MainHeader, Record, StdIndexEntry, StreamHeader, SuperIndexEntry,
    WaveFormatExtensible, AVIF_HASINDEX, AVIF_ISINTERLEAVED, AVIIF_KEYFRAME, SUBTYPE_IEEE_FLOAT,
    SUBTYPE_PCM,
};
use crate::source::{AudioInfo, AviOptions, ClipInfo, VideoInfo};
use crate::{Error, Result};
use bytes::BufMut;

/// Frame and chunk counts of one segment, decided before any bytes are written.
#[derive(Debug, Clone)]
struct SegmentSpec {
    start_frame: u32,
    frame_count: u32,
    video_frames: u32,
    audio_chunks: u32,
    last_chunk_extra: u32,
    header_size: usize,
    video_index_size: usize,
    audio_index_size: usize,
    legacy_index_size: usize,
}

impl SegmentSpec {
    fn arena_size(&self) -> usize {
        self.header_size + self.video_index_size + self.audio_index_size + self.legacy_index_size
    }
}

/// Clip-wide values shared by every segment.
struct Stream<'a> {
    video_info: &'a VideoInfo,
    audio_info: Option<&'a AudioInfo>,
    video: VideoLayout,
    audio: Option<AudioLayout>,
    frame_count: u32,
    duration_frames: u32,
    max_segment_frames: u32,
    no_interleave: bool,
}

/// Builds a [`ContainerPlan`] from clip properties.
pub struct PlanBuilder<'a> {
    info: &'a ClipInfo,
    options: AviOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(info: &'a ClipInfo) -> Self {
        Self {
            info,
            options: AviOptions::default(),
        }
    }

    pub fn options(mut self, options: AviOptions) -> Self {
        self.options = options;
        self
    }

    /// Lay out the whole file.
    ///
    /// The first pass decides how frames fall into segments and reserves
    /// every segment's storage. The second pass serializes each segment in
    /// order, recording it in the super index, which is written into the
    /// first segment header last.
    pub fn build(self) -> Result<ContainerPlan> {
        let stream = self.stream()?;
        let specs = self.partition(&stream)?;

        let mut arenas = Vec::new();
        arenas
            .try_reserve_exact(specs.len())
            .map_err(|_| Error::Allocation {
                what: "segment table",
                bytes: specs.len() * std::mem::size_of::<Segment>(),
            })?;
        for spec in &specs {
            arenas.push((
                zeroed(spec.arena_size(), "segment headers and indexes")?,
                reserve_offsets(spec.frame_count)?,
            ));
        }

        let mut super_index = SuperIndex::default();
        let mut segments = Vec::with_capacity(specs.len());
        let mut offset = 0u64;
        for (i, (spec, (arena, frame_offsets))) in specs.iter().zip(arenas).enumerate() {
            let segment = fill_segment(
                &stream,
                i as u32,
                specs.len() as u32,
                spec,
                offset,
                arena,
                frame_offsets,
                &mut super_index,
            )?;
            offset = segment.end_offset();
            segments.push(segment);
        }
        debug_assert_eq!(
            segments.iter().map(|s: &Segment| s.video_frames).sum::<u32>(),
            stream.video.frame_count
        );
        debug_assert_eq!(
            segments.iter().map(|s: &Segment| s.frame_count).sum::<u32>(),
            stream.frame_count
        );

        let file_size = offset;
        let seconds = ((stream.duration_frames as u64 * stream.video_info.fps_den as u64
            + stream.video_info.fps_num as u64 / 2)
            / stream.video_info.fps_num as u64)
            .max(1);
        let max_bytes_per_sec = u32::try_from(file_size / seconds).unwrap_or(u32::MAX);

        let mut plan = ContainerPlan {
            file_size,
            width: stream.video_info.width,
            height: stream.video_info.height,
            fps_num: stream.video_info.fps_num,
            fps_den: stream.video_info.fps_den,
            video: stream.video,
            audio: stream.audio,
            frame_count: stream.frame_count,
            duration_frames: stream.duration_frames,
            max_segment_frames: stream.max_segment_frames,
            segments,
            super_index,
        };
        plan.finish_header(max_bytes_per_sec);

        tracing::debug!(
            file_size,
            segments = plan.segments.len(),
            frames = plan.frame_count,
            "Planned AVI layout"
        );
        Ok(plan)
    }

    /// Validate the clip and derive clip-wide stream values.
    fn stream(&self) -> Result<Stream<'a>> {
        let video_info = self
            .info
            .video
            .as_ref()
            .filter(|v| v.frame_count > 0)
            .ok_or_else(|| Error::unsupported("clip has no video frames"))?;
        if video_info.fps_num == 0 || video_info.fps_den == 0 {
            return Err(Error::unsupported(format!(
                "invalid frame rate {}/{}",
                video_info.fps_num, video_info.fps_den
            )));
        }
        video_info
            .pixel_format
            .check_dimensions(video_info.width, video_info.height)?;
        if video_info.width > i16::MAX as u32 || video_info.height > i16::MAX as u32 {
            return Err(Error::unsupported(format!(
                "frame size {}x{} too large",
                video_info.width, video_info.height
            )));
        }

        let frame_size = u32::try_from(video_info.frame_size())
            .map_err(|_| Error::unsupported("frame payload exceeds 4 GiB"))?;
        let pad = (align_up(frame_size as u64) - frame_size as u64) as u32;
        let (handler, compression) = match self.options.video_fourcc {
            Some(code) => (code, code),
            None => (
                video_info.pixel_format.fourcc(),
                video_info.pixel_format.compression(),
            ),
        };
        let chunk_id = if handler == FourCC::DIB {
            FourCC::VIDEO_DIB
        } else {
            FourCC::VIDEO_COMPRESSED
        };

        let mut frame_count = video_info.frame_count;
        let mut duration_frames = video_info.frame_count;

        let audio_info = self.info.audio.as_ref().filter(|a| a.is_present());
        let audio = match audio_info {
            Some(info) => {
                let sample_size = info.sample_size();
                let mut timing = AudioTiming::new(
                    video_info.fps_num,
                    video_info.fps_den,
                    info.sample_rate,
                    info.sample_count,
                );
                let max_chunk_size =
                    align_up((timing.samples_per_frame() + 1) * sample_size as u64);
                let max_chunk_size = u32::try_from(max_chunk_size)
                    .map_err(|_| Error::unsupported("audio rate too high for frame rate"))?;

                let mut chunk_count = clamp_u32(timing.frames_covering_all());
                duration_frames = duration_frames.max(chunk_count);

                if !self.options.no_interleave {
                    timing.preroll_frames =
                        AudioTiming::interleave_preroll(video_info.fps_num, video_info.fps_den);
                    while chunk_count > 0 && timing.locate(chunk_count - 1, 1).1 == 0 {
                        chunk_count -= 1;
                    }
                }
                frame_count = frame_count.max(chunk_count);

                Some(AudioLayout {
                    sample_size,
                    chunk_count,
                    sample_count: info.sample_count,
                    timing,
                    max_chunk_size,
                })
            }
            None => None,
        };

        let preroll = audio.as_ref().map_or(0, |a| a.timing.preroll_frames as u64);
        let max_chunk = audio.as_ref().map_or(0, |a| a.max_chunk_size as u64);
        let segment_limit = if self.options.small_segments {
            MAX_SMALL_SEGMENT_SIZE
        } else {
            MAX_SEGMENT_SIZE
        };
        // Both standard index headers are reserved on top of the idx1 header
        // so a segment filled to the last frame stays under the limit.
        let capacity = segment_limit
            - FIRST_HEADER_SIZE as u64
            - 2 * STD_INDEX_HEADER_SIZE as u64
            - LEGACY_INDEX_HEADER_SIZE as u64;
        let fixed = preroll * max_chunk + 2 * INDEX_PAD_SIZE as u64;
        // Audio chunk, video chunk, two standard and two legacy index entries.
        let per_frame = (CHUNK_HEADER_SIZE as u64 + max_chunk)
            + (CHUNK_HEADER_SIZE as u64 + frame_size as u64 + pad as u64)
            + 2 * StdIndexEntry::SIZE as u64
            + 2 * LegacyIndexEntry::SIZE as u64;
        let max_segment_frames = capacity
            .checked_sub(fixed)
            .map(|room| room / per_frame)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "frame of {} bytes does not fit in a {} byte segment",
                    frame_size, segment_limit
                ))
            })?;
        let max_segment_frames = clamp_u32(max_segment_frames);

        let mut video = VideoLayout {
            chunk_id,
            handler,
            compression,
            frame_size,
            pad,
            frame_count: video_info.frame_count,
        };
        let mut audio = audio;

        let capped = MAX_SEGMENTS as u64 * max_segment_frames as u64;
        if frame_count as u64 > capped {
            let capped = capped as u32;
            tracing::warn!(
                frames = frame_count,
                kept = capped,
                "Clip exceeds {} segments, truncating",
                MAX_SEGMENTS
            );
            frame_count = capped;
            duration_frames = duration_frames.min(capped);
            video.frame_count = video.frame_count.min(capped);
            if let Some(audio) = audio.as_mut() {
                audio.chunk_count = audio.chunk_count.min(capped);
                audio.sample_count = audio.timing.locate(0, audio.chunk_count).1;
            }
        }

        Ok(Stream {
            video_info,
            audio_info,
            video,
            audio,
            frame_count,
            duration_frames,
            max_segment_frames,
            no_interleave: self.options.no_interleave,
        })
    }

    /// Split the file frames into segments.
    fn partition(&self, stream: &Stream<'_>) -> Result<Vec<SegmentSpec>> {
        let count = stream.frame_count.div_ceil(stream.max_segment_frames) as usize;
        let mut specs = Vec::new();
        specs.try_reserve_exact(count).map_err(|_| Error::Allocation {
            what: "segment specs",
            bytes: count * std::mem::size_of::<SegmentSpec>(),
        })?;

        let audio_chunks_total = stream.audio.as_ref().map_or(0, |a| a.chunk_count);
        let mut start_frame = 0u32;
        for i in 0..count {
            let frame_count = (stream.frame_count - start_frame).min(stream.max_segment_frames);
            let video_frames = stream
                .video
                .frame_count
                .saturating_sub(start_frame)
                .min(frame_count);
            let mut audio_chunks = audio_chunks_total
                .saturating_sub(start_frame)
                .min(frame_count);
            let mut last_chunk_extra = 0;
            if stream.no_interleave && audio_chunks > 0 {
                last_chunk_extra = audio_chunks - 1;
                audio_chunks = 1;
            }

            let first = i == 0;
            specs.push(SegmentSpec {
                start_frame,
                frame_count,
                video_frames,
                audio_chunks,
                last_chunk_extra,
                header_size: if first {
                    FIRST_HEADER_SIZE
                } else {
                    NEXT_HEADER_SIZE
                },
                video_index_size: std_index_size(video_frames),
                audio_index_size: if stream.audio.is_some() {
                    std_index_size(audio_chunks)
                } else {
                    0
                },
                legacy_index_size: if first {
                    legacy_index_size(video_frames + audio_chunks)
                } else {
                    0
                },
            });
            start_frame += frame_count;
        }
        Ok(specs)
    }
}

/// Serialize one segment into its reserved storage.
#[allow(clippy::too_many_arguments)]
fn fill_segment(
    stream: &Stream<'_>,
    index: u32,
    segment_count: u32,
    spec: &SegmentSpec,
    start_offset: u64,
    mut arena: Vec<u8>,
    mut frame_offsets: Vec<u32>,
    super_index: &mut SuperIndex,
) -> Result<Segment> {
    let first = index == 0;
    let header_end = spec.header_size;
    let video_index_end = header_end + spec.video_index_size;
    let audio_index_end = video_index_end + spec.audio_index_size;
    let legacy_index_end = audio_index_end + spec.legacy_index_size;

    let (header, rest) = arena.split_at_mut(header_end);
    let (video_index, rest) = rest.split_at_mut(spec.video_index_size);
    let (audio_index, legacy_index) = rest.split_at_mut(spec.audio_index_size);

    let mut video_entries = video_index.get_mut(STD_INDEX_HEADER_SIZE..).unwrap_or_default();
    let mut audio_entries = audio_index.get_mut(STD_INDEX_HEADER_SIZE..).unwrap_or_default();
    let mut legacy_entries = legacy_index
        .get_mut(LEGACY_INDEX_HEADER_SIZE..)
        .unwrap_or_default();

    // Data chunks start right after the header.
    let base = spec.header_size as u64;
    let mut data_size = 0u64;
    let mut segment_samples = 0u64;
    for f in 0..spec.frame_count {
        frame_offsets.push(data_size as u32);

        if let Some(audio) = stream.audio.as_ref().filter(|_| f < spec.audio_chunks) {
            let count = if f + 1 == spec.audio_chunks {
                spec.last_chunk_extra + 1
            } else {
                1
            };
            let (_, samples) = audio.timing.locate(spec.start_frame + f, count);
            segment_samples += samples;
            let bytes = samples * audio.sample_size as u64;
            StdIndexEntry {
                offset: (base + data_size + CHUNK_HEADER_SIZE as u64) as u32,
                size: bytes as u32,
            }
            .write(&mut audio_entries);
            if first {
                LegacyIndexEntry {
                    chunk_id: FourCC::AUDIO,
                    flags: AVIIF_KEYFRAME,
                    offset: (base + data_size) as u32,
                    size: bytes as u32,
                }
                .write(&mut legacy_entries);
            }
            data_size += CHUNK_HEADER_SIZE as u64 + align_up(bytes);
        }

        if f < spec.video_frames {
            let video = &stream.video;
            StdIndexEntry {
                offset: (base + data_size + CHUNK_HEADER_SIZE as u64) as u32,
                size: video.frame_size,
            }
            .write(&mut video_entries);
            if first {
                LegacyIndexEntry {
                    chunk_id: video.chunk_id,
                    flags: AVIIF_KEYFRAME,
                    offset: (base + data_size) as u32,
                    size: video.frame_size,
                }
                .write(&mut legacy_entries);
            }
            data_size +=
                CHUNK_HEADER_SIZE as u64 + video.frame_size as u64 + video.pad as u64;
        }
    }

    let mut size = base + data_size + INDEX_PAD_SIZE as u64;

    let mut video_index_head = &mut video_index[..];
    ChunkHeader::new(
        FourCC::VIDEO_INDEX,
        (spec.video_index_size - CHUNK_HEADER_SIZE) as u32,
    )
    .write(&mut video_index_head);
    IndexHeader::standard_index(stream.video.chunk_id, spec.video_frames, start_offset)
        .write(&mut video_index_head);
    super_index.video.push(SuperIndexEntry {
        offset: start_offset + size,
        size: spec.video_index_size as u32,
        duration: spec.video_frames,
    });
    size += spec.video_index_size as u64;

    if stream.audio.is_some() {
        let mut audio_index_head = &mut audio_index[..];
        ChunkHeader::new(
            FourCC::AUDIO_INDEX,
            (spec.audio_index_size - CHUNK_HEADER_SIZE) as u32,
        )
        .write(&mut audio_index_head);
        IndexHeader::standard_index(FourCC::AUDIO, spec.audio_chunks, start_offset)
            .write(&mut audio_index_head);
        super_index.audio.push(SuperIndexEntry {
            offset: start_offset + size,
            size: spec.audio_index_size as u32,
            duration: clamp_u32(segment_samples),
        });
        size += spec.audio_index_size as u64;
    }

    let movi_offset = if first {
        FIRST_MOVI_OFFSET
    } else {
        NEXT_MOVI_OFFSET
    } as u64;
    let movi_size = size - movi_offset - CHUNK_HEADER_SIZE as u64;

    if first {
        let mut legacy_head = &mut legacy_index[..];
        ChunkHeader::new(
            FourCC::IDX1,
            (spec.legacy_index_size - CHUNK_HEADER_SIZE) as u32,
        )
        .write(&mut legacy_head);
        size += spec.legacy_index_size as u64;
    }

    size += INDEX_PAD_SIZE as u64;
    check_segment_size(index, size)?;

    let mut out = &mut header[..];
    if first {
        write_first_header(
            stream,
            segment_count,
            spec,
            size as u32 - CHUNK_HEADER_SIZE as u32,
            movi_size as u32,
            &mut out,
        );
    } else {
        ChunkHeader::write_list(
            &mut out,
            FourCC::RIFF,
            size as u32 - CHUNK_HEADER_SIZE as u32,
            FourCC::AVIX,
        );
        ChunkHeader::write_list(&mut out, FourCC::LIST, movi_size as u32, FourCC::MOVI);
    }
    debug_assert!(out.is_empty());

    tracing::trace!(
        segment = index,
        start_offset,
        size,
        frames = spec.frame_count,
        "Laid out segment"
    );

    Ok(Segment {
        index,
        start_offset,
        size: size as u32,
        start_frame: spec.start_frame,
        frame_count: spec.frame_count,
        video_frames: spec.video_frames,
        audio_chunks: spec.audio_chunks,
        last_chunk_extra: spec.last_chunk_extra,
        data_size: data_size as u32,
        frame_offsets,
        arena,
        header: 0..header_end,
        video_index: header_end..video_index_end,
        audio_index: video_index_end..audio_index_end,
        legacy_index: audio_index_end..legacy_index_end,
    })
}

/// Serialize the first segment header. Super index entries and the data
/// rate are left zero and patched once the whole file is laid out.
fn write_first_header<B: BufMut>(
    stream: &Stream<'_>,
    segment_count: u32,
    spec: &SegmentSpec,
    riff_size: u32,
    movi_size: u32,
    out: &mut B,
) {
    let v = stream.video_info;
    let has_audio = stream.audio.is_some();

    ChunkHeader::write_list(out, FourCC::RIFF, riff_size, FourCC::AVI);
    ChunkHeader::write_list(
        out,
        FourCC::LIST,
        (HDRL_SIZE - CHUNK_HEADER_SIZE) as u32,
        FourCC::HDRL,
    );

    ChunkHeader::new(FourCC::AVIH, MainHeader::SIZE as u32).write(out);
    MainHeader {
        micro_sec_per_frame: ((1_000_000u64 * v.fps_den as u64 + v.fps_num as u64 / 2)
            / v.fps_num as u64) as u32,
        max_bytes_per_sec: 0,
        padding_granularity: 0,
        flags: AVIF_HASINDEX | AVIF_ISINTERLEAVED,
        total_frames: if segment_count == 1 {
            stream.duration_frames
        } else {
            spec.frame_count
        },
        initial_frames: 0,
        streams: 1 + has_audio as u32,
        suggested_buffer_size: 0,
        width: v.width,
        height: v.height,
    }
    .write(out);

    // Video stream list.
    ChunkHeader::write_list(
        out,
        FourCC::LIST,
        (STRL_SIZE - CHUNK_HEADER_SIZE) as u32,
        FourCC::STRL,
    );
    ChunkHeader::new(FourCC::STRH, StreamHeader::SIZE as u32).write(out);
    StreamHeader {
        fcc_type: FourCC::VIDS,
        fcc_handler: stream.video.handler,
        scale: v.fps_den,
        rate: v.fps_num,
        length: stream.video.frame_count,
        suggested_buffer_size: stream.video.frame_size,
        quality: u32::MAX,
        frame: [0, 0, v.width as i16, v.height as i16],
        ..Default::default()
    }
    .write(out);
    ChunkHeader::new(FourCC::STRF, BitmapInfoHeader::SIZE as u32).write(out);
    BitmapInfoHeader {
        width: v.width as i32,
        height: v.height as i32,
        planes: 1,
        bit_count: v.pixel_format.bits_per_pixel(),
        compression: stream.video.compression,
        size_image: stream.video.frame_size,
        ..Default::default()
    }
    .write(out);
    write_empty_super_index(out, stream.video.chunk_id, segment_count);

    // Audio stream list. Without audio the same fields stay in place under
    // a JUNK tag.
    let audio = stream.audio.as_ref().zip(stream.audio_info);
    let sample_size = audio.map_or(0, |(a, _)| a.sample_size);
    let sample_rate = audio.map_or(0, |(_, i)| i.sample_rate);
    ChunkHeader::write_list(
        out,
        if audio.is_some() {
            FourCC::LIST
        } else {
            FourCC::JUNK
        },
        (STRL_SIZE - CHUNK_HEADER_SIZE) as u32,
        FourCC::STRL,
    );
    ChunkHeader::new(FourCC::STRH, StreamHeader::SIZE as u32).write(out);
    let second_chunk_start = audio.map_or(0, |(a, _)| a.timing.locate(1, 1).0);
    StreamHeader {
        fcc_type: FourCC::AUDS,
        initial_frames: 1,
        scale: sample_size,
        rate: sample_rate.saturating_mul(sample_size),
        length: audio.map_or(0, |(a, _)| clamp_u32(a.sample_count)),
        suggested_buffer_size: clamp_u32((second_chunk_start + 1) * sample_size as u64),
        quality: u32::MAX,
        sample_size,
        ..Default::default()
    }
    .write(out);
    ChunkHeader::new(FourCC::STRF, WaveFormatExtensible::SIZE as u32).write(out);
    let bits = audio.map_or(0, |(_, i)| i.sample_format.bytes_per_sample() * 8);
    WaveFormatExtensible {
        channels: audio.map_or(0, |(_, i)| i.channels),
        samples_per_sec: sample_rate,
        avg_bytes_per_sec: sample_rate.saturating_mul(sample_size),
        block_align: sample_size as u16,
        bits_per_sample: bits,
        valid_bits_per_sample: bits,
        channel_mask: audio.map_or(0, |(_, i)| i.channel_mask()),
        sub_format: match audio {
            Some((_, i)) if i.sample_format.is_float() => SUBTYPE_IEEE_FLOAT,
            _ => SUBTYPE_PCM,
        },
    }
    .write(out);
    write_empty_super_index(out, FourCC::AUDIO, segment_count);

    ChunkHeader::write_list(
        out,
        FourCC::LIST,
        (ODML_SIZE - CHUNK_HEADER_SIZE) as u32,
        FourCC::ODML,
    );
    ChunkHeader::new(FourCC::DMLH, ExtendedHeader::SIZE as u32).write(out);
    ExtendedHeader {
        grand_frames: stream.duration_frames,
    }
    .write(out);

    ChunkHeader::new(FourCC::JUNK, (HDRL_JUNK_SIZE - CHUNK_HEADER_SIZE) as u32).write(out);
    out.put_bytes(0, HDRL_JUNK_SIZE - CHUNK_HEADER_SIZE);

    ChunkHeader::write_list(out, FourCC::LIST, movi_size, FourCC::MOVI);
}

fn write_empty_super_index<B: BufMut>(out: &mut B, chunk_id: FourCC, entries: u32) {
    ChunkHeader::new(FourCC::INDX, (SUPER_INDEX_SIZE - CHUNK_HEADER_SIZE) as u32).write(out);
    IndexHeader::super_index(chunk_id, entries).write(out);
    out.put_bytes(0, MAX_SEGMENTS * SuperIndexEntry::SIZE);
}

/// A segment must fit a 32-bit RIFF size and keep chunks word aligned.
fn check_segment_size(index: u32, size: u64) -> Result<()> {
    if size > MAX_SEGMENT_SIZE || size % 2 != 0 {
        return Err(Error::unsupported(format!(
            "segment {index} laid out to invalid size {size}"
        )));
    }
    Ok(())
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Allocate a zeroed buffer, reporting failure instead of aborting.
fn zeroed(len: usize, what: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { what, bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

fn reserve_offsets(frames: u32) -> Result<Vec<u32>> {
    let mut offsets = Vec::new();
    offsets
        .try_reserve_exact(frames as usize)
        .map_err(|_| Error::Allocation {
            what: "frame offset table",
            bytes: frames as usize * 4,
        })?;
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::riff::ChunkHeader;
    use crate::source::{PixelFormat, SampleFormat};

    const AVIH: usize = AVIH_OFFSET + CHUNK_HEADER_SIZE;
    const VIDEO_STRH: usize = VIDEO_STRL_OFFSET + LIST_HEADER_SIZE + CHUNK_HEADER_SIZE;
    const VIDEO_STRF: usize = VIDEO_STRH + StreamHeader::SIZE + CHUNK_HEADER_SIZE;
    const AUDIO_STRH: usize = AUDIO_STRL_OFFSET + LIST_HEADER_SIZE + CHUNK_HEADER_SIZE;
    const AUDIO_STRF: usize = AUDIO_STRH + StreamHeader::SIZE + CHUNK_HEADER_SIZE;
    const DMLH: usize = ODML_OFFSET + LIST_HEADER_SIZE + CHUNK_HEADER_SIZE;

    fn record<R: Record>(bytes: &[u8], offset: usize) -> R {
        R::parse(&mut &bytes[offset..]).unwrap()
    }

    fn chunk(bytes: &[u8], offset: usize) -> ChunkHeader {
        ChunkHeader::parse(&mut &bytes[offset..]).unwrap()
    }

    fn video_only(frames: u32) -> ClipInfo {
        ClipInfo {
            video: Some(
                VideoInfo::new(4, 4, PixelFormat::Y8)
                    .with_frames(frames)
                    .with_rate(25, 1),
            ),
            audio: None,
        }
    }

    fn with_stereo(mut info: ClipInfo, samples: u64) -> ClipInfo {
        info.audio = Some(AudioInfo::new(48000, 2, SampleFormat::S16).with_samples(samples));
        info
    }

    fn huge_clip() -> ClipInfo {
        with_stereo(
            ClipInfo {
                video: Some(
                    VideoInfo::new(8192, 8192, PixelFormat::Y8)
                        .with_frames(40)
                        .with_rate(25, 1),
                ),
                audio: None,
            },
            76800,
        )
    }

    fn small_segments() -> AviOptions {
        AviOptions {
            small_segments: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_video_only_single_segment() {
        let plan = PlanBuilder::new(&video_only(100)).build().unwrap();
        assert_eq!(plan.segments.len(), 1);
        assert!(plan.audio.is_none());

        let seg = &plan.segments[0];
        let header = seg.header();
        assert_eq!(header.len(), FIRST_HEADER_SIZE);
        assert_eq!(plan.file_size, seg.size as u64);
        assert_eq!(&header[..4], b"RIFF");
        assert_eq!(chunk(header, 0).size as u64, plan.file_size - 8);
        assert_eq!(&header[8..12], b"AVI ");

        let avih: MainHeader = record(header, AVIH);
        assert_eq!(avih.micro_sec_per_frame, 40_000);
        assert_eq!(avih.flags, 0x110);
        assert_eq!(avih.total_frames, 100);
        assert_eq!(avih.streams, 1);
        assert_eq!(avih.width, 4);
        assert_eq!(avih.max_bytes_per_sec as u64, plan.file_size / 4);

        // The unused audio slot keeps its stream list fields under JUNK.
        let junk = chunk(header, AUDIO_STRL_OFFSET);
        assert_eq!(junk.id, FourCC::JUNK);
        assert_eq!(junk.size as usize, STRL_SIZE - 8);
        assert_eq!(&header[AUDIO_STRL_OFFSET + 8..AUDIO_STRL_OFFSET + 12], b"strl");
        let strh: StreamHeader = record(header, AUDIO_STRH);
        assert_eq!(strh.fcc_type, FourCC::AUDS);
        assert_eq!(strh.initial_frames, 1);
        assert_eq!((strh.scale, strh.rate, strh.length), (0, 0, 0));
        assert_eq!(strh.quality, u32::MAX);
        let wfx: WaveFormatExtensible = record(header, AUDIO_STRF);
        assert_eq!((wfx.channels, wfx.samples_per_sec), (0, 0));
        let indx: IndexHeader = record(header, AUDIO_SUPER_ENTRIES_OFFSET - IndexHeader::SIZE);
        assert_eq!(indx.chunk_id, FourCC::AUDIO);
        assert_eq!(indx.entries_in_use, 1);
        assert!(header[AUDIO_SUPER_ENTRIES_OFFSET..AUDIO_SUPER_ENTRIES_OFFSET + 16]
            .iter()
            .all(|&b| b == 0));

        let legacy = seg.legacy_index();
        assert_eq!(chunk(legacy, 0).size, 100 * 16);
        for i in 0..100usize {
            let entry: LegacyIndexEntry = record(legacy, 8 + i * 16);
            assert_eq!(entry.chunk_id, FourCC::VIDEO_COMPRESSED);
            assert_eq!(entry.flags, AVIIF_KEYFRAME);
            assert_eq!(entry.size, 16);
            assert_eq!(entry.offset as usize, FIRST_HEADER_SIZE + i * 24);
        }

        let first: StdIndexEntry = record(seg.video_index(), STD_INDEX_HEADER_SIZE);
        assert_eq!(first.offset as usize, FIRST_HEADER_SIZE + 8);
        assert!(seg.audio_index().is_empty());
    }

    #[test]
    fn test_movi_and_index_positions() {
        let plan = PlanBuilder::new(&video_only(3)).build().unwrap();
        let seg = &plan.segments[0];
        let movi = chunk(seg.header(), FIRST_MOVI_OFFSET);
        assert_eq!(movi.id, FourCC::LIST);
        // movi covers data, the leading pad and both standard indexes.
        let movi_end = FIRST_MOVI_OFFSET as u64 + 8 + movi.size as u64;
        assert_eq!(
            movi_end,
            seg.index_offset() + seg.video_index().len() as u64
        );
        assert_eq!(
            seg.size as u64,
            movi_end + seg.legacy_index().len() as u64 + INDEX_PAD_SIZE as u64
        );
        assert_eq!(plan.super_index.video[0].offset, seg.index_offset());
        assert_eq!(plan.super_index.video[0].duration, 3);
    }

    #[test]
    fn test_rgb_uses_dib_chunks() {
        let mut info = video_only(2);
        info.video = Some(
            VideoInfo::new(3, 2, PixelFormat::Rgb24)
                .with_frames(2)
                .with_rate(30000, 1001),
        );
        let plan = PlanBuilder::new(&info).build().unwrap();
        assert_eq!(plan.video.chunk_id, FourCC::VIDEO_DIB);
        assert_eq!(plan.video.frame_size, 24);

        let header = plan.segments[0].header();
        let strh: StreamHeader = record(header, VIDEO_STRH);
        assert_eq!(strh.fcc_handler, FourCC::DIB);
        assert_eq!((strh.scale, strh.rate), (1001, 30000));
        assert_eq!(strh.frame, [0, 0, 3, 2]);
        let strf: BitmapInfoHeader = record(header, VIDEO_STRF);
        assert_eq!(strf.compression, FourCC::BI_RGB);
        assert_eq!(strf.bit_count, 24);
        assert_eq!(strf.size_image, 24);

        let avih: MainHeader = record(header, AVIH);
        assert_eq!(avih.micro_sec_per_frame, 33_367);
    }

    #[test]
    fn test_fourcc_override() {
        let options = AviOptions {
            video_fourcc: FourCC::parse("HFYU"),
            ..Default::default()
        };
        let plan = PlanBuilder::new(&video_only(1))
            .options(options)
            .build()
            .unwrap();
        assert_eq!(plan.video.handler, FourCC(*b"HFYU"));
        assert_eq!(plan.video.compression, FourCC(*b"HFYU"));
        assert_eq!(plan.video.chunk_id, FourCC::VIDEO_COMPRESSED);
    }

    #[test]
    fn test_odd_frame_size_is_padded() {
        let mut info = video_only(2);
        info.video = Some(VideoInfo::new(3, 3, PixelFormat::Yv24).with_frames(2));
        let plan = PlanBuilder::new(&info).build().unwrap();
        assert_eq!(plan.video.frame_size, 27);
        assert_eq!(plan.video.pad, 1);
        assert_eq!(plan.segments[0].frame_offsets(), &[0, 36]);
        assert_eq!(plan.segments[0].data_size, 72);
    }

    #[test]
    fn test_audio_stream_headers() {
        let info = with_stereo(video_only(25), 48000);
        let plan = PlanBuilder::new(&info).build().unwrap();
        let header = plan.segments[0].header();

        let avih: MainHeader = record(header, AVIH);
        assert_eq!(avih.streams, 2);

        let strh: StreamHeader = record(header, AUDIO_STRH);
        assert_eq!(strh.fcc_type, FourCC::AUDS);
        assert_eq!(strh.initial_frames, 1);
        assert_eq!(strh.scale, 4);
        assert_eq!(strh.rate, 192_000);
        assert_eq!(strh.length, 48000);
        assert_eq!(strh.sample_size, 4);
        // Chunk 1 starts after 13 frames of pre-roll audio.
        assert_eq!(strh.suggested_buffer_size, (13 * 1920 + 1) * 4);

        let strf: WaveFormatExtensible = record(header, AUDIO_STRF);
        assert_eq!(strf.channels, 2);
        assert_eq!(strf.block_align, 4);
        assert_eq!(strf.bits_per_sample, 16);
        assert_eq!(strf.channel_mask, 0x3);
        assert_eq!(strf.sub_format, SUBTYPE_PCM);

        let dmlh: ExtendedHeader = record(header, DMLH);
        assert_eq!(dmlh.grand_frames, 25);
    }

    #[test]
    fn test_audio_longer_than_video() {
        let info = with_stereo(video_only(10), 48000);
        let plan = PlanBuilder::new(&info).build().unwrap();
        let audio = plan.audio.as_ref().unwrap();
        // 25 frames of audio; chunks past 13 would be empty after pre-roll.
        assert_eq!(audio.chunk_count, 13);
        assert_eq!(plan.frame_count, 13);
        assert_eq!(plan.duration_frames, 25);

        let seg = &plan.segments[0];
        assert_eq!(seg.video_frames, 10);
        assert_eq!(seg.audio_chunks, 13);
        let avih: MainHeader = record(seg.header(), AVIH);
        assert_eq!(avih.total_frames, 25);
        assert_eq!(chunk(seg.legacy_index(), 0).size, 23 * 16);
        assert_eq!(plan.super_index.audio[0].duration, 48000);
    }

    #[test]
    fn test_last_audio_chunk_holds_remainder() {
        let info = with_stereo(video_only(40), 76801);
        let plan = PlanBuilder::new(&info).build().unwrap();
        let audio = plan.audio.as_ref().unwrap();
        assert_eq!(audio.chunk_count, 29);
        assert_eq!(plan.duration_frames, 41);

        let seg = &plan.segments[0];
        let last: StdIndexEntry = record(
            seg.audio_index(),
            STD_INDEX_HEADER_SIZE + 28 * StdIndexEntry::SIZE,
        );
        assert_eq!(last.size, 4);
        assert_eq!(plan.super_index.audio[0].duration, 76801);
    }

    #[test]
    fn test_no_interleave_single_audio_chunk() {
        let info = with_stereo(video_only(40), 76801);
        let options = AviOptions {
            no_interleave: true,
            ..Default::default()
        };
        let plan = PlanBuilder::new(&info).options(options).build().unwrap();
        let seg = &plan.segments[0];
        assert_eq!(seg.audio_chunks, 1);
        assert_eq!(seg.last_chunk_extra, 40);
        assert_eq!(plan.audio_chunk(seg, 0), (0, 76801));

        let entry: StdIndexEntry = record(seg.audio_index(), STD_INDEX_HEADER_SIZE);
        assert_eq!(entry.size, 76801 * 4);
        // Audio outlasts video by one frame, which carries no chunks.
        assert_eq!(seg.frame_count, 41);
        assert_eq!(seg.frame_offsets()[1], 8 + 76801 * 4 + 8 + 16);
        assert_eq!(seg.frame_offsets()[40], seg.data_size);
        let video: StdIndexEntry = record(seg.video_index(), STD_INDEX_HEADER_SIZE);
        assert_eq!(
            video.offset as u64,
            FIRST_HEADER_SIZE as u64 + 8 + align_up(76801 * 4) + 8
        );
    }

    #[test]
    fn test_multi_segment_layout() {
        let plan = PlanBuilder::new(&huge_clip())
            .options(small_segments())
            .build()
            .unwrap();
        assert_eq!(plan.max_segment_frames, 15);
        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.audio.as_ref().unwrap().chunk_count, 28);

        let counts: Vec<_> = plan
            .segments
            .iter()
            .map(|s| (s.frame_count, s.video_frames, s.audio_chunks))
            .collect();
        assert_eq!(counts, vec![(15, 15, 15), (15, 15, 13), (10, 10, 0)]);

        let mut offset = 0;
        for seg in &plan.segments {
            assert_eq!(seg.start_offset, offset);
            assert!(seg.size as u64 <= MAX_SMALL_SEGMENT_SIZE);
            assert_eq!(seg.size % 2, 0);
            assert_eq!(chunk(seg.header(), 0).size, seg.size - 8);
            offset = seg.end_offset();
        }
        assert_eq!(plan.file_size, offset);

        let second = plan.segments[1].header();
        assert_eq!(second.len(), NEXT_HEADER_SIZE);
        assert_eq!(&second[8..12], b"AVIX");
        assert_eq!(&second[20..24], b"movi");
        assert!(plan.segments[1].legacy_index().is_empty());

        let first = plan.segments[0].header();
        let avih: MainHeader = record(first, AVIH);
        assert_eq!(avih.total_frames, 15);
        let indx: IndexHeader = record(first, VIDEO_SUPER_ENTRIES_OFFSET - IndexHeader::SIZE);
        assert_eq!(indx.entries_in_use, 3);
        assert_eq!(indx.longs_per_entry, 4);

        let mut samples = 0;
        for (i, seg) in plan.segments.iter().enumerate() {
            let video: SuperIndexEntry = record(first, VIDEO_SUPER_ENTRIES_OFFSET + i * 16);
            assert_eq!(video, plan.super_index.video[i]);
            assert_eq!(video.offset, seg.start_offset + seg.index_offset());
            assert_eq!(video.size as usize, seg.video_index().len());
            assert_eq!(video.duration, seg.video_frames);

            let audio: SuperIndexEntry = record(first, AUDIO_SUPER_ENTRIES_OFFSET + i * 16);
            assert_eq!(audio.offset, video.offset + video.size as u64);
            samples += audio.duration as u64;

            let ix00: IndexHeader = record(seg.video_index(), CHUNK_HEADER_SIZE);
            assert_eq!(ix00.base_offset, seg.start_offset);
            assert_eq!(ix00.entries_in_use, seg.video_frames);
        }
        assert_eq!(samples, 76800);
    }

    #[test]
    fn test_segment_capacity_reserves_index_headers() {
        let plan = PlanBuilder::new(&video_only(10)).build().unwrap();
        let per_frame = 2 * CHUNK_HEADER_SIZE as u64
            + plan.video.frame_size as u64
            + plan.video.pad as u64
            + 2 * StdIndexEntry::SIZE as u64
            + 2 * LegacyIndexEntry::SIZE as u64;
        let room = MAX_SEGMENT_SIZE
            - FIRST_HEADER_SIZE as u64
            - 2 * STD_INDEX_HEADER_SIZE as u64
            - LEGACY_INDEX_HEADER_SIZE as u64
            - 2 * INDEX_PAD_SIZE as u64;
        assert_eq!(plan.max_segment_frames as u64, room / per_frame);
    }

    #[test]
    fn test_segment_size_check() {
        assert!(check_segment_size(0, MAX_SEGMENT_SIZE).is_ok());
        assert!(check_segment_size(1, 1024).is_ok());
        assert_matches!(
            check_segment_size(2, MAX_SEGMENT_SIZE + 2),
            Err(Error::Unsupported(msg)) if msg.contains("segment 2")
        );
        assert_matches!(check_segment_size(0, 1025), Err(Error::Unsupported(_)));
    }

    #[test]
    fn test_truncates_at_segment_limit() {
        let info = ClipInfo {
            video: Some(VideoInfo::new(32766, 32766, PixelFormat::Y8).with_frames(15010)),
            audio: None,
        };
        let plan = PlanBuilder::new(&info).build().unwrap();
        assert_eq!(plan.max_segment_frames, 3);
        assert_eq!(plan.segments.len(), MAX_SEGMENTS);
        assert_eq!(plan.frame_count, 15000);
        assert_eq!(plan.video.frame_count, 15000);

        let strh: StreamHeader = record(plan.segments[0].header(), VIDEO_STRH);
        assert_eq!(strh.length, 15000);
        let last: SuperIndexEntry = record(
            plan.segments[0].header(),
            VIDEO_SUPER_ENTRIES_OFFSET + (MAX_SEGMENTS - 1) * 16,
        );
        let tail = &plan.segments[MAX_SEGMENTS - 1];
        assert_eq!(last.offset, tail.start_offset + tail.index_offset());
        assert_eq!(tail.frame_count, 3);
    }

    #[test]
    fn test_rejects_unusable_clips() {
        let empty = ClipInfo::default();
        assert!(matches!(
            PlanBuilder::new(&empty).build(),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            PlanBuilder::new(&video_only(0)).build(),
            Err(Error::Unsupported(_))
        ));

        let mut bad_rate = video_only(1);
        if let Some(video) = bad_rate.video.as_mut() {
            video.fps_den = 0;
        }
        assert!(PlanBuilder::new(&bad_rate).build().is_err());

        let giant = ClipInfo {
            video: Some(VideoInfo::new(32767, 32767, PixelFormat::Y8).with_frames(1)),
            audio: None,
        };
        assert!(matches!(
            PlanBuilder::new(&giant).options(small_segments()).build(),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_locate_frame() {
        let info = with_stereo(video_only(4), 48000);
        let plan = PlanBuilder::new(&info).build().unwrap();
        let seg = &plan.segments[0];
        let offsets = seg.frame_offsets().to_vec();
        assert_eq!(offsets[0], 0);
        assert_eq!(seg.locate_frame(0), (0, 0));
        assert_eq!(seg.locate_frame(offsets[1] as u64 - 1), (0, offsets[1] as u64 - 1));
        assert_eq!(seg.locate_frame(offsets[2] as u64 + 3), (2, 3));
        assert_eq!(
            seg.locate_frame(seg.data_size as u64 - 1).0,
            seg.frame_count - 1
        );
    }
}
