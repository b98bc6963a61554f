//! Random access reads over the planned layout.

use super::AviFile;
use crate::plan::{Segment, INDEX_PAD_SIZE};
use crate::riff::{align_up, ChunkHeader, FourCC};
use crate::source::copy_frame_range;
use crate::{Error, Result};

/// Destination of a read, filled front to back.
struct Output<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Output<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_full(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> &mut [u8] {
        let start = self.pos;
        self.pos += n;
        &mut self.buf[start..self.pos]
    }
}

/// Walk past a region of `len` bytes, filling the part of it that lies at
/// or after `*skip` into `out`.
///
/// `fill` receives the destination and the offset within the region.
fn region<F>(skip: &mut u64, out: &mut Output<'_>, len: u64, fill: F) -> Result<()>
where
    F: FnOnce(&mut [u8], u64) -> Result<()>,
{
    if out.is_full() {
        return Ok(());
    }
    if *skip >= len {
        *skip -= len;
        return Ok(());
    }
    let n = (len - *skip).min(out.remaining() as u64) as usize;
    fill(out.take(n), *skip)?;
    *skip = 0;
    Ok(())
}

fn bytes_region(skip: &mut u64, out: &mut Output<'_>, bytes: &[u8]) -> Result<()> {
    region(skip, out, bytes.len() as u64, |dst, at| {
        let at = at as usize;
        dst.copy_from_slice(&bytes[at..at + dst.len()]);
        Ok(())
    })
}

fn zero_region(skip: &mut u64, out: &mut Output<'_>, len: u64) -> Result<()> {
    region(skip, out, len, |dst, _| {
        dst.fill(0);
        Ok(())
    })
}

/// A `JUNK` chunk of `len` bytes total with zero payload.
fn junk_region(skip: &mut u64, out: &mut Output<'_>, len: u64) -> Result<()> {
    let tag = ChunkHeader::new(FourCC::JUNK, (len - 8) as u32).to_bytes();
    bytes_region(skip, out, &tag)?;
    zero_region(skip, out, len - 8)
}

impl AviFile {
    /// Fill `buf` with the file bytes starting at `offset`.
    ///
    /// The range must lie within the file. Reads of the same range always
    /// return the same bytes however they are split.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let size = self.plan.file_size;
        let len = buf.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(Error::OutOfRange { offset, len, size });
        }
        if buf.is_empty() {
            return Ok(());
        }
        tracing::trace!(offset, len, "Serving read");

        let mut out = Output::new(buf);
        let mut index = self.plan.segment_index_at(offset);
        let mut skip = offset - self.plan.segments[index].start_offset;
        while !out.is_full() {
            let segment = self.plan.segments.get(index).ok_or(Error::OutOfRange {
                offset,
                len,
                size,
            })?;
            self.read_segment(segment, skip, &mut out)?;
            index += 1;
            skip = 0;
        }
        Ok(())
    }

    fn read_segment(&self, segment: &Segment, mut skip: u64, out: &mut Output<'_>) -> Result<()> {
        bytes_region(&mut skip, out, segment.header())?;

        let data_size = segment.data_size as u64;
        if skip >= data_size {
            skip -= data_size;
        } else if !out.is_full() {
            let (first, within) = segment.locate_frame(skip);
            skip = within;
            for frame in first..segment.frame_count {
                if out.is_full() {
                    return Ok(());
                }
                self.read_frame(segment, frame, &mut skip, out)?;
            }
        }

        junk_region(&mut skip, out, INDEX_PAD_SIZE as u64)?;
        bytes_region(&mut skip, out, segment.video_index())?;
        bytes_region(&mut skip, out, segment.audio_index())?;
        bytes_region(&mut skip, out, segment.legacy_index())?;
        junk_region(&mut skip, out, INDEX_PAD_SIZE as u64)
    }

    /// Emit the audio chunk and then the video chunk of one frame.
    fn read_frame(
        &self,
        segment: &Segment,
        frame: u32,
        skip: &mut u64,
        out: &mut Output<'_>,
    ) -> Result<()> {
        if let Some(audio) = self.plan.audio.as_ref().filter(|_| frame < segment.audio_chunks) {
            let (start, count) = self.plan.audio_chunk(segment, frame);
            let bytes = count * audio.sample_size as u64;
            let tag = ChunkHeader::new(FourCC::AUDIO, bytes as u32).to_bytes();
            bytes_region(skip, out, &tag)?;
            region(skip, out, bytes, |dst, at| self.read_audio(start, at, dst))?;
            zero_region(skip, out, align_up(bytes) - bytes)?;
        }

        if frame < segment.video_frames {
            let video = &self.plan.video;
            let tag = ChunkHeader::new(video.chunk_id, video.frame_size).to_bytes();
            bytes_region(skip, out, &tag)?;
            region(skip, out, video.frame_size as u64, |dst, at| {
                let n = segment.start_frame + frame;
                let decoded = self.source.get_frame(n)?;
                let info = self
                    .source
                    .clip_info()
                    .video
                    .as_ref()
                    .ok_or_else(|| Error::decode("clip lost its video stream"))?;
                copy_frame_range(info, &decoded, at as usize, dst)
            })?;
            zero_region(skip, out, video.pad as u64)?;
        }
        Ok(())
    }

    /// Copy audio payload bytes starting `at` bytes into a chunk whose first
    /// sample is `start`.
    ///
    /// Whole samples go straight into `dst`; a sample split by either end
    /// of the range is decoded into scratch space first.
    fn read_audio(&self, start: u64, at: u64, mut dst: &mut [u8]) -> Result<()> {
        let sample_size = self
            .plan
            .audio
            .as_ref()
            .map_or(0, |a| a.sample_size as u64);
        if sample_size == 0 {
            return Err(Error::decode("audio chunk without audio stream"));
        }
        let mut at = at;

        let front = (at % sample_size) as usize;
        if front != 0 {
            let n = (sample_size as usize - front).min(dst.len());
            let mut scratch = self.scratch.lock();
            self.source
                .get_audio(&mut scratch, start + at / sample_size, 1)?;
            let (head, rest) = std::mem::take(&mut dst).split_at_mut(n);
            head.copy_from_slice(&scratch[front..front + n]);
            dst = rest;
            at += n as u64;
        }

        let whole = dst.len() as u64 / sample_size;
        if whole > 0 {
            let n = (whole * sample_size) as usize;
            let (head, rest) = std::mem::take(&mut dst).split_at_mut(n);
            self.source.get_audio(head, start + at / sample_size, whole)?;
            dst = rest;
            at += n as u64;
        }

        if !dst.is_empty() {
            let mut scratch = self.scratch.lock();
            self.source
                .get_audio(&mut scratch, start + at / sample_size, 1)?;
            dst.copy_from_slice(&scratch[..dst.len()]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::FIRST_HEADER_SIZE;
    use crate::source::{AudioInfo, ClipSource, PatternSource, PixelFormat, SampleFormat, VideoInfo};
    use std::sync::Arc;

    fn open(source: PatternSource) -> Arc<AviFile> {
        AviFile::open(Arc::new(source)).unwrap()
    }

    fn ragged_clip() -> PatternSource {
        PatternSource::new(
            VideoInfo::new(3, 3, PixelFormat::Yv24)
                .with_frames(6)
                .with_rate(4, 1),
        )
        .with_audio(AudioInfo::new(400, 3, SampleFormat::S24).with_samples(607))
    }

    fn read_all(file: &AviFile) -> Vec<u8> {
        let mut data = vec![0u8; file.file_size() as usize];
        file.read_at(0, &mut data).unwrap();
        data
    }

    #[test]
    fn test_split_reads_match() {
        let file = open(ragged_clip());
        let whole = read_all(&file);

        for step in [1usize, 7, 9, 4096] {
            let mut pieces = Vec::with_capacity(whole.len());
            let mut offset = 0;
            while offset < whole.len() {
                let n = step.min(whole.len() - offset);
                let mut buf = vec![0xAA; n];
                file.read_at(offset as u64, &mut buf).unwrap();
                pieces.extend_from_slice(&buf);
                offset += n;
            }
            assert!(pieces == whole, "reads of {step} bytes differ");
        }
    }

    #[test]
    fn test_first_chunk_is_preroll_audio() {
        let file = open(ragged_clip());
        let mut tag = [0u8; 8];
        file.read_at(FIRST_HEADER_SIZE as u64, &mut tag).unwrap();
        assert_eq!(&tag[..4], b"01wb");
        // Two frames of pre-roll: chunk 0 holds 300 samples of 9 bytes.
        assert_eq!(u32::from_le_bytes([tag[4], tag[5], tag[6], tag[7]]), 2700);

        // A read starting in the middle of sample 1 and ending inside sample 3.
        let mut mid = [0u8; 16];
        file.read_at(FIRST_HEADER_SIZE as u64 + 8 + 13, &mut mid).unwrap();
        let mut expected = vec![0u8; 4 * 9];
        file.source().get_audio(&mut expected, 0, 4).unwrap();
        assert_eq!(&mid[..], &expected[13..29]);
    }

    #[test]
    fn test_out_of_range() {
        let file = open(ragged_clip());
        let size = file.file_size();
        let mut buf = [0u8; 4];
        assert!(matches!(
            file.read_at(size - 2, &mut buf),
            Err(Error::OutOfRange { .. })
        ));
        assert!(file.read_at(size, &mut []).is_ok());
        assert!(file.read_at(size + 1, &mut []).is_err());
        assert!(file.read_at(u64::MAX, &mut buf).is_err());
    }

    #[test]
    fn test_decode_failure_surfaces() {
        let file = open(
            PatternSource::new(VideoInfo::new(4, 4, PixelFormat::Y8).with_frames(3))
                .with_broken_frame(1),
        );
        let frame_chunk = 8 + 16;
        let mut buf = [0u8; 4];
        // Headers and other frames stay readable.
        file.read_at(0, &mut buf).unwrap();
        file.read_at(FIRST_HEADER_SIZE as u64 + 8, &mut buf).unwrap();

        let broken = FIRST_HEADER_SIZE as u64 + frame_chunk + 8;
        assert!(matches!(
            file.read_at(broken, &mut buf),
            Err(Error::Decode(_))
        ));
        // The chunk header before the payload needs no decoding.
        file.read_at(broken - 8, &mut buf).unwrap();
        assert_eq!(&buf, b"00dc");
    }

    #[test]
    fn test_index_padding_is_junk() {
        let file = open(PatternSource::new(
            VideoInfo::new(4, 4, PixelFormat::Y8).with_frames(2),
        ));
        let seg = &file.plan().segments[0];
        let pad = seg.data_offset() + seg.data_size as u64;
        let mut buf = [0xAAu8; 16];
        file.read_at(pad, &mut buf).unwrap();
        assert_eq!(&buf[..4], b"JUNK");
        assert_eq!(&buf[4..8], &(0x20000u32 - 8).to_le_bytes());
        assert_eq!(&buf[8..], &[0; 8]);

        let mut ix = [0u8; 4];
        file.read_at(seg.index_offset(), &mut ix).unwrap();
        assert_eq!(&ix, b"ix00");

        let mut tail = [0xAAu8; 8];
        file.read_at(file.file_size() - 8, &mut tail).unwrap();
        assert_eq!(tail, [0; 8]);
    }
}
