//! Deterministic synthetic clip.

use super::{
    AudioInfo, AviOptions, ClipInfo, ClipSource, Plane, SampleFormat, VideoFrame, VideoInfo,
};
use crate::{Error, Result};
use bytes::Bytes;

/// Generates frames and samples from their position alone.
///
/// Every channel of sample `i` holds `i % 0xFFFF`, so any range of audio can
/// be checked without keeping the whole stream around.
#[derive(Debug, Clone)]
pub struct PatternSource {
    info: ClipInfo,
    options: AviOptions,
    name: String,
    broken_frame: Option<u32>,
}

impl PatternSource {
    pub fn new(video: VideoInfo) -> Self {
        Self {
            info: ClipInfo {
                video: Some(video),
                audio: None,
            },
            options: AviOptions::default(),
            name: "pattern".to_string(),
            broken_frame: None,
        }
    }

    pub fn with_audio(mut self, audio: AudioInfo) -> Self {
        self.info.audio = Some(audio);
        self
    }

    pub fn with_options(mut self, options: AviOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make decoding of frame `n` fail.
    pub fn with_broken_frame(mut self, n: u32) -> Self {
        self.broken_frame = Some(n);
        self
    }

    /// Byte at column `x` of row `y` of source plane `plane`.
    pub fn pixel(frame: u32, plane: usize, x: usize, y: usize) -> u8 {
        (frame as usize)
            .wrapping_mul(7)
            .wrapping_add(plane * 61)
            .wrapping_add(x * 3)
            .wrapping_add(y * 5) as u8
    }

    /// Value stored in every channel of sample `index`.
    pub fn sample_value(index: u64) -> u16 {
        (index % 0xFFFF) as u16
    }

    /// Serialize one channel value in the given format.
    pub fn encode_sample(format: SampleFormat, value: u16, out: &mut [u8]) {
        match format {
            SampleFormat::U8 => out[0] = value as u8,
            SampleFormat::S16 => out.copy_from_slice(&value.to_le_bytes()),
            SampleFormat::S24 => out.copy_from_slice(&(value as u32).to_le_bytes()[..3]),
            SampleFormat::S32 => out.copy_from_slice(&(value as u32).to_le_bytes()),
            SampleFormat::F32 => out.copy_from_slice(&(value as f32 / 65535.0).to_le_bytes()),
        }
    }

    fn video(&self) -> Result<&VideoInfo> {
        self.info
            .video
            .as_ref()
            .ok_or_else(|| Error::decode("pattern clip has no video"))
    }
}

impl ClipSource for PatternSource {
    fn clip_info(&self) -> &ClipInfo {
        &self.info
    }

    fn get_frame(&self, n: u32) -> Result<VideoFrame> {
        let video = self.video()?;
        if n >= video.frame_count || self.broken_frame == Some(n) {
            return Err(Error::decode(format!("cannot decode frame {n}")));
        }

        let format = video.pixel_format;
        let layouts = format.plane_layouts(video.width, video.height);

        if format.is_packed() {
            let layout = layouts[0];
            let mut data = vec![0u8; layout.size()];
            for (y, row) in data.chunks_mut(layout.row_size()).enumerate() {
                for (x, byte) in row[..layout.row_bytes].iter_mut().enumerate() {
                    *byte = Self::pixel(n, 0, x, y);
                }
            }
            return Ok(VideoFrame::Packed(Bytes::from(data)));
        }

        // Planes arrive in Y, U, V order with a decoder-style padded stride.
        // Layouts are listed in payload order, so map back through it.
        let order = format.output_plane_order();
        let mut planes = vec![Plane::new(Bytes::new(), 0); format.plane_count()];
        for (layout, &index) in layouts.iter().zip(order) {
            let stride = (layout.row_bytes + 15) & !15;
            let mut data = vec![0xEEu8; stride * layout.rows];
            for (y, row) in data.chunks_mut(stride).enumerate() {
                for (x, byte) in row[..layout.row_bytes].iter_mut().enumerate() {
                    *byte = Self::pixel(n, index, x, y);
                }
            }
            planes[index] = Plane::new(data, stride);
        }
        Ok(VideoFrame::Planar(planes))
    }

    fn get_audio(&self, buf: &mut [u8], start: u64, count: u64) -> Result<()> {
        let audio = self
            .info
            .audio
            .as_ref()
            .ok_or_else(|| Error::decode("pattern clip has no audio"))?;
        if start + count > audio.sample_count {
            return Err(Error::decode(format!(
                "samples {}..{} beyond clip length {}",
                start,
                start + count,
                audio.sample_count
            )));
        }
        let sample_size = audio.sample_size() as usize;
        if buf.len() != count as usize * sample_size {
            return Err(Error::BufferUnderflow {
                need: count as usize * sample_size,
                have: buf.len(),
            });
        }

        let width = audio.sample_format.bytes_per_sample() as usize;
        for (i, sample) in buf.chunks_exact_mut(sample_size).enumerate() {
            let value = Self::sample_value(start + i as u64);
            for channel in sample.chunks_exact_mut(width) {
                Self::encode_sample(audio.sample_format, value, channel);
            }
        }
        Ok(())
    }

    fn avi_options(&self) -> AviOptions {
        self.options.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
