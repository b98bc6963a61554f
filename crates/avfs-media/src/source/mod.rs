//! Clip sources: the decoded video and audio an AVI file is built from.
//!
//! A [`ClipSource`] reports a [`ClipInfo`] once, then hands out decoded
//! frames and interleaved sample ranges on demand. Planar frames are copied
//! into the AVI payload layout by [`copy_frame_range`].

mod copy;
mod format;
mod pattern;
mod raw;

pub use copy::copy_frame_range;
pub use format::{default_channel_mask, PixelFormat, PlaneLayout, SampleFormat};
pub use pattern::PatternSource;
pub use raw::RawSource;

use crate::riff::FourCC;
use crate::Result;
use bytes::Bytes;

/// Video stream properties.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_count: u32,
    pub fps_num: u32,
    pub fps_den: u32,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
            frame_count: 0,
            fps_num: 25,
            fps_den: 1,
        }
    }

    pub fn with_frames(mut self, frame_count: u32) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_rate(mut self, fps_num: u32, fps_den: u32) -> Self {
        self.fps_num = fps_num;
        self.fps_den = fps_den;
        self
    }

    /// Bytes in one AVI frame payload.
    pub fn frame_size(&self) -> u64 {
        self.pixel_format.frame_size(self.width, self.height)
    }
}

/// Audio stream properties.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// Total sample frames (one value per channel each).
    pub sample_count: u64,
    /// Speaker mask; derived from the channel count when absent.
    pub channel_mask: Option<u32>,
}

impl AudioInfo {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
            sample_count: 0,
            channel_mask: None,
        }
    }

    pub fn with_samples(mut self, sample_count: u64) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_channel_mask(mut self, mask: u32) -> Self {
        self.channel_mask = Some(mask);
        self
    }

    /// Bytes per sample frame across all channels.
    pub fn sample_size(&self) -> u32 {
        self.channels as u32 * self.sample_format.bytes_per_sample() as u32
    }

    pub fn channel_mask(&self) -> u32 {
        self.channel_mask
            .unwrap_or_else(|| default_channel_mask(self.channels))
    }

    /// Whether the stream carries anything worth muxing.
    pub fn is_present(&self) -> bool {
        self.sample_count > 0 && self.sample_rate > 0 && self.sample_size() > 0
    }
}

/// Everything the planner needs to know about a clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ClipInfo {
    pub video: Option<VideoInfo>,
    pub audio: Option<AudioInfo>,
}

/// Container options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AviOptions {
    /// Override for the video handler and compression code.
    pub video_fourcc: Option<FourCC>,
    /// Place all audio of a segment in a single chunk.
    pub no_interleave: bool,
    /// Cap segments at 1 GiB instead of 4 GiB.
    pub small_segments: bool,
}

/// One plane of a decoded frame.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Bytes,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
}

impl Plane {
    pub fn new(data: impl Into<Bytes>, stride: usize) -> Self {
        Self {
            data: data.into(),
            stride,
        }
    }
}

/// A decoded video frame.
#[derive(Debug, Clone)]
pub enum VideoFrame {
    /// Bytes already in AVI payload layout.
    Packed(Bytes),
    /// Planes in source order (Y, U, V).
    Planar(Vec<Plane>),
}

/// Supplier of decoded media.
///
/// Implementations are shared between concurrent readers, so decoding must
/// be safe to call from several threads.
pub trait ClipSource: Send + Sync {
    /// Clip properties. Must not change after the source is created.
    fn clip_info(&self) -> &ClipInfo;

    /// Decode frame `n`.
    fn get_frame(&self, n: u32) -> Result<VideoFrame>;

    /// Fill `buf` with `count` interleaved sample frames starting at `start`.
    ///
    /// `buf` is exactly `count * sample_size` bytes long.
    fn get_audio(&self, buf: &mut [u8], start: u64, count: u64) -> Result<()>;

    /// Container options requested by the source.
    fn avi_options(&self) -> AviOptions {
        AviOptions::default()
    }

    /// Base name of the virtual file.
    fn name(&self) -> &str {
        "clip"
    }
}
