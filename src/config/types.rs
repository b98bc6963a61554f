use avfs_media::{AviOptions, FourCC};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub avi: AviConfig,

    #[serde(default)]
    pub clip: ClipConfig,

    #[serde(default)]
    pub read: ReadConfig,
}

/// Container options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AviConfig {
    /// Video handler/compression override; only the first 4 characters are used
    #[serde(default)]
    pub video_fourcc: Option<String>,

    /// Put each segment's audio in a single chunk
    #[serde(default)]
    pub no_interleave: bool,

    /// Limit segments to 1 GiB
    #[serde(default)]
    pub small_segments: bool,
}

impl AviConfig {
    pub fn to_options(&self) -> AviOptions {
        AviOptions {
            video_fourcc: self.video_fourcc.as_deref().and_then(FourCC::parse),
            no_interleave: self.no_interleave,
            small_segments: self.small_segments,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Synthetic frames and samples
    #[default]
    Pattern,
    /// Raw frame and PCM files
    Raw,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClipConfig {
    #[serde(default)]
    pub source: SourceKind,

    /// Virtual file base name (defaults to the source name)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Frame count (0 = derive from the raw video file)
    #[serde(default = "default_frames")]
    pub frames: u32,

    #[serde(default = "default_fps_num")]
    pub fps_num: u32,

    #[serde(default = "default_fps_den")]
    pub fps_den: u32,

    /// Raw video file, frames back to back in AVI layout
    #[serde(default)]
    pub video_path: Option<PathBuf>,

    /// Raw interleaved PCM file
    #[serde(default)]
    pub audio_path: Option<PathBuf>,

    #[serde(default)]
    pub audio: Option<AudioConfig>,
}

fn default_width() -> u32 {
    320
}
fn default_height() -> u32 {
    240
}
fn default_pixel_format() -> String {
    "yv12".to_string()
}
fn default_frames() -> u32 {
    250
}
fn default_fps_num() -> u32 {
    25
}
fn default_fps_den() -> u32 {
    1
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            name: None,
            width: default_width(),
            height: default_height(),
            pixel_format: default_pixel_format(),
            frames: default_frames(),
            fps_num: default_fps_num(),
            fps_den: default_fps_den(),
            video_path: None,
            audio_path: None,
            audio: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_sample_format")]
    pub sample_format: String,

    /// Sample count (0 = match the video duration, or the raw file length)
    #[serde(default)]
    pub samples: u64,

    /// Speaker mask (derived from the channel count if unset)
    #[serde(default)]
    pub channel_mask: Option<u32>,
}

fn default_sample_rate() -> u32 {
    48000
}
fn default_channels() -> u16 {
    2
}
fn default_sample_format() -> String {
    "s16".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            sample_format: default_sample_format(),
            samples: 0,
            channel_mask: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadConfig {
    /// Bytes per ranged read when exporting
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}
