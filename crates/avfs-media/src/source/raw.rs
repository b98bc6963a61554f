//! Clip backed by raw media files.

use super::{AudioInfo, AviOptions, ClipInfo, ClipSource, VideoFrame, VideoInfo};
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Reads frames and samples from raw files.
///
/// The video file holds frames back to back, each already in AVI payload
/// layout. The audio file holds interleaved samples without a header.
pub struct RawSource {
    info: ClipInfo,
    options: AviOptions,
    name: String,
    video: Mutex<File>,
    audio: Option<Mutex<File>>,
}

impl RawSource {
    /// Open a raw video file. A zero frame count is derived from the file length.
    pub fn open(path: impl AsRef<Path>, mut video: VideoInfo) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let frame_size = video.frame_size();
        if frame_size == 0 {
            return Err(Error::unsupported("raw video frame size is zero"));
        }

        let available = len / frame_size;
        if video.frame_count == 0 {
            video.frame_count = u32::try_from(available).unwrap_or(u32::MAX);
        } else if (video.frame_count as u64) > available {
            return Err(Error::unsupported(format!(
                "{} holds {} frames of {} bytes, clip declares {}",
                path.display(),
                available,
                frame_size,
                video.frame_count
            )));
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip")
            .to_string();

        tracing::debug!(
            path = %path.display(),
            frames = video.frame_count,
            frame_size,
            "Opened raw video"
        );

        Ok(Self {
            info: ClipInfo {
                video: Some(video),
                audio: None,
            },
            options: AviOptions::default(),
            name,
            video: Mutex::new(file),
            audio: None,
        })
    }

    /// Attach a raw audio file. A zero sample count is derived from the file length.
    pub fn with_audio(mut self, path: impl AsRef<Path>, mut audio: AudioInfo) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let sample_size = audio.sample_size() as u64;
        if sample_size == 0 {
            return Err(Error::unsupported("raw audio sample size is zero"));
        }

        let available = len / sample_size;
        if audio.sample_count == 0 {
            audio.sample_count = available;
        } else if audio.sample_count > available {
            return Err(Error::unsupported(format!(
                "{} holds {} samples, clip declares {}",
                path.display(),
                available,
                audio.sample_count
            )));
        }

        self.info.audio = Some(audio);
        self.audio = Some(Mutex::new(file));
        Ok(self)
    }

    pub fn with_options(mut self, options: AviOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl ClipSource for RawSource {
    fn clip_info(&self) -> &ClipInfo {
        &self.info
    }

    fn get_frame(&self, n: u32) -> Result<VideoFrame> {
        let video = self
            .info
            .video
            .as_ref()
            .ok_or_else(|| Error::decode("raw clip has no video"))?;
        if n >= video.frame_count {
            return Err(Error::decode(format!("frame {n} beyond clip end")));
        }
        let frame_size = video.frame_size();
        let mut data = vec![0u8; frame_size as usize];

        let mut file = self.video.lock();
        file.seek(SeekFrom::Start(n as u64 * frame_size))?;
        file.read_exact(&mut data)?;
        Ok(VideoFrame::Packed(Bytes::from(data)))
    }

    fn get_audio(&self, buf: &mut [u8], start: u64, count: u64) -> Result<()> {
        let (Some(audio), Some(file)) = (self.info.audio.as_ref(), self.audio.as_ref()) else {
            return Err(Error::decode("raw clip has no audio"));
        };
        if start + count > audio.sample_count {
            return Err(Error::decode(format!(
                "samples {}..{} beyond clip length {}",
                start,
                start + count,
                audio.sample_count
            )));
        }
        let sample_size = audio.sample_size() as u64;
        if buf.len() as u64 != count * sample_size {
            return Err(Error::BufferUnderflow {
                need: (count * sample_size) as usize,
                have: buf.len(),
            });
        }

        let mut file = file.lock();
        file.seek(SeekFrom::Start(start * sample_size))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn avi_options(&self) -> AviOptions {
        self.options.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
