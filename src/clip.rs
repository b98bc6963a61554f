//! Build clip sources from configuration.

use crate::config::{AudioConfig, ClipConfig, Config, SourceKind};
use anyhow::{Context, Result};
use avfs_media::{
    AudioInfo, AviFile, ClipSource, PatternSource, PixelFormat, RawSource, SampleFormat,
    VideoInfo,
};
use std::sync::Arc;

/// Video properties described by the clip section.
pub fn video_info(clip: &ClipConfig) -> Result<VideoInfo> {
    let format = PixelFormat::from_name(&clip.pixel_format)
        .with_context(|| format!("Unknown pixel format '{}'", clip.pixel_format))?;
    Ok(VideoInfo::new(clip.width, clip.height, format)
        .with_frames(clip.frames)
        .with_rate(clip.fps_num, clip.fps_den))
}

/// Audio properties described by `[clip.audio]`.
///
/// A zero sample count on a synthetic clip is filled in to match the video
/// duration.
pub fn audio_info(audio: &AudioConfig, video: &VideoInfo, synthetic: bool) -> Result<AudioInfo> {
    let format = SampleFormat::from_name(&audio.sample_format)
        .with_context(|| format!("Unknown sample format '{}'", audio.sample_format))?;
    let mut samples = audio.samples;
    if samples == 0 && synthetic {
        let duration =
            video.frame_count as u128 * audio.sample_rate as u128 * video.fps_den as u128;
        samples = duration
            .checked_div(video.fps_num as u128)
            .and_then(|n| u64::try_from(n).ok())
            .with_context(|| {
                format!(
                    "Audio length for {} frames at {} Hz does not fit a sample count",
                    video.frame_count, audio.sample_rate
                )
            })?;
    }
    let mut info =
        AudioInfo::new(audio.sample_rate, audio.channels, format).with_samples(samples);
    if let Some(mask) = audio.channel_mask {
        info = info.with_channel_mask(mask);
    }
    Ok(info)
}

/// Create the clip source the configuration describes.
pub fn open_source(config: &Config) -> Result<Arc<dyn ClipSource>> {
    let clip = &config.clip;
    let video = video_info(clip)?;
    let options = config.avi.to_options();

    let source: Arc<dyn ClipSource> = match clip.source {
        SourceKind::Pattern => {
            let mut source = PatternSource::new(video.clone()).with_options(options);
            if let Some(audio) = &clip.audio {
                source = source.with_audio(audio_info(audio, &video, true)?);
            }
            if let Some(name) = &clip.name {
                source = source.with_name(name.clone());
            }
            Arc::new(source)
        }
        SourceKind::Raw => {
            let path = clip
                .video_path
                .as_deref()
                .context("Raw source requires clip.video_path")?;
            let mut source = RawSource::open(path, video.clone())
                .with_context(|| format!("Failed to open raw video {:?}", path))?
                .with_options(options);
            if let (Some(audio_path), Some(audio)) = (&clip.audio_path, &clip.audio) {
                source = source
                    .with_audio(audio_path, audio_info(audio, &video, false)?)
                    .with_context(|| format!("Failed to open raw audio {:?}", audio_path))?;
            }
            if let Some(name) = &clip.name {
                source = source.with_name(name.clone());
            }
            Arc::new(source)
        }
    };

    Ok(source)
}

/// Open the configured clip as a virtual AVI file.
pub fn open_file(config: &Config) -> Result<Arc<AviFile>> {
    let source = open_source(config)?;
    AviFile::open(source).context("Failed to lay out AVI file")
}
