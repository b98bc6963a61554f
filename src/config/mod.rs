mod types;

pub use types::*;

use anyhow::{Context, Result};
use avfs_media::{PixelFormat, SampleFormat};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./avfs.toml",
        "~/.config/avfs/config.toml",
        "/etc/avfs/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let clip = &config.clip;

    if clip.width == 0 || clip.height == 0 {
        anyhow::bail!("Clip dimensions cannot be zero ({}x{})", clip.width, clip.height);
    }
    if clip.fps_num == 0 || clip.fps_den == 0 {
        anyhow::bail!("Invalid frame rate {}/{}", clip.fps_num, clip.fps_den);
    }
    if PixelFormat::from_name(&clip.pixel_format).is_none() {
        anyhow::bail!("Unknown pixel format '{}'", clip.pixel_format);
    }

    match clip.source {
        SourceKind::Raw => {
            if clip.video_path.is_none() {
                anyhow::bail!("Raw source requires clip.video_path");
            }
            if clip.audio_path.is_some() && clip.audio.is_none() {
                anyhow::bail!("clip.audio_path is set but [clip.audio] is missing");
            }
        }
        SourceKind::Pattern => {
            if clip.frames == 0 {
                anyhow::bail!("Pattern source needs a non-zero frame count");
            }
        }
    }

    if let Some(audio) = &clip.audio {
        if audio.sample_rate == 0 || audio.channels == 0 {
            anyhow::bail!(
                "Invalid audio format: {} Hz, {} channels",
                audio.sample_rate,
                audio.channels
            );
        }
        if SampleFormat::from_name(&audio.sample_format).is_none() {
            anyhow::bail!("Unknown sample format '{}'", audio.sample_format);
        }
    }

    if let Some(code) = &config.avi.video_fourcc {
        if code.len() < 4 || !code.is_ascii() {
            anyhow::bail!("video_fourcc '{}' must be at least 4 ASCII characters", code);
        }
        if code.len() > 4 {
            tracing::warn!("video_fourcc '{}' truncated to 4 characters", code);
        }
    }

    if config.read.chunk_size == 0 {
        anyhow::bail!("read.chunk_size cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.clip.source, SourceKind::Pattern);
        assert_eq!(config.clip.width, 320);
        assert_eq!(config.clip.pixel_format, "yv12");
        assert_eq!(config.read.chunk_size, 1024 * 1024);
        assert!(config.clip.audio.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[avi]
video_fourcc = "HFYU"
small_segments = true

[clip]
width = 640
height = 480
pixel_format = "y8"
frames = 10

[clip.audio]
sample_rate = 44100
channels = 6
sample_format = "f32"
"#,
        );
        let config = load_config(file.path()).unwrap();
        let options = config.avi.to_options();
        assert_eq!(options.video_fourcc.map(|f| f.to_string()), Some("HFYU".into()));
        assert!(options.small_segments);
        assert!(!options.no_interleave);

        let audio = config.clip.audio.unwrap();
        assert_eq!(audio.channels, 6);
        assert_eq!(audio.sample_format, "f32");
    }

    #[test]
    fn test_validation_failures() {
        for content in [
            "[clip]\nwidth = 0",
            "[clip]\nfps_den = 0",
            "[clip]\npixel_format = \"nv12\"",
            "[clip]\nsource = \"raw\"",
            "[avi]\nvideo_fourcc = \"DIB\"",
            "[read]\nchunk_size = 0",
            "[clip.audio]\nsample_format = \"s64\"",
        ] {
            let file = write_config(content);
            assert!(load_config(file.path()).is_err(), "accepted: {content}");
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/avfs.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
