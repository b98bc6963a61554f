mod cli;

use avfs::{clip, config};
use avfs_media::riff::{Chunk, RiffReader};
use avfs_media::AviFile;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Children of `LIST movi` printed before the rest are summarized.
const MOVI_PREVIEW: usize = 8;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "avfs=trace,avfs_media=debug".to_string()
        } else {
            "avfs=info,avfs_media=info".to_string()
        }
    });

    // Logs go to stderr so `read` can stream bytes to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { json } => show_info(cli.config.as_deref(), json),
        Commands::Read {
            offset,
            length,
            output,
        } => read_range(cli.config.as_deref(), offset, length, output.as_deref()),
        Commands::Export { output, chunk_size } => {
            export_file(cli.config.as_deref(), &output, chunk_size)
        }
        Commands::Inspect { depth } => inspect_file(cli.config.as_deref(), depth),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("avfs {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open(config_path: Option<&Path>) -> Result<(config::Config, std::sync::Arc<AviFile>)> {
    let config = config::load_config_or_default(config_path)?;
    let file = clip::open_file(&config)?;
    Ok((config, file))
}

fn show_info(config_path: Option<&Path>, json: bool) -> Result<()> {
    let (_, file) = open(config_path)?;
    let summary = file.plan().summary();

    if json {
        let json_str = serde_json::to_string_pretty(&summary)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.file_name());
    println!("Size: {} bytes", summary.file_size);
    println!(
        "Video: {}x{} {} @ {}/{} fps, {} frames ({} bytes each, chunk {})",
        summary.width,
        summary.height,
        summary.video.handler,
        summary.fps_num,
        summary.fps_den,
        summary.video.frame_count,
        summary.video.frame_size,
        summary.video.chunk_id
    );
    match &summary.audio {
        Some(audio) => println!(
            "Audio: {} samples of {} bytes in {} chunks",
            audio.sample_count, audio.sample_size, audio.chunk_count
        ),
        None => println!("Audio: none"),
    }
    println!(
        "Frames: {} (duration {}, at most {} per segment)",
        summary.frame_count, summary.duration_frames, summary.max_segment_frames
    );

    println!("\nSegments: {}", summary.segments.len());
    for seg in &summary.segments {
        println!(
            "  [{}] offset {} size {} frames {}..{} (video {}, audio {})",
            seg.index,
            seg.start_offset,
            seg.size,
            seg.start_frame,
            seg.start_frame + seg.frame_count,
            seg.video_frames,
            seg.audio_chunks
        );
    }

    Ok(())
}

fn read_range(
    config_path: Option<&Path>,
    offset: u64,
    length: u64,
    output: Option<&Path>,
) -> Result<()> {
    let (_, file) = open(config_path)?;
    let length = usize::try_from(length).context("Length too large")?;
    let mut buf = vec![0u8; length];
    file.read_at(offset, &mut buf)
        .with_context(|| format!("Failed to read {} bytes at {}", length, offset))?;

    match output {
        Some(path) => std::fs::write(path, &buf)
            .with_context(|| format!("Failed to write {:?}", path))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&buf)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn export_file(config_path: Option<&Path>, output: &Path, chunk_size: Option<usize>) -> Result<()> {
    let (config, file) = open(config_path)?;
    let chunk_size = chunk_size.unwrap_or(config.read.chunk_size);
    if chunk_size == 0 {
        anyhow::bail!("Chunk size cannot be 0");
    }

    let target = if output.is_dir() {
        output.join(file.file_name())
    } else {
        output.to_path_buf()
    };
    tracing::info!("Exporting {} to {:?}", file.file_name(), target);

    let out = std::fs::File::create(&target)
        .with_context(|| format!("Failed to create {:?}", target))?;
    let mut writer = BufWriter::new(out);
    let mut buf = vec![0u8; chunk_size];
    let size = file.file_size();
    let mut offset = 0u64;
    while offset < size {
        let n = (size - offset).min(chunk_size as u64) as usize;
        file.read_at(offset, &mut buf[..n])
            .with_context(|| format!("Failed to read {} bytes at {}", n, offset))?;
        writer.write_all(&buf[..n])?;
        offset += n as u64;
    }
    writer.flush()?;

    println!("Wrote {} bytes to {}", size, target.display());
    Ok(())
}

fn inspect_file(config_path: Option<&Path>, depth: usize) -> Result<()> {
    let (_, file) = open(config_path)?;
    let mut reader = RiffReader::new(file.cursor())?;

    println!("{} ({} bytes)", file.file_name(), reader.file_size());
    for chunk in reader.top_level()? {
        print_chunk(&mut reader, &chunk, 1, depth)?;
    }
    Ok(())
}

fn print_chunk<R: std::io::Read + std::io::Seek>(
    reader: &mut RiffReader<R>,
    chunk: &Chunk,
    level: usize,
    depth: usize,
) -> Result<()> {
    println!(
        "{:indent$}{} @{} size {}",
        "",
        chunk.name(),
        chunk.offset,
        chunk.size,
        indent = level * 2
    );
    if chunk.list_type.is_none() || level > depth {
        return Ok(());
    }

    let children = reader.children(chunk)?;
    let is_movi = chunk.list_type == Some(avfs_media::FourCC::MOVI);
    let shown = if is_movi {
        children.len().min(MOVI_PREVIEW)
    } else {
        children.len()
    };
    for child in &children[..shown] {
        print_chunk(reader, child, level + 1, depth)?;
    }
    if shown < children.len() {
        // Index chunks sit at the end of movi and are always worth showing.
        let rest = &children[shown..];
        let tail: Vec<_> = rest
            .iter()
            .filter(|c| c.id == avfs_media::FourCC::JUNK || c.id.0.starts_with(b"ix"))
            .collect();
        println!(
            "{:indent$}... {} more data chunks",
            "",
            rest.len() - tail.len(),
            indent = (level + 1) * 2
        );
        for child in tail {
            print_chunk(reader, child, level + 1, depth)?;
        }
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_clip(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_clip(&config);
        }
    }

    Ok(())
}

fn print_clip(config: &config::Config) {
    let clip = &config.clip;
    println!("  Source: {:?}", clip.source);
    println!(
        "  Video: {}x{} {} @ {}/{} fps, {} frames",
        clip.width, clip.height, clip.pixel_format, clip.fps_num, clip.fps_den, clip.frames
    );
    match &clip.audio {
        Some(audio) => println!(
            "  Audio: {} Hz, {} channels, {}",
            audio.sample_rate, audio.channels, audio.sample_format
        ),
        None => println!("  Audio: none"),
    }
    println!(
        "  Interleave: {}, small segments: {}",
        !config.avi.no_interleave, config.avi.small_segments
    );
}
