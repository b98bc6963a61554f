//! avfs-media: on-demand OpenDML (AVI 2.0) synthesis over decoded clips
//!
//! This crate presents a decoded clip as a complete AVI file without ever
//! writing that file out. The container layout is computed once; reads at
//! arbitrary offsets are then answered by serializing headers and indexes
//! from RAM and pulling only the frames and samples the range touches.
//!
//! # Modules
//!
//! - `riff` - Four-character codes, chunk headers, AVI records, chunk reader
//! - `source` - Clip sources, pixel and sample formats, plane copying
//! - `plan` - Segment partitioning and header/index serialization
//! - `file` - Random access byte server and `Read + Seek` cursor
//!
//! # Layout
//!
//! The file is a chain of `RIFF` segments, each at most 4 GiB (1 GiB with
//! small segments). The first is a `RIFF AVI ` with the full header list and
//! a super index for each stream; the rest are `RIFF AVIX`. Every segment
//! holds a `LIST movi` of interleaved data chunks followed by its own
//! standard indexes, wrapped in 128 KiB `JUNK` pads. The first segment also
//! carries a legacy `idx1` index for old readers.
//!
//! ```no_run
//! use avfs_media::{AviFile, PatternSource, PixelFormat, VideoInfo};
//! use std::sync::Arc;
//!
//! let source = PatternSource::new(VideoInfo::new(320, 240, PixelFormat::Yv12).with_frames(250));
//! let file = AviFile::open(Arc::new(source))?;
//! let mut header = [0u8; 12];
//! file.read_at(0, &mut header)?;
//! assert_eq!(&header[..4], b"RIFF");
//! # Ok::<(), avfs_media::Error>(())
//! ```

pub mod error;
pub mod file;
pub mod plan;
pub mod riff;
pub mod source;

pub use error::{Error, Result};
pub use file::{AviCursor, AviFile};
pub use plan::{ContainerPlan, PlanBuilder, PlanSummary};
pub use riff::FourCC;
pub use source::{
    AudioInfo, AviOptions, ClipInfo, ClipSource, PatternSource, PixelFormat, RawSource,
    SampleFormat, VideoFrame, VideoInfo,
};
