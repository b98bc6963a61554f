//! Pixel and sample formats and their AVI representation.

use crate::riff::FourCC;
use crate::{Error, Result};

/// Uncompressed pixel formats that can be placed in an AVI stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum PixelFormat {
    /// Packed BGR, bottom-up rows.
    Rgb24,
    /// Packed BGRA, bottom-up rows.
    Rgb32,
    /// Packed 4:2:2 YUYV.
    Yuy2,
    /// Planar 4:2:0, planes stored Y, V, U.
    Yv12,
    /// Planar 4:2:2, planes stored Y, V, U.
    Yv16,
    /// Planar 4:4:4, planes stored Y, V, U.
    Yv24,
    /// Single luma plane.
    Y8,
}

/// Geometry of one plane in the AVI frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Meaningful bytes per row.
    pub row_bytes: usize,
    pub rows: usize,
    /// Row alignment in the payload; the tail of each row is zero.
    pub row_align: usize,
}

impl PlaneLayout {
    /// Row size including alignment padding.
    pub fn row_size(&self) -> usize {
        self.row_bytes.div_ceil(self.row_align) * self.row_align
    }

    pub fn size(&self) -> usize {
        self.row_size() * self.rows
    }
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 7] = [
        Self::Rgb24,
        Self::Rgb32,
        Self::Yuy2,
        Self::Yv12,
        Self::Yv16,
        Self::Yv24,
        Self::Y8,
    ];

    /// Parse a configuration name such as `yv12` or `rgb32`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgb24" | "bgr24" => Some(Self::Rgb24),
            "rgb32" | "bgra" => Some(Self::Rgb32),
            "yuy2" | "yuyv" => Some(Self::Yuy2),
            "yv12" => Some(Self::Yv12),
            "yv16" => Some(Self::Yv16),
            "yv24" => Some(Self::Yv24),
            "y8" | "y800" | "gray" => Some(Self::Y8),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgb32 => "rgb32",
            Self::Yuy2 => "yuy2",
            Self::Yv12 => "yv12",
            Self::Yv16 => "yv16",
            Self::Yv24 => "yv24",
            Self::Y8 => "y8",
        }
    }

    /// Stream handler code.
    pub fn fourcc(self) -> FourCC {
        match self {
            Self::Rgb24 | Self::Rgb32 => FourCC::DIB,
            Self::Yuy2 => FourCC::YUY2,
            Self::Yv12 => FourCC::YV12,
            Self::Yv16 => FourCC::YV16,
            Self::Yv24 => FourCC::YV24,
            Self::Y8 => FourCC::Y800,
        }
    }

    /// BITMAPINFOHEADER compression code.
    pub fn compression(self) -> FourCC {
        match self {
            Self::Rgb24 | Self::Rgb32 => FourCC::BI_RGB,
            other => other.fourcc(),
        }
    }

    pub fn bits_per_pixel(self) -> u16 {
        match self {
            Self::Rgb24 | Self::Yv24 => 24,
            Self::Rgb32 => 32,
            Self::Yuy2 | Self::Yv16 => 16,
            Self::Yv12 => 12,
            Self::Y8 => 8,
        }
    }

    /// Single plane formats whose frames arrive already laid out.
    pub fn is_packed(self) -> bool {
        matches!(self, Self::Rgb24 | Self::Rgb32 | Self::Yuy2)
    }

    /// Number of source planes, in Y, U, V order.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Yv12 | Self::Yv16 | Self::Yv24 => 3,
            _ => 1,
        }
    }

    /// Source plane indices in the order they appear in the payload.
    pub fn output_plane_order(self) -> &'static [usize] {
        match self.plane_count() {
            3 => &[0, 2, 1],
            _ => &[0],
        }
    }

    /// Horizontal and vertical chroma subsampling shifts.
    fn chroma_shift(self) -> (u32, u32) {
        match self {
            Self::Yv12 => (1, 1),
            Self::Yv16 | Self::Yuy2 => (1, 0),
            _ => (0, 0),
        }
    }

    /// Reject dimensions the format cannot represent.
    pub fn check_dimensions(self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::unsupported(format!(
                "{} frame has zero dimension {}x{}",
                self.name(),
                width,
                height
            )));
        }
        let (sx, sy) = self.chroma_shift();
        if width % (1 << sx) != 0 || height % (1 << sy) != 0 {
            return Err(Error::unsupported(format!(
                "{} requires dimensions divisible by {}x{}, got {}x{}",
                self.name(),
                1 << sx,
                1 << sy,
                width,
                height
            )));
        }
        Ok(())
    }

    /// Plane layouts in payload order (Y, V, U for planar formats).
    pub fn plane_layouts(self, width: u32, height: u32) -> Vec<PlaneLayout> {
        let w = width as usize;
        let h = height as usize;
        match self {
            Self::Rgb24 => vec![PlaneLayout { row_bytes: w * 3, rows: h, row_align: 4 }],
            Self::Rgb32 => vec![PlaneLayout { row_bytes: w * 4, rows: h, row_align: 4 }],
            Self::Yuy2 => vec![PlaneLayout { row_bytes: w * 2, rows: h, row_align: 4 }],
            Self::Y8 => vec![PlaneLayout { row_bytes: w, rows: h, row_align: 4 }],
            Self::Yv12 | Self::Yv16 | Self::Yv24 => {
                let (sx, sy) = self.chroma_shift();
                let luma = PlaneLayout { row_bytes: w, rows: h, row_align: 1 };
                let chroma = PlaneLayout {
                    row_bytes: w >> sx,
                    rows: h >> sy,
                    row_align: 1,
                };
                vec![luma, chroma, chroma]
            }
        }
    }

    /// Size of one frame payload in bytes.
    pub fn frame_size(self, width: u32, height: u32) -> u64 {
        self.plane_layouts(width, height)
            .iter()
            .map(|p| p.size() as u64)
            .sum()
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Interleaved audio sample formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum SampleFormat {
    U8,
    S16,
    S24,
    S32,
    F32,
}

impl SampleFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "u8" => Some(Self::U8),
            "s16" | "i16" => Some(Self::S16),
            "s24" | "i24" => Some(Self::S24),
            "s32" | "i32" => Some(Self::S32),
            "f32" | "float" => Some(Self::F32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "f32",
        }
    }

    /// Bytes per channel value.
    pub fn bytes_per_sample(self) -> u16 {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default WAVEFORMATEXTENSIBLE speaker mask for a channel count.
pub fn default_channel_mask(channels: u16) -> u32 {
    match channels {
        1 => 0x4,
        2 => 0x3,
        3 => 0x7,
        4 => 0x33,
        5 => 0x37,
        6 => 0x3F,
        7 => 0x13F,
        8 => 0x63F,
        _ => 0,
    }
}
