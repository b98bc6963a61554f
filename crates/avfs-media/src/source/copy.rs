//! Copy a byte range of a frame payload out of decoded planes.

use super::{Plane, PlaneLayout, VideoFrame, VideoInfo};
use crate::{Error, Result};

/// Copy `dst.len()` bytes of the AVI payload of `frame`, starting at
/// payload offset `offset`.
///
/// Planar frames are emitted plane by plane in payload order. Row tails
/// added by alignment are zero filled.
pub fn copy_frame_range(
    video: &VideoInfo,
    frame: &VideoFrame,
    offset: usize,
    dst: &mut [u8],
) -> Result<()> {
    let frame_size = video.frame_size() as usize;
    if offset + dst.len() > frame_size {
        return Err(Error::OutOfRange {
            offset: offset as u64,
            len: dst.len() as u64,
            size: frame_size as u64,
        });
    }

    match frame {
        VideoFrame::Packed(data) => {
            let src = data.get(offset..offset + dst.len()).ok_or_else(|| {
                Error::decode(format!(
                    "packed frame has {} bytes, expected {}",
                    data.len(),
                    frame_size
                ))
            })?;
            dst.copy_from_slice(src);
            Ok(())
        }
        VideoFrame::Planar(planes) => {
            let format = video.pixel_format;
            let layouts = format.plane_layouts(video.width, video.height);
            let order = format.output_plane_order();
            if planes.len() < format.plane_count() {
                return Err(Error::decode(format!(
                    "{} frame has {} planes, expected {}",
                    format,
                    planes.len(),
                    format.plane_count()
                )));
            }

            let mut offset = offset;
            let mut written = 0;
            for (layout, &index) in layouts.iter().zip(order) {
                if written == dst.len() {
                    break;
                }
                let plane_size = layout.size();
                if offset >= plane_size {
                    offset -= plane_size;
                    continue;
                }
                let end = plane_size.min(offset + dst.len() - written);
                copy_plane_range(&planes[index], layout, offset, end, &mut dst[written..])?;
                written += end - offset;
                offset = 0;
            }
            Ok(())
        }
    }
}

/// Copy payload bytes `[start, end)` of one plane into the front of `dst`.
fn copy_plane_range(
    plane: &Plane,
    layout: &PlaneLayout,
    start: usize,
    end: usize,
    dst: &mut [u8],
) -> Result<()> {
    let row_size = layout.row_size();
    let mut pos = start;
    let mut out = 0;
    while pos < end {
        let row = pos / row_size;
        let col = pos % row_size;
        let take = (row_size - col).min(end - pos);
        let target = &mut dst[out..out + take];

        let real = if col < layout.row_bytes {
            (layout.row_bytes - col).min(take)
        } else {
            0
        };
        if real > 0 {
            let src_start = row * plane.stride + col;
            let src = plane.data.get(src_start..src_start + real).ok_or_else(|| {
                Error::decode(format!(
                    "plane of {} bytes too short for row {} of {}",
                    plane.data.len(),
                    row,
                    layout.rows
                ))
            })?;
            target[..real].copy_from_slice(src);
        }
        target[real..].fill(0);

        pos += take;
        out += take;
    }
    Ok(())
}
