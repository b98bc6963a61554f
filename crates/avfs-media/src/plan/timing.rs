//! Mapping between video frame positions and audio sample positions.

/// Audio position arithmetic for one clip.
///
/// Chunk `f` of the audio stream normally covers the samples of video frame
/// `f`. With a pre-roll of `p` frames, chunk 0 additionally carries the
/// audio of frames `1..=p`, and every later chunk is shifted `p` frames
/// ahead of its video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTiming {
    pub fps_num: u32,
    pub fps_den: u32,
    pub sample_rate: u32,
    pub sample_count: u64,
    pub preroll_frames: u32,
}

impl AudioTiming {
    pub fn new(fps_num: u32, fps_den: u32, sample_rate: u32, sample_count: u64) -> Self {
        Self {
            fps_num,
            fps_den,
            sample_rate,
            sample_count,
            preroll_frames: 0,
        }
    }

    /// Pre-roll used when audio is interleaved: about half a second.
    pub fn interleave_preroll(fps_num: u32, fps_den: u32) -> u32 {
        ((fps_num as u64 + fps_den as u64 - 1) / (fps_den as u64 * 2)) as u32
    }

    /// First sample of frame position `frames`, rounded down.
    pub fn samples_from_frames(&self, frames: u64) -> u64 {
        (frames as u128 * self.sample_rate as u128 * self.fps_den as u128 / self.fps_num as u128)
            as u64
    }

    /// Frame position holding sample `samples`, rounded down.
    pub fn frames_from_samples(&self, samples: u64) -> u64 {
        (samples as u128 * self.fps_num as u128
            / (self.fps_den as u128 * self.sample_rate as u128)) as u64
    }

    /// Smallest chunk count whose frames cover every sample.
    pub fn frames_covering_all(&self) -> u64 {
        let mut frames = (self.sample_count as u128 * self.fps_num as u128)
            .div_ceil(self.fps_den as u128 * self.sample_rate as u128)
            as u64;
        while self.samples_from_frames(frames) < self.sample_count {
            frames += 1;
        }
        frames.max(1)
    }

    /// Start sample and sample count of `count` consecutive chunks starting
    /// at chunk `frame`, clamped to the clip.
    pub fn locate(&self, frame: u32, count: u32) -> (u64, u64) {
        let mut start_frame = frame as u64;
        let mut end_frame = frame as u64 + count as u64;
        if start_frame != 0 {
            start_frame += self.preroll_frames as u64;
        }
        if end_frame != 0 {
            end_frame += self.preroll_frames as u64;
        }
        let start = self.samples_from_frames(start_frame).min(self.sample_count);
        let end = self.samples_from_frames(end_frame).min(self.sample_count);
        (start, end - start)
    }

    /// Nominal samples per frame.
    pub fn samples_per_frame(&self) -> u64 {
        self.samples_from_frames(1)
    }
}
