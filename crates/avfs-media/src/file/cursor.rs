//! `Read + Seek` adapter over a virtual file.

use super::AviFile;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Sequential reader over an [`AviFile`].
#[derive(Debug, Clone)]
pub struct AviCursor {
    file: Arc<AviFile>,
    pos: u64,
}

impl AviCursor {
    pub fn new(file: Arc<AviFile>) -> Self {
        Self { file, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn file(&self) -> &Arc<AviFile> {
        &self.file
    }
}

impl Read for AviCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.file.file_size();
        if self.pos >= size {
            return Ok(0);
        }
        let n = (size - self.pos).min(buf.len() as u64) as usize;
        self.file
            .read_at(self.pos, &mut buf[..n])
            .map_err(io::Error::other)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for AviCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.file.file_size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PatternSource, PixelFormat, VideoInfo};

    fn file() -> Arc<AviFile> {
        AviFile::open(Arc::new(PatternSource::new(
            VideoInfo::new(4, 4, PixelFormat::Y8).with_frames(2),
        )))
        .unwrap()
    }

    #[test]
    fn test_read_to_end() {
        let file = file();
        let mut cursor = file.cursor();
        let mut data = Vec::new();
        cursor.read_to_end(&mut data).unwrap();
        assert_eq!(data.len() as u64, file.file_size());
        assert_eq!(&data[..4], b"RIFF");
        assert_eq!(cursor.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn test_seek() {
        let file = file();
        let mut cursor = file.cursor();
        assert_eq!(cursor.seek(SeekFrom::End(-8)).unwrap(), file.file_size() - 8);
        let mut buf = [0xAAu8; 16];
        assert_eq!(cursor.read(&mut buf).unwrap(), 8);

        cursor.seek(SeekFrom::Start(8)).unwrap();
        cursor.seek(SeekFrom::Current(-8)).unwrap();
        assert_eq!(cursor.position(), 0);
        assert!(cursor.seek(SeekFrom::Current(-1)).is_err());
    }
}
