//! RIFF chunk tree reader.

use super::{align_up, ChunkHeader, FourCC, Record};
use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Maximum chunk payload read into memory (256 MB).
const MAX_CHUNK_DATA_SIZE: u64 = 256 * 1024 * 1024;

/// Parsed chunk header with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: FourCC,
    /// Payload size as stored, excluding the 8 byte header and pad byte.
    pub size: u32,
    /// File offset of the chunk header.
    pub offset: u64,
    /// List type for `RIFF` and `LIST` chunks.
    pub list_type: Option<FourCC>,
}

impl Chunk {
    /// Offset of the first payload byte (after the list type for lists).
    pub fn data_offset(&self) -> u64 {
        self.offset + 8 + if self.list_type.is_some() { 4 } else { 0 }
    }

    /// Payload bytes after the list type.
    pub fn data_size(&self) -> u64 {
        let size = self.size as u64;
        if self.list_type.is_some() {
            size.saturating_sub(4)
        } else {
            size
        }
    }

    /// Bytes occupied in the parent including header and pad.
    pub fn total_size(&self) -> u64 {
        8 + align_up(self.size as u64)
    }

    pub fn end_offset(&self) -> u64 {
        self.offset + self.total_size()
    }

    /// Display name, `LIST:movi` style for lists.
    pub fn name(&self) -> String {
        match self.list_type {
            Some(list_type) => format!("{}:{}", self.id, list_type),
            None => self.id.to_string(),
        }
    }
}

/// Walks the chunk tree of a RIFF file.
pub struct RiffReader<R> {
    reader: R,
    file_size: u64,
}

impl<R: Read + Seek> RiffReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self { reader, file_size })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Top level chunks (`RIFF` segments).
    pub fn top_level(&mut self) -> Result<Vec<Chunk>> {
        self.read_chunks(0, self.file_size)
    }

    /// Children of a list chunk.
    pub fn children(&mut self, list: &Chunk) -> Result<Vec<Chunk>> {
        if list.list_type.is_none() {
            return Ok(Vec::new());
        }
        let end = (list.data_offset() + list.data_size()).min(self.file_size);
        self.read_chunks(list.data_offset(), end)
    }

    /// Read the chunks between `start` and `end`.
    pub fn read_chunks(&mut self, start: u64, end: u64) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut pos = start;

        while pos + ChunkHeader::SIZE as u64 <= end {
            self.reader.seek(SeekFrom::Start(pos))?;

            let mut raw = [0u8; 8];
            self.reader.read_exact(&mut raw)?;
            let header = ChunkHeader::parse(&mut &raw[..])?;

            let list_type = if header.id.is_list() {
                if header.size < 4 {
                    return Err(Error::invalid_chunk(format!(
                        "{} at {} too small for a list",
                        header.id, pos
                    )));
                }
                let mut code = [0u8; 4];
                self.reader.read_exact(&mut code)?;
                Some(FourCC(code))
            } else {
                None
            };

            let chunk = Chunk {
                id: header.id,
                size: header.size,
                offset: pos,
                list_type,
            };
            if chunk.end_offset() > end {
                return Err(Error::invalid_chunk(format!(
                    "{} at {} extends past {}",
                    chunk.name(),
                    pos,
                    end
                )));
            }
            pos = chunk.end_offset();
            chunks.push(chunk);
        }

        Ok(chunks)
    }

    /// Read a chunk payload, rejecting oversized chunks.
    pub fn read_data(&mut self, chunk: &Chunk) -> Result<Vec<u8>> {
        let size = chunk.data_size();
        if size > MAX_CHUNK_DATA_SIZE {
            return Err(Error::invalid_chunk(format!(
                "{} data size {} exceeds maximum {}",
                chunk.name(),
                size,
                MAX_CHUNK_DATA_SIZE
            )));
        }
        self.reader.seek(SeekFrom::Start(chunk.data_offset()))?;
        let mut data = vec![0u8; size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Read the leading record of a chunk payload.
    pub fn read_record<T: Record>(&mut self, chunk: &Chunk) -> Result<T> {
        if chunk.data_size() < T::SIZE as u64 {
            return Err(Error::BufferUnderflow {
                need: T::SIZE,
                have: chunk.data_size() as usize,
            });
        }
        self.reader.seek(SeekFrom::Start(chunk.data_offset()))?;
        let mut data = vec![0u8; T::SIZE];
        self.reader.read_exact(&mut data)?;
        T::parse(&mut &data[..])
    }

    /// Find the first child with the given id (and list type, for lists).
    pub fn find_child(
        &mut self,
        list: &Chunk,
        id: FourCC,
        list_type: Option<FourCC>,
    ) -> Result<Option<Chunk>> {
        Ok(self
            .children(list)?
            .into_iter()
            .find(|c| c.id == id && (list_type.is_none() || c.list_type == list_type)))
    }
}
